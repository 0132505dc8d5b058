use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Claim, ClaimStatus};

/// Read-only aggregate over the claim collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_claims: usize,
    /// Claim count keyed by latest status label.
    pub by_status: BTreeMap<String, usize>,
    pub total_billed: Decimal,
    pub total_accepted: Decimal,
    pub total_denied: Decimal,
    /// Claims whose latest status is not a final decision.
    pub awaiting_action: usize,
    /// Items currently in `Query Raised` across all claims.
    pub open_item_queries: usize,
}

fn is_decided(status: Option<ClaimStatus>) -> bool {
    matches!(
        status,
        Some(ClaimStatus::Approved | ClaimStatus::Denied | ClaimStatus::PartiallyApproved)
    )
}

pub fn summarize(claims: &[Claim]) -> DashboardSummary {
    let mut summary = DashboardSummary {
        total_claims: claims.len(),
        ..Default::default()
    };

    for claim in claims {
        let label = claim.latest_status().unwrap_or(ClaimStatus::Submitted.as_str());
        *summary.by_status.entry(label.to_string()).or_default() += 1;

        summary.total_billed += claim.total_amt;
        summary.total_accepted += claim.accepted_amt;
        summary.total_denied += claim.denied_amt;

        if !is_decided(claim.current_status()) {
            summary.awaiting_action += 1;
        }
        summary.open_item_queries += claim
            .items
            .iter()
            .filter(|i| i.status == ClaimStatus::QueryRaised)
            .count();
    }

    summary
}

impl DashboardSummary {
    /// Share of billed dollars accepted, in percent. Zero when nothing is billed.
    pub fn acceptance_rate(&self) -> Decimal {
        if self.total_billed.is_zero() {
            return Decimal::ZERO;
        }
        (self.total_accepted * Decimal::ONE_HUNDRED / self.total_billed).round_dp(1)
    }
}
