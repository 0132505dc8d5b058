//! Line-item reconciliation across the documents of one upload.
//!
//! Items are joined on their code, trimmed and case-insensitive. The claim
//! document owns `amount` and `qty`; approval and query documents own the
//! adjudication fields.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::status::{record_resolution, resolve_status, ItemSignals, Resolution};
use crate::extraction::ExtractedItem;
use crate::models::{normalize_item_code, ClaimItem, ClaimStatus, DataQualityWarning, WarningKind};

/// Result of joining claim-document items with adjudication items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemMerge {
    pub items: Vec<ExtractedItem>,
    /// Claim-document items with no adjudication entry.
    pub dropped: Vec<ExtractedItem>,
}

impl ItemMerge {
    pub fn dropped_warnings(&self) -> Vec<DataQualityWarning> {
        self.dropped
            .iter()
            .map(|item| {
                DataQualityWarning::new(
                    WarningKind::DroppedClaimItem,
                    "items",
                    format!(
                        "{} ({}) billed but absent from the adjudication documents",
                        item.item_code, item.procedure
                    ),
                )
                .for_item(&item.item_code)
            })
            .collect()
    }
}

/// Fold `incoming` into `target`: every field `incoming` carries wins.
fn absorb(target: &mut ExtractedItem, incoming: &ExtractedItem) {
    if !incoming.amount.is_zero() {
        target.amount = incoming.amount;
    }
    if incoming.approved_amt.is_some() {
        target.approved_amt = incoming.approved_amt;
    }
    for (slot, value) in [
        (&mut target.status, &incoming.status),
        (&mut target.approval_status, &incoming.approval_status),
        (&mut target.reason, &incoming.reason),
        (&mut target.query_reason, &incoming.query_reason),
    ] {
        if value.is_some() {
            slot.clone_from(value);
        }
    }
}

/// Collapse items sharing a code into one entry, first appearance first.
fn collapse_into(acc: &mut Vec<ExtractedItem>, items: &[ExtractedItem]) {
    for item in items {
        match acc.iter().position(|a| same_code(a, item)) {
            Some(index) => absorb(&mut acc[index], item),
            None => acc.push(item.clone()),
        }
    }
}

/// Overlay approval and query items into one adjudication collection.
///
/// Per field the query document's value wins when present; otherwise the
/// approval document's value is kept.
pub fn overlay_adjudication(approval: &[ExtractedItem], query: &[ExtractedItem]) -> Vec<ExtractedItem> {
    let mut merged = Vec::with_capacity(approval.len().max(query.len()));
    collapse_into(&mut merged, approval);
    collapse_into(&mut merged, query);
    merged
}

/// Join claim-document items with adjudication items.
///
/// Output has one entry per adjudication code, with `amount`/`qty` taken from
/// the matching claim-document entry when there is one. With no adjudication
/// items the claim items pass through.
pub fn merge_item_sources(claim_items: &[ExtractedItem], adjudication: &[ExtractedItem]) -> ItemMerge {
    let mut billed = Vec::with_capacity(claim_items.len());
    collapse_into(&mut billed, claim_items);

    if adjudication.is_empty() {
        return ItemMerge {
            items: billed,
            dropped: vec![],
        };
    }

    let items = adjudication
        .iter()
        .map(|adj| {
            let mut merged = adj.clone();
            if let Some(source) = billed.iter().find(|b| same_code(b, adj)) {
                merged.amount = source.amount;
                merged.qty = source.qty;
            }
            merged
        })
        .collect::<Vec<_>>();

    let dropped = billed
        .into_iter()
        .filter(|b| !items.iter().any(|i| same_code(i, b)))
        .collect();

    ItemMerge { items, dropped }
}

fn same_code(a: &ExtractedItem, b: &ExtractedItem) -> bool {
    normalize_item_code(&a.item_code) == normalize_item_code(&b.item_code)
}

/// A fresh claim item for `source`, before any status is resolved.
fn blank_item(source: &ExtractedItem) -> ClaimItem {
    ClaimItem {
        item_code: source.item_code.trim().to_string(),
        procedure: source.procedure.clone(),
        amount: source.amount,
        approved_amt: None,
        qty: source.qty,
        status: ClaimStatus::UnderReview,
        approval_status: String::new(),
        reason: String::new(),
        query_reason: String::new(),
        status_history: vec![],
        reason_history: None,
    }
}

/// Copy one merged source item onto `target` and resolve its status.
///
/// Histories are extended, never replaced.
pub fn apply_source_item(
    target: &mut ClaimItem,
    source: &ExtractedItem,
    fallback_query: Option<&str>,
    date: DateTime<Utc>,
) -> Resolution {
    target.procedure.clone_from(&source.procedure);
    target.amount = source.amount;
    target.qty = source.qty;
    target.approved_amt = source.approved_amt;

    let signals = ItemSignals {
        approved_amt: source.approved_amt.unwrap_or(Decimal::ZERO),
        reason: source.reason.as_deref(),
        query_reason: source.query_reason.as_deref(),
        fallback_query,
    };
    let extractor_status = source.approval_status.as_deref().or(source.status.as_deref());
    let resolution = resolve_status(&signals, extractor_status);
    record_resolution(target, &resolution, date);
    resolution
}

/// Merge resolved source items into `items`: known codes are updated in
/// place, unseen codes are appended. Returns the warnings raised.
pub fn upsert_items(
    items: &mut Vec<ClaimItem>,
    sources: &[ExtractedItem],
    fallback_query: Option<&str>,
    date: DateTime<Utc>,
) -> Vec<DataQualityWarning> {
    let mut warnings = Vec::new();

    for source in sources {
        let index = match items.iter().position(|i| i.has_code(&source.item_code)) {
            Some(index) => index,
            None => {
                items.push(blank_item(source));
                items.len() - 1
            }
        };
        let item = &mut items[index];
        let resolution = apply_source_item(item, source, fallback_query, date);

        tracing::debug!(
            item_code = %item.item_code,
            rule = resolution.rule,
            status = %resolution.status,
            "Item status resolved"
        );

        if resolution.cleared_annotations {
            warnings.push(
                DataQualityWarning::new(
                    WarningKind::ApprovalClearedReason,
                    "reason",
                    format!(
                        "approved amount {} discarded the item's denial/query text",
                        item.approved_or_zero()
                    ),
                )
                .for_item(&item.item_code),
            );
        }
    }

    warnings
}
