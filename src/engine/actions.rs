//! Reviewer actions on a claim or on one of its items.
//!
//! Validation happens before any change: an action that fails returns an
//! error and the claim is left as it was.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ReviewError;
use crate::models::{ActionKind, Claim, ClaimStatus, TimelineEntry};

/// One reviewer decision. Without `item_code` it applies to the whole claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAction {
    pub claim_id: String,
    pub action: ActionKind,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub item_code: Option<String>,
    /// Reviewer recorded on the timeline entry.
    #[serde(default)]
    pub user: Option<String>,
}

impl ReviewAction {
    pub fn new(claim_id: impl Into<String>, action: ActionKind) -> Self {
        Self {
            claim_id: claim_id.into(),
            action,
            comment: None,
            item_code: None,
            user: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn on_item(mut self, item_code: impl Into<String>) -> Self {
        self.item_code = Some(item_code.into());
        self
    }

    pub fn by(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// The comment, trimmed, if it has any content.
    fn comment_text(&self) -> Option<String> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Updated(Claim),
    Deleted { claim_id: String },
}

/// Check an action against a claim without applying it.
pub fn validate_action(claim: &Claim, action: &ReviewAction) -> Result<(), ReviewError> {
    if action.action.requires_comment() && action.comment_text().is_none() {
        return Err(ReviewError::MissingComment {
            action: action.action,
        });
    }
    if let Some(code) = &action.item_code {
        if action.action == ActionKind::Delete {
            return Err(ReviewError::ItemScopedDelete(code.clone()));
        }
        if claim.item(code).is_none() {
            return Err(ReviewError::ItemNotFound {
                claim_id: claim.claim_id.clone(),
                item_code: code.clone(),
            });
        }
    }
    Ok(())
}

/// Apply a reviewer action to a claim snapshot.
pub fn apply_action(
    claim: &Claim,
    action: &ReviewAction,
    now: DateTime<Utc>,
) -> Result<ActionOutcome, ReviewError> {
    validate_action(claim, action)?;

    let Some(status) = action.action.status() else {
        tracing::info!(claim_id = %claim.claim_id, "Claim deleted by reviewer");
        return Ok(ActionOutcome::Deleted {
            claim_id: claim.claim_id.clone(),
        });
    };

    let comment = action.comment_text();
    let entry = TimelineEntry::new(status.as_str(), now)
        .with_comment(comment.clone())
        .with_user(action.user.clone());

    let mut updated = claim.clone();
    match &action.item_code {
        Some(code) => {
            let item = updated.item_mut(code).ok_or_else(|| ReviewError::ItemNotFound {
                claim_id: claim.claim_id.clone(),
                item_code: code.clone(),
            })?;

            item.status = status;
            item.approval_status = status.as_str().to_string();
            match action.action {
                ActionKind::Approve => {
                    item.approved_amt = Some(item.amount);
                    item.reason.clear();
                    item.query_reason.clear();
                }
                ActionKind::Deny => {
                    item.approved_amt = Some(Decimal::ZERO);
                    item.reason = comment.clone().unwrap_or_default();
                    item.query_reason.clear();
                }
                // Routing actions withdraw any approval until the item is decided again.
                _ => {
                    item.approved_amt = Some(Decimal::ZERO);
                    item.reason.clear();
                    item.query_reason = comment.clone().unwrap_or_default();
                }
            }
            if status != ClaimStatus::Approved {
                item.push_reason(entry.clone());
            }
            item.status_history.push(entry);

            updated.recompute_totals();
        }
        None => {
            match action.action {
                ActionKind::Approve => {
                    updated.approval_status = Some(status.as_str().to_string());
                }
                ActionKind::Deny => {
                    updated.approval_status = Some(status.as_str().to_string());
                    updated.approval_reason = comment;
                }
                _ => updated.query_reason = comment,
            }
            updated.status_history.push(entry);
        }
    }
    updated.updated_at = now;

    tracing::info!(
        claim_id = %updated.claim_id,
        action = %action.action,
        item_code = action.item_code.as_deref().unwrap_or("-"),
        accepted = %updated.accepted_amt,
        denied = %updated.denied_amt,
        "Reviewer action applied"
    );

    Ok(ActionOutcome::Updated(updated))
}
