//! Item status resolution.
//!
//! The policy is an ordered rule table: the first rule whose condition holds
//! decides the item's status. Inputs are already normalized (no `"-"`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{ClaimItem, ClaimStatus, TimelineEntry};

/// What the resolver looks at for one line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSignals<'a> {
    pub approved_amt: Decimal,
    pub reason: Option<&'a str>,
    pub query_reason: Option<&'a str>,
    /// Claim-level query text used when the item has none of its own.
    pub fallback_query: Option<&'a str>,
}

impl<'a> ItemSignals<'a> {
    pub fn effective_query(&self) -> Option<&'a str> {
        self.query_reason.or(self.fallback_query)
    }
}

/// One row of the status policy.
pub struct StatusRule {
    pub name: &'static str,
    pub applies: fn(&ItemSignals<'_>) -> bool,
    pub status: ClaimStatus,
    /// False only for the optimistic fallback, which lets an extractor-provided
    /// approval status survive.
    pub explicit: bool,
}

fn positive_approval(s: &ItemSignals<'_>) -> bool {
    s.approved_amt > Decimal::ZERO
}

fn denial_reason(s: &ItemSignals<'_>) -> bool {
    s.approved_amt.is_zero() && s.reason.is_some()
}

fn open_query(s: &ItemSignals<'_>) -> bool {
    s.approved_amt.is_zero() && s.effective_query().is_some()
}

fn no_contrary_signal(_: &ItemSignals<'_>) -> bool {
    true
}

/// Item status policy, first match wins. The last rule always matches.
pub static ITEM_STATUS_RULES: [StatusRule; 4] = [
    StatusRule {
        name: "positive_approval",
        applies: positive_approval,
        status: ClaimStatus::Approved,
        explicit: true,
    },
    StatusRule {
        name: "denial_reason",
        applies: denial_reason,
        status: ClaimStatus::Denied,
        explicit: true,
    },
    StatusRule {
        name: "open_query",
        applies: open_query,
        status: ClaimStatus::QueryRaised,
        explicit: true,
    },
    StatusRule {
        name: "default_approved",
        applies: no_contrary_signal,
        status: ClaimStatus::Approved,
        explicit: false,
    },
];

/// The first rule that applies.
pub fn select_rule(signals: &ItemSignals<'_>) -> &'static StatusRule {
    ITEM_STATUS_RULES
        .iter()
        .find(|rule| (rule.applies)(signals))
        .unwrap_or(&ITEM_STATUS_RULES[ITEM_STATUS_RULES.len() - 1])
}

/// Outcome of resolving one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub status: ClaimStatus,
    pub approval_status: String,
    pub reason: String,
    pub query_reason: String,
    pub rule: &'static str,
    /// A positive approval discarded the item's own reason or query text.
    pub cleared_annotations: bool,
}

/// Resolve an item's status, its approval status and its annotation texts.
pub fn resolve_status(signals: &ItemSignals<'_>, extractor_approval_status: Option<&str>) -> Resolution {
    let rule = select_rule(signals);

    let (reason, query_reason) = match rule.status {
        ClaimStatus::Approved => (String::new(), String::new()),
        ClaimStatus::Denied => (
            signals.reason.unwrap_or_default().to_string(),
            signals.query_reason.unwrap_or_default().to_string(),
        ),
        _ => (
            String::new(),
            signals.effective_query().unwrap_or_default().to_string(),
        ),
    };

    let approval_status = match extractor_approval_status {
        Some(given) if !rule.explicit && is_preservable_approval_status(given) => given.to_string(),
        _ => rule.status.as_str().to_string(),
    };

    Resolution {
        status: rule.status,
        approval_status,
        reason,
        query_reason,
        rule: rule.name,
        cleared_annotations: rule.status == ClaimStatus::Approved
            && rule.explicit
            && (signals.reason.is_some() || signals.query_reason.is_some()),
    }
}

fn is_preservable_approval_status(given: &str) -> bool {
    let given = given.trim();
    !given.is_empty()
        && !matches!(
            ClaimStatus::from_label_lenient(given),
            Some(ClaimStatus::Approved | ClaimStatus::Denied)
        )
}

/// Write a resolution onto an item and append its timeline entries.
///
/// The status entry is skipped when it repeats the item's latest status;
/// the reason entry is written only when a reason or query text exists.
pub fn record_resolution(item: &mut ClaimItem, resolution: &Resolution, date: DateTime<Utc>) {
    item.status = resolution.status;
    item.approval_status = resolution.approval_status.clone();
    item.reason = resolution.reason.clone();
    item.query_reason = resolution.query_reason.clone();

    item.push_status(TimelineEntry::new(resolution.status.as_str(), date));

    let comment = [&resolution.reason, &resolution.query_reason]
        .into_iter()
        .find(|text| !text.is_empty())
        .cloned();
    if comment.is_some() {
        item.push_reason(TimelineEntry::new(resolution.status.as_str(), date).with_comment(comment));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn signals<'a>(
        approved: Decimal,
        reason: Option<&'a str>,
        query: Option<&'a str>,
    ) -> ItemSignals<'a> {
        ItemSignals {
            approved_amt: approved,
            reason,
            query_reason: query,
            fallback_query: None,
        }
    }

    #[test]
    fn positive_approval_wins_and_clears_annotations() {
        let r = resolve_status(
            &signals(dec!(115.00), Some("insufficient documentation"), Some("send notes")),
            None,
        );
        assert_eq!(r.status, ClaimStatus::Approved);
        assert_eq!(r.reason, "");
        assert_eq!(r.query_reason, "");
        assert_eq!(r.rule, "positive_approval");
        assert!(r.cleared_annotations);
    }

    #[test]
    fn zero_approval_with_reason_is_denied() {
        let r = resolve_status(&signals(Decimal::ZERO, Some("insufficient documentation"), None), None);
        assert_eq!(r.status, ClaimStatus::Denied);
        assert_eq!(r.reason, "insufficient documentation");
        assert_eq!(r.approval_status, "Denied");
    }

    #[test]
    fn reason_takes_priority_over_query() {
        let r = resolve_status(&signals(Decimal::ZERO, Some("not covered"), Some("send bill")), None);
        assert_eq!(r.status, ClaimStatus::Denied);
        assert_eq!(r.query_reason, "send bill");
    }

    #[test]
    fn zero_approval_with_query_is_query_raised() {
        let r = resolve_status(&signals(Decimal::ZERO, None, Some("send discharge summary")), None);
        assert_eq!(r.status, ClaimStatus::QueryRaised);
        assert_eq!(r.query_reason, "send discharge summary");
    }

    #[test]
    fn claim_level_query_is_a_fallback() {
        let mut s = signals(Decimal::ZERO, None, None);
        s.fallback_query = Some("provide ICU notes");
        let r = resolve_status(&s, None);
        assert_eq!(r.status, ClaimStatus::QueryRaised);
        assert_eq!(r.query_reason, "provide ICU notes");
        assert_eq!(r.rule, "open_query");
    }

    #[test]
    fn no_signal_defaults_to_approved() {
        let r = resolve_status(&signals(Decimal::ZERO, None, None), None);
        assert_eq!(r.status, ClaimStatus::Approved);
        assert_eq!(r.rule, "default_approved");
        assert!(!r.cleared_annotations);
    }

    #[test]
    fn fallback_preserves_extractor_approval_status() {
        let r = resolve_status(&signals(Decimal::ZERO, None, None), Some("Pending Review"));
        assert_eq!(r.status, ClaimStatus::Approved);
        assert_eq!(r.approval_status, "Pending Review");

        let r = resolve_status(&signals(Decimal::ZERO, None, None), Some("denied"));
        assert_eq!(r.approval_status, "Approved");
    }

    #[test]
    fn explicit_rules_ignore_extractor_approval_status() {
        let r = resolve_status(&signals(dec!(10), None, None), Some("Pending Review"));
        assert_eq!(r.approval_status, "Approved");
    }

    #[test]
    fn each_rule_is_independently_testable() {
        let approved = signals(dec!(1), None, None);
        let denied = signals(Decimal::ZERO, Some("x"), None);
        assert!((ITEM_STATUS_RULES[0].applies)(&approved));
        assert!(!(ITEM_STATUS_RULES[0].applies)(&denied));
        assert!((ITEM_STATUS_RULES[1].applies)(&denied));
        assert!(!(ITEM_STATUS_RULES[2].applies)(&denied));
        assert!(ITEM_STATUS_RULES.iter().all(|r| !r.name.is_empty()));
        assert!((ITEM_STATUS_RULES[3].applies)(&denied));
    }

    #[test]
    fn recording_appends_histories() {
        let mut item = ClaimItem {
            item_code: "LAB01".into(),
            procedure: "CBC".into(),
            amount: dec!(115.00),
            approved_amt: Some(Decimal::ZERO),
            qty: 1,
            status: ClaimStatus::UnderReview,
            approval_status: String::new(),
            reason: String::new(),
            query_reason: String::new(),
            status_history: vec![],
            reason_history: None,
        };
        let date = Utc::now();
        let r = resolve_status(&signals(Decimal::ZERO, Some("insufficient documentation"), None), None);
        record_resolution(&mut item, &r, date);

        assert_eq!(item.status, ClaimStatus::Denied);
        assert_eq!(item.status_history.len(), 1);
        assert_eq!(item.status_history[0].label, "Denied");
        let reasons = item.reason_history.as_ref().unwrap();
        assert_eq!(reasons[0].comment.as_deref(), Some("insufficient documentation"));

        let approved = resolve_status(&signals(dec!(5), None, None), None);
        record_resolution(&mut item, &approved, date);
        assert_eq!(item.status_history.len(), 2);
        assert_eq!(item.reason_history.as_ref().unwrap().len(), 1);
    }
}
