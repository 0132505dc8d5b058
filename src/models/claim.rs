use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ClaimStatus;

/// One dated event on a claim or item timeline. Never mutated once pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub date: DateTime<Utc>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl TimelineEntry {
    pub fn new(label: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            date,
            label: label.into(),
            user: None,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user.filter(|u| !u.trim().is_empty());
        self
    }
}

/// An uploaded source file attached to a claim. Unique by `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDocument {
    pub id: Uuid,
    pub name: String,
    pub size: u64,
    pub upload_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One billed procedure line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimItem {
    pub item_code: String,
    pub procedure: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_amt: Option<Decimal>,
    pub qty: u32,
    pub status: ClaimStatus,
    pub approval_status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub query_reason: String,
    #[serde(default)]
    pub status_history: Vec<TimelineEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_history: Option<Vec<TimelineEntry>>,
}

impl ClaimItem {
    /// Approved amount with absence read as zero.
    pub fn approved_or_zero(&self) -> Decimal {
        self.approved_amt.unwrap_or(Decimal::ZERO)
    }

    /// Append a status entry unless it repeats the latest label.
    pub fn push_status(&mut self, entry: TimelineEntry) {
        push_unless_repeated(&mut self.status_history, entry);
    }

    /// Append a reason entry unless it repeats the latest label and comment.
    pub fn push_reason(&mut self, entry: TimelineEntry) {
        let history = self.reason_history.get_or_insert_with(Vec::new);
        let repeated = history
            .last()
            .is_some_and(|last| last.label == entry.label && last.comment == entry.comment);
        if !repeated {
            history.push(entry);
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        normalize_item_code(&self.item_code) == normalize_item_code(code)
    }
}

/// The aggregate for one patient encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub claim_id: String,
    pub patient_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_service: Option<NaiveDate>,
    pub total_amt: Decimal,
    pub accepted_amt: Decimal,
    pub denied_amt: Decimal,
    #[serde(default)]
    pub documents: Vec<ClaimDocument>,
    #[serde(default)]
    pub items: Vec<ClaimItem>,
    #[serde(default)]
    pub status_history: Vec<TimelineEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Recompute `total_amt`, `accepted_amt` and `denied_amt` from the items.
    pub fn recompute_totals(&mut self) {
        self.total_amt = self.items.iter().map(|i| i.amount).sum();
        self.accepted_amt = self.items.iter().map(ClaimItem::approved_or_zero).sum();
        self.denied_amt = denied_amount(self.total_amt, self.accepted_amt);
    }

    /// Label of the most recent claim-level status entry.
    pub fn latest_status(&self) -> Option<&str> {
        self.status_history.last().map(|e| e.label.as_str())
    }

    /// Current status as a known label, if the latest entry is one.
    pub fn current_status(&self) -> Option<ClaimStatus> {
        self.latest_status().and_then(ClaimStatus::from_label_lenient)
    }

    pub fn has_document(&self, name: &str) -> bool {
        self.documents.iter().any(|d| d.name == name)
    }

    pub fn item(&self, code: &str) -> Option<&ClaimItem> {
        self.items.iter().find(|i| i.has_code(code))
    }

    pub fn item_mut(&mut self, code: &str) -> Option<&mut ClaimItem> {
        self.items.iter_mut().find(|i| i.has_code(code))
    }
}

/// `max(total - accepted, 0)`.
pub fn denied_amount(total: Decimal, accepted: Decimal) -> Decimal {
    (total - accepted).max(Decimal::ZERO)
}

/// Join key for items: trimmed, case-insensitive.
pub fn normalize_item_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn push_unless_repeated(history: &mut Vec<TimelineEntry>, entry: TimelineEntry) {
    if history.last().is_some_and(|last| last.label == entry.label) {
        return;
    }
    history.push(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(code: &str, amount: Decimal, approved: Option<Decimal>) -> ClaimItem {
        ClaimItem {
            item_code: code.into(),
            procedure: "Procedure".into(),
            amount,
            approved_amt: approved,
            qty: 1,
            status: ClaimStatus::Approved,
            approval_status: "Approved".into(),
            reason: String::new(),
            query_reason: String::new(),
            status_history: vec![],
            reason_history: None,
        }
    }

    fn claim(items: Vec<ClaimItem>) -> Claim {
        let now = Utc::now();
        Claim {
            claim_id: "CLM-1".into(),
            patient_name: "Jane Roe".into(),
            date_of_service: None,
            total_amt: Decimal::ZERO,
            accepted_amt: Decimal::ZERO,
            denied_amt: Decimal::ZERO,
            documents: vec![],
            items,
            status_history: vec![],
            approval_status: None,
            approval_reason: None,
            query_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn totals_follow_items() {
        let mut c = claim(vec![
            item("LAB01", dec!(115.00), Some(dec!(100))),
            item("RAD02", dec!(200), None),
        ]);
        c.recompute_totals();
        assert_eq!(c.total_amt, dec!(315));
        assert_eq!(c.accepted_amt, dec!(100));
        assert_eq!(c.denied_amt, dec!(215));
    }

    #[test]
    fn denied_never_negative() {
        assert_eq!(denied_amount(dec!(100), dec!(150)), Decimal::ZERO);
        assert_eq!(denied_amount(dec!(100), dec!(40)), dec!(60));
    }

    #[test]
    fn item_lookup_is_case_insensitive_and_trimmed() {
        let c = claim(vec![item("lab01", dec!(1), None)]);
        assert!(c.item(" LAB01 ").is_some());
        assert!(c.item("LAB02").is_none());
    }

    #[test]
    fn status_history_skips_consecutive_repeats() {
        let mut i = item("LAB01", dec!(1), None);
        let now = Utc::now();
        i.push_status(TimelineEntry::new("Approved", now));
        i.push_status(TimelineEntry::new("Approved", now));
        i.push_status(TimelineEntry::new("Denied", now));
        assert_eq!(i.status_history.len(), 2);
    }

    #[test]
    fn reason_history_created_lazily() {
        let mut i = item("LAB01", dec!(1), None);
        assert!(i.reason_history.is_none());
        let entry = TimelineEntry::new("Denied", Utc::now()).with_comment(Some("no docs".into()));
        i.push_reason(entry.clone());
        i.push_reason(entry);
        assert_eq!(i.reason_history.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn blank_comment_is_dropped() {
        let entry = TimelineEntry::new("Approved", Utc::now())
            .with_comment(Some("   ".into()))
            .with_user(Some("".into()));
        assert!(entry.comment.is_none());
        assert!(entry.user.is_none());
    }

    #[test]
    fn claim_serializes_camel_case() {
        let c = claim(vec![item("LAB01", dec!(115.00), None)]);
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("claimId").is_some());
        assert!(json.get("patientName").is_some());
        assert_eq!(json["items"][0]["itemCode"], "LAB01");
        assert_eq!(json["items"][0]["amount"], "115.00");
        assert!(json["items"][0].get("reasonHistory").is_none());
    }
}
