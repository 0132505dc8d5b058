use serde::{Deserialize, Serialize};

use super::enums::DocumentKind;

/// Something the engine coerced instead of failing on.
///
/// Warnings never change the merged claim; they sit next to it so a reviewer
/// can tell "zero dollars billed" apart from "amount unreadable".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityWarning {
    pub kind: WarningKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Amount text had no parseable number; read as zero.
    UnparseableAmount,
    /// Amount parsed negative; clamped to zero.
    NegativeAmount,
    UnparseableDate,
    UnparseableQuantity,
    /// Line item had neither a code nor a procedure name; skipped.
    MissingItemCode,
    /// A positive approved amount discarded a denial or query text.
    ApprovalClearedReason,
    /// An extractor total disagrees with the recomputed total.
    TotalMismatch,
    /// A claim-document item had no adjudication entry and was dropped.
    DroppedClaimItem,
    /// Extracted claim id belongs to another patient; a new id was generated.
    ClaimIdCollision,
    /// Accepted amount taken from the document's claim-level figure.
    DocumentAcceptedAmount,
}

impl DataQualityWarning {
    pub fn new(kind: WarningKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            document: None,
            item_code: None,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn in_document(mut self, document: DocumentKind) -> Self {
        self.document = Some(document);
        self
    }

    pub fn for_item(mut self, item_code: impl Into<String>) -> Self {
        self.item_code = Some(item_code.into());
        self
    }
}
