use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ExtractionError;
use crate::models::{DataQualityWarning, DocumentKind};

// ──────────────────────────────────────────────
// Raw extractor output (untrusted)
// ──────────────────────────────────────────────

/// The loosely-typed bag of fields a field extractor returns for one document.
///
/// Every field is optional and kept as a raw JSON value: models return
/// numbers as strings, strings as numbers, and `"-"` for "nothing here".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawExtraction {
    #[serde(alias = "claim_id", alias = "claimNumber", alias = "claim_number")]
    pub claim_id: Option<Value>,
    #[serde(alias = "patient_name", alias = "patient")]
    pub patient_name: Option<Value>,
    #[serde(alias = "date_of_service", alias = "serviceDate", alias = "service_date")]
    pub date_of_service: Option<Value>,
    #[serde(alias = "total_amt", alias = "totalAmount", alias = "total_amount")]
    pub total_amt: Option<Value>,
    #[serde(alias = "accepted_amt", alias = "acceptedAmount", alias = "approvedAmt")]
    pub accepted_amt: Option<Value>,
    #[serde(alias = "denied_amt", alias = "deniedAmount", alias = "denied_amount")]
    pub denied_amt: Option<Value>,
    pub status: Option<Value>,
    pub reason: Option<Value>,
    #[serde(alias = "query_reason", alias = "query")]
    pub query_reason: Option<Value>,
    #[serde(alias = "additional_info_required", alias = "additionalInformationRequired")]
    pub additional_info_required: Option<Value>,
    /// Usually an array; anything else (`"-"`, a string) means no items.
    #[serde(alias = "line_items", alias = "lineItems")]
    pub items: Option<Value>,
}

impl RawExtraction {
    /// Raw line items, empty unless `items` is an array.
    pub fn line_items(&self) -> &[Value] {
        self.items
            .as_ref()
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice)
    }
}

/// One raw line item inside [`RawExtraction::items`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawLineItem {
    #[serde(alias = "item_code", alias = "code")]
    pub item_code: Option<Value>,
    #[serde(alias = "description", alias = "procedureName", alias = "procedure_name")]
    pub procedure: Option<Value>,
    #[serde(alias = "claimedAmt", alias = "billedAmount", alias = "claimed_amt")]
    pub amount: Option<Value>,
    #[serde(alias = "approved_amt", alias = "approvedAmount", alias = "approved_amount")]
    pub approved_amt: Option<Value>,
    #[serde(alias = "quantity")]
    pub qty: Option<Value>,
    pub status: Option<Value>,
    #[serde(alias = "approval_status")]
    pub approval_status: Option<Value>,
    pub reason: Option<Value>,
    #[serde(alias = "query_reason", alias = "query")]
    pub query_reason: Option<Value>,
}

// ──────────────────────────────────────────────
// Normalized extraction (trusted shape)
// ──────────────────────────────────────────────

/// One document's fields after boundary normalization.
///
/// `None` means the extractor gave nothing usable (absent, null, blank or `"-"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    pub kind: DocumentKind,
    pub file_name: String,
    pub claim_id: Option<String>,
    pub patient_name: Option<String>,
    pub date_of_service: Option<NaiveDate>,
    pub total_amt: Option<Decimal>,
    pub accepted_amt: Option<Decimal>,
    pub denied_amt: Option<Decimal>,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub query_reason: Option<String>,
    pub additional_info_required: Option<String>,
    pub items: Vec<ExtractedItem>,
    pub warnings: Vec<DataQualityWarning>,
}

impl ExtractedDocument {
    /// An empty document of the given kind (every field absent).
    pub fn empty(kind: DocumentKind, file_name: impl Into<String>) -> Self {
        Self {
            kind,
            file_name: file_name.into(),
            claim_id: None,
            patient_name: None,
            date_of_service: None,
            total_amt: None,
            accepted_amt: None,
            denied_amt: None,
            status: None,
            reason: None,
            query_reason: None,
            additional_info_required: None,
            items: vec![],
            warnings: vec![],
        }
    }
}

/// One normalized line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedItem {
    pub item_code: String,
    pub procedure: String,
    pub amount: Decimal,
    pub approved_amt: Option<Decimal>,
    pub qty: u32,
    pub status: Option<String>,
    pub approval_status: Option<String>,
    pub reason: Option<String>,
    pub query_reason: Option<String>,
}

// ──────────────────────────────────────────────
// Collaborator seams
// ──────────────────────────────────────────────

/// A document handed to the extractor: page images plus upload metadata.
#[derive(Debug, Clone)]
pub struct DocumentPayload {
    pub kind: DocumentKind,
    pub file_name: String,
    pub size: u64,
    pub url: Option<String>,
    /// Page images (PNG/JPEG bytes), first page first.
    pub pages: Vec<Vec<u8>>,
}

impl DocumentPayload {
    pub fn new(kind: DocumentKind, file_name: impl Into<String>, pages: Vec<Vec<u8>>) -> Self {
        let size = pages.iter().map(|p| p.len() as u64).sum();
        Self {
            kind,
            file_name: file_name.into(),
            size,
            url: None,
            pages,
        }
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }
}

/// Turns one document into a raw field bag. Implementations block; the
/// fan-out joiner runs them on the blocking pool.
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, payload: &DocumentPayload) -> Result<RawExtraction, ExtractionError>;
}

/// Vision chat abstraction (allows mocking the Ollama HTTP client).
pub trait VisionClient: Send + Sync {
    fn chat_with_images(
        &self,
        model: &str,
        user_prompt: &str,
        images: &[String],
        system: Option<&str>,
    ) -> Result<String, ExtractionError>;
}
