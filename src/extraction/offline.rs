//! Extractors that do not call a model.
//!
//! `PreExtractedJson` reads a payload whose first page already holds the
//! extractor's JSON reply (saved from an earlier run or produced by another
//! tool). `MockFieldExtractor` serves canned replies per document kind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::parser::parse_extractor_response;
use super::types::{DocumentPayload, FieldExtractor, RawExtraction};
use super::ExtractionError;
use crate::models::DocumentKind;

/// Field extractor over pre-extracted JSON payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreExtractedJson;

impl FieldExtractor for PreExtractedJson {
    fn extract(&self, payload: &DocumentPayload) -> Result<RawExtraction, ExtractionError> {
        let page = payload.pages.first().ok_or_else(|| ExtractionError::EmptyDocument {
            kind: payload.kind,
            file_name: payload.file_name.clone(),
        })?;
        let text = std::str::from_utf8(page)
            .map_err(|e| ExtractionError::MalformedResponse(format!("not UTF-8 JSON: {e}")))?;
        parse_extractor_response(text)
    }
}

/// Mock extractor for testing: returns a configurable reply per kind.
pub struct MockFieldExtractor {
    replies: HashMap<DocumentKind, Result<String, String>>,
    calls: AtomicUsize,
}

impl MockFieldExtractor {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_reply(mut self, kind: DocumentKind, reply: &str) -> Self {
        self.replies.insert(kind, Ok(reply.to_string()));
        self
    }

    pub fn with_failure(mut self, kind: DocumentKind, message: &str) -> Self {
        self.replies.insert(kind, Err(message.to_string()));
        self
    }

    /// Number of `extract` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockFieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for MockFieldExtractor {
    fn extract(&self, payload: &DocumentPayload) -> Result<RawExtraction, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(&payload.kind) {
            Some(Ok(reply)) => parse_extractor_response(reply),
            Some(Err(message)) => Err(ExtractionError::HttpClient(message.clone())),
            None => Err(ExtractionError::MalformedResponse(format!(
                "no mock reply for {}",
                payload.kind
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn pre_extracted_json_reads_first_page() {
        let payload = DocumentPayload::new(
            DocumentKind::Claim,
            "claim.json",
            vec![br#"{"patientName": "Jane Roe"}"#.to_vec()],
        );
        let raw = PreExtractedJson.extract(&payload).unwrap();
        assert_eq!(raw.patient_name, Some(Value::from("Jane Roe")));
    }

    #[test]
    fn pre_extracted_json_rejects_binary() {
        let payload = DocumentPayload::new(DocumentKind::Claim, "claim.png", vec![vec![0xff, 0xfe]]);
        assert!(matches!(
            PreExtractedJson.extract(&payload),
            Err(ExtractionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn mock_serves_per_kind_and_counts_calls() {
        let mock = MockFieldExtractor::new()
            .with_reply(DocumentKind::Claim, r#"{"claimId": "C-1"}"#)
            .with_failure(DocumentKind::Query, "unreachable");

        let claim = DocumentPayload::new(DocumentKind::Claim, "c.png", vec![vec![1]]);
        let query = DocumentPayload::new(DocumentKind::Query, "q.png", vec![vec![1]]);
        let approval = DocumentPayload::new(DocumentKind::Approval, "a.png", vec![vec![1]]);

        assert!(mock.extract(&claim).is_ok());
        assert!(matches!(mock.extract(&query), Err(ExtractionError::HttpClient(_))));
        assert!(mock.extract(&approval).is_err());
        assert_eq!(mock.calls(), 3);
    }
}
