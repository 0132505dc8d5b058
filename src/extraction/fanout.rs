//! All-or-nothing fan-out of extraction calls for one upload.
//!
//! Every document of the set is extracted concurrently on the blocking pool.
//! The joined result is either every extraction, in input order, or the first
//! error; on error no extraction result is handed to the merger. Calls still
//! in flight when another fails run to completion and are discarded.

use std::sync::Arc;

use futures_util::future::try_join_all;

use super::types::{DocumentPayload, FieldExtractor, RawExtraction};
use super::ExtractionError;

/// Fan out one extraction per payload and join them, failing fast.
pub async fn extract_all(
    extractor: Arc<dyn FieldExtractor>,
    payloads: &[DocumentPayload],
) -> Result<Vec<RawExtraction>, ExtractionError> {
    let start = std::time::Instant::now();

    let calls = payloads.iter().cloned().map(|payload| {
        let extractor = Arc::clone(&extractor);
        async move {
            let kind = payload.kind;
            tokio::task::spawn_blocking(move || extractor.extract(&payload))
                .await
                .map_err(|e| ExtractionError::TaskJoin(format!("{kind} extraction: {e}")))?
        }
    });

    match try_join_all(calls).await {
        Ok(results) => {
            tracing::info!(
                documents = results.len(),
                elapsed_ms = %start.elapsed().as_millis(),
                "Document set extracted"
            );
            Ok(results)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Document set extraction aborted");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::offline::MockFieldExtractor;
    use crate::models::DocumentKind;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn payloads() -> Vec<DocumentPayload> {
        vec![
            DocumentPayload::new(DocumentKind::Claim, "claim.png", vec![vec![1]]),
            DocumentPayload::new(DocumentKind::Approval, "approval.png", vec![vec![2]]),
            DocumentPayload::new(DocumentKind::Query, "query.png", vec![vec![3]]),
        ]
    }

    #[tokio::test]
    async fn results_keep_input_order() {
        let mock = MockFieldExtractor::new()
            .with_reply(DocumentKind::Claim, r#"{"claimId": "claim"}"#)
            .with_reply(DocumentKind::Approval, r#"{"claimId": "approval"}"#)
            .with_reply(DocumentKind::Query, r#"{"claimId": "query"}"#);

        let results = extract_all(Arc::new(mock), &payloads()).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.claim_id.clone()).collect();
        assert_eq!(
            ids,
            vec![
                Some(Value::from("claim")),
                Some(Value::from("approval")),
                Some(Value::from("query")),
            ]
        );
    }

    #[tokio::test]
    async fn one_failure_fails_the_whole_set() {
        let mock = MockFieldExtractor::new()
            .with_reply(DocumentKind::Claim, r#"{"claimId": "claim"}"#)
            .with_failure(DocumentKind::Approval, "connection refused")
            .with_reply(DocumentKind::Query, r#"{"claimId": "query"}"#);

        let result = extract_all(Arc::new(mock), &payloads()).await;
        assert!(matches!(result, Err(ExtractionError::HttpClient(_))));
    }

    /// Tracks how many calls overlap in time.
    struct SlowExtractor {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FieldExtractor for SlowExtractor {
        fn extract(&self, _payload: &DocumentPayload) -> Result<RawExtraction, ExtractionError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(100));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(RawExtraction::default())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn calls_run_concurrently() {
        let slow = Arc::new(SlowExtractor {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let results = extract_all(slow.clone(), &payloads()).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(slow.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn empty_set_yields_empty_results() {
        let results = extract_all(Arc::new(MockFieldExtractor::new()), &[]).await.unwrap();
        assert!(results.is_empty());
    }
}
