//! Review service: extractor, engine and repository wired together.
//!
//! Each public operation reads a snapshot from the repository, computes the
//! new claim with the engine's pure functions, then writes it back. Nothing
//! is written when any step fails.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{ClaimRepository, DatabaseError};
use crate::engine::{
    apply_action, merge_document_set, summarize, ActionOutcome, DashboardSummary,
    ExtractedDocumentSet, MergeOutcome, ReviewAction, ReviewError,
};
use crate::extraction::{extract_all, normalize_extraction, DocumentPayload, ExtractionError, FieldExtractor};
use crate::models::{ActionKind, Claim, ClaimDocument};

#[derive(Error, Debug)]
pub enum ClaimDeskError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("{0}")]
    Review(#[from] ReviewError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// One upload: the claim document plus optional approval and query documents.
#[derive(Debug, Clone)]
pub struct DocumentSetUpload {
    pub claim: DocumentPayload,
    pub approval: Option<DocumentPayload>,
    pub query: Option<DocumentPayload>,
}

impl DocumentSetUpload {
    pub fn new(claim: DocumentPayload) -> Self {
        Self {
            claim,
            approval: None,
            query: None,
        }
    }

    pub fn with_approval(mut self, approval: DocumentPayload) -> Self {
        self.approval = Some(approval);
        self
    }

    pub fn with_query(mut self, query: DocumentPayload) -> Self {
        self.query = Some(query);
        self
    }

    fn payloads(&self) -> Vec<DocumentPayload> {
        std::iter::once(&self.claim)
            .chain(self.approval.iter())
            .chain(self.query.iter())
            .cloned()
            .collect()
    }
}

/// The claims review desk over a repository.
pub struct ClaimDesk<R: ClaimRepository> {
    extractor: Arc<dyn FieldExtractor>,
    repository: R,
}

impl<R: ClaimRepository> ClaimDesk<R> {
    pub fn new(extractor: Arc<dyn FieldExtractor>, repository: R) -> Self {
        Self {
            extractor,
            repository,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Extract every document of the upload, merge them into the claim
    /// collection and persist the result.
    ///
    /// Any extraction failure aborts the whole upload before the merge.
    pub async fn ingest_document_set(
        &mut self,
        upload: DocumentSetUpload,
    ) -> Result<MergeOutcome, ClaimDeskError> {
        let payloads = upload.payloads();
        let raw = extract_all(Arc::clone(&self.extractor), &payloads).await?;

        let now = Utc::now();
        let documents = payloads
            .iter()
            .zip(&raw)
            .map(|(payload, raw)| normalize_extraction(payload.kind, &payload.file_name, raw))
            .collect();
        let files = payloads
            .iter()
            .map(|payload| ClaimDocument {
                id: Uuid::new_v4(),
                name: payload.file_name.clone(),
                size: payload.size,
                upload_date: now,
                url: payload.url.clone(),
            })
            .collect();
        let set = ExtractedDocumentSet::from_documents(documents, files)?;

        let existing = self.repository.fetch_all_claims()?;
        let outcome = merge_document_set(&existing, &set, now)?;
        self.repository.save_claim(&outcome.claim)?;

        for warning in &outcome.warnings {
            tracing::warn!(
                claim_id = %outcome.claim.claim_id,
                kind = ?warning.kind,
                field = %warning.field,
                item_code = warning.item_code.as_deref().unwrap_or("-"),
                "{}",
                warning.message
            );
        }

        Ok(outcome)
    }

    /// Apply a reviewer action and persist the result.
    ///
    /// Returns the updated claim, or `None` when the action deleted it.
    pub fn submit_action(&mut self, action: &ReviewAction) -> Result<Option<Claim>, ClaimDeskError> {
        let claim = self
            .repository
            .get_claim(&action.claim_id)?
            .ok_or_else(|| ReviewError::ClaimNotFound(action.claim_id.clone()))?;

        match apply_action(&claim, action, Utc::now())? {
            ActionOutcome::Updated(updated) => {
                self.repository.save_claim(&updated)?;
                Ok(Some(updated))
            }
            ActionOutcome::Deleted { claim_id } => {
                self.repository.delete_claim(&claim_id)?;
                Ok(None)
            }
        }
    }

    pub fn delete_claim(&mut self, claim_id: &str) -> Result<(), ClaimDeskError> {
        self.submit_action(&ReviewAction::new(claim_id, ActionKind::Delete))
            .map(|_| ())
    }

    pub fn list_claims(&self) -> Result<Vec<Claim>, ClaimDeskError> {
        Ok(self.repository.fetch_all_claims()?)
    }

    pub fn get_claim(&self, claim_id: &str) -> Result<Claim, ClaimDeskError> {
        self.repository
            .get_claim(claim_id)?
            .ok_or_else(|| ReviewError::ClaimNotFound(claim_id.to_string()).into())
    }

    pub fn dashboard_summary(&self) -> Result<DashboardSummary, ClaimDeskError> {
        Ok(summarize(&self.repository.fetch_all_claims()?))
    }
}
