//! Claim merger: one upload's extracted documents into one `Claim`.
//!
//! The merge is keyed on the exact patient name. A new name creates a claim;
//! a known name folds the upload into the existing claim, extending its
//! histories. The function is pure: it reads a snapshot of existing claims
//! and returns the new claim value.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::items::{merge_item_sources, overlay_adjudication, upsert_items};
use super::ReviewError;
use crate::extraction::ExtractedDocument;
use crate::models::{
    denied_amount, Claim, ClaimDocument, ClaimItem, ClaimStatus, DataQualityWarning, DocumentKind,
    TimelineEntry, WarningKind,
};

/// The normalized documents of one upload. The claim document is mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocumentSet {
    pub claim: ExtractedDocument,
    pub approval: Option<ExtractedDocument>,
    pub query: Option<ExtractedDocument>,
    /// Uploaded files to attach to the claim.
    pub files: Vec<ClaimDocument>,
}

impl ExtractedDocumentSet {
    /// Sort extracted documents by kind. A later document of the same kind
    /// replaces an earlier one.
    pub fn from_documents(
        documents: Vec<ExtractedDocument>,
        files: Vec<ClaimDocument>,
    ) -> Result<Self, ReviewError> {
        let (mut claim, mut approval, mut query) = (None, None, None);
        for doc in documents {
            match doc.kind {
                DocumentKind::Claim => claim = Some(doc),
                DocumentKind::Approval => approval = Some(doc),
                DocumentKind::Query => query = Some(doc),
            }
        }

        Ok(Self {
            claim: claim.ok_or(ReviewError::MissingClaimDocument)?,
            approval,
            query,
            files,
        })
    }

    /// Approval and query documents, query first.
    fn adjudication_docs(&self) -> impl Iterator<Item = &ExtractedDocument> {
        self.query.iter().chain(self.approval.iter())
    }

    /// First adjudication document value for a field, query document first.
    fn adjudication_field<T>(&self, field: impl Fn(&ExtractedDocument) -> Option<T>) -> Option<T> {
        self.adjudication_docs().find_map(field)
    }

    /// An adjudication amount together with the document that stated it.
    fn stated_amount(
        &self,
        field: impl Fn(&ExtractedDocument) -> Option<Decimal>,
    ) -> Option<(DocumentKind, Decimal)> {
        self.adjudication_docs().find_map(|d| field(d).map(|value| (d.kind, value)))
    }

    fn date_of_service(&self) -> Option<NaiveDate> {
        self.claim
            .date_of_service
            .or_else(|| self.adjudication_field(|d| d.date_of_service))
    }

    fn additional_info_required(&self) -> Option<String> {
        self.adjudication_field(|d| d.additional_info_required.clone())
            .or_else(|| self.claim.additional_info_required.clone())
    }

    /// Claim-level status named by an adjudication document, if it is a known label.
    fn document_status(&self) -> Option<ClaimStatus> {
        self.adjudication_field(|d| d.status.as_deref().and_then(ClaimStatus::from_label_lenient))
    }
}

/// What a merge produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub claim: Claim,
    /// True when no claim existed for the patient name.
    pub created: bool,
    pub warnings: Vec<DataQualityWarning>,
}

/// Overall claim status from its items.
///
/// A non-empty additional-information request overrides the item-derived
/// status. Without items the adjudication document's own status is used.
pub fn derive_overall_status(
    items: &[ClaimItem],
    document_status: Option<ClaimStatus>,
    additional_info: Option<&str>,
) -> ClaimStatus {
    if additional_info.is_some_and(|text| !text.trim().is_empty()) {
        return ClaimStatus::QueryRaised;
    }
    if items.is_empty() {
        return document_status.unwrap_or(ClaimStatus::UnderReview);
    }
    if items.iter().any(|i| i.status == ClaimStatus::QueryRaised) {
        return ClaimStatus::QueryRaised;
    }

    let approved = items.iter().filter(|i| i.status == ClaimStatus::Approved).count();
    let denied = items.iter().filter(|i| i.status == ClaimStatus::Denied).count();
    match (approved, denied) {
        (a, 0) if a == items.len() => ClaimStatus::Approved,
        (0, d) if d == items.len() => ClaimStatus::Denied,
        (a, d) if a > 0 && d > 0 && a + d == items.len() => ClaimStatus::PartiallyApproved,
        // Reviewer actions can leave items in routing states.
        _ => ClaimStatus::UnderReview,
    }
}

/// Generate a fallback claim id: `CLM-<year>-<6 random digits>`.
pub fn generate_claim_id(year: i32) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    format!("CLM-{year}-{:06}", rng.gen_range(0..1_000_000u32))
}

fn unused_claim_id(existing: &[Claim], year: i32) -> String {
    loop {
        let id = generate_claim_id(year);
        if !existing.iter().any(|c| c.claim_id == id) {
            return id;
        }
    }
}

/// Merge one upload into the claim collection snapshot.
///
/// Returns the new or updated claim; `existing` is not modified. Rejects the
/// upload when the claim document has no patient name.
pub fn merge_document_set(
    existing: &[Claim],
    set: &ExtractedDocumentSet,
    now: DateTime<Utc>,
) -> Result<MergeOutcome, ReviewError> {
    let patient_name = set
        .claim
        .patient_name
        .clone()
        .ok_or_else(|| ReviewError::MissingPatientName {
            file_name: set.claim.file_name.clone(),
        })?;

    let _span = tracing::info_span!("merge_document_set", file = %set.claim.file_name).entered();

    let mut warnings: Vec<DataQualityWarning> = std::iter::once(&set.claim)
        .chain(set.approval.iter())
        .chain(set.query.iter())
        .flat_map(|d| d.warnings.iter().cloned())
        .collect();

    // Items
    let adjudication = overlay_adjudication(
        set.approval.as_ref().map_or(&[][..], |d| d.items.as_slice()),
        set.query.as_ref().map_or(&[][..], |d| d.items.as_slice()),
    );
    let item_merge = merge_item_sources(&set.claim.items, &adjudication);
    warnings.extend(item_merge.dropped_warnings());

    let date_of_service = set.date_of_service();
    let entry_date = date_of_service
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or(now);
    let fallback_query = set.adjudication_field(|d| d.query_reason.clone());

    let found = existing.iter().find(|c| c.patient_name == patient_name);
    let created = found.is_none();
    let mut claim = match found {
        Some(claim) => claim.clone(),
        None => {
            let claim_id = match set.claim.claim_id.clone() {
                Some(id) if existing.iter().any(|c| c.claim_id == id) => {
                    let generated = unused_claim_id(existing, now.year());
                    warnings.push(DataQualityWarning::new(
                        WarningKind::ClaimIdCollision,
                        "claimId",
                        format!("claim id {id} belongs to another patient; using {generated}"),
                    ));
                    generated
                }
                Some(id) => id,
                None => unused_claim_id(existing, now.year()),
            };
            Claim {
                claim_id,
                patient_name: patient_name.clone(),
                date_of_service,
                total_amt: Decimal::ZERO,
                accepted_amt: Decimal::ZERO,
                denied_amt: Decimal::ZERO,
                documents: vec![],
                items: vec![],
                status_history: vec![],
                approval_status: None,
                approval_reason: None,
                query_reason: None,
                created_at: now,
                updated_at: now,
            }
        }
    };

    claim.date_of_service = claim.date_of_service.or(date_of_service);
    for file in &set.files {
        if !claim.has_document(&file.name) {
            claim.documents.push(file.clone());
        }
    }

    warnings.extend(upsert_items(
        &mut claim.items,
        &item_merge.items,
        fallback_query.as_deref(),
        entry_date,
    ));

    // Totals. With no item-level approved amounts the adjudication document's
    // figure stands in until the next item action recomputes from the items.
    claim.recompute_totals();
    if !claim.items.iter().any(|i| i.approved_amt.is_some()) {
        if let Some(accepted) = set.adjudication_field(|d| d.accepted_amt) {
            claim.accepted_amt = accepted;
            claim.denied_amt = denied_amount(claim.total_amt, accepted);
            warnings.push(DataQualityWarning::new(
                WarningKind::DocumentAcceptedAmount,
                "acceptedAmt",
                format!("no item carries an approved amount; using the document figure {accepted}"),
            ));
        }
    }
    warnings.extend(total_mismatches(set, &claim));

    // Claim-level adjudication
    let additional_info = set.additional_info_required();
    let overall = derive_overall_status(&claim.items, set.document_status(), additional_info.as_deref());

    if additional_info.is_some() {
        claim.approval_status = Some(ClaimStatus::AdditionalInfoRequired.as_str().to_string());
    } else if let Some(status) = set.adjudication_field(|d| d.status.clone()) {
        claim.approval_status = Some(status);
    }
    if let Some(reason) = set.adjudication_field(|d| d.reason.clone()) {
        claim.approval_reason = Some(reason);
    }
    if let Some(query) = fallback_query.clone().or_else(|| additional_info.clone()) {
        claim.query_reason = Some(query);
    }

    if claim.latest_status() != Some(overall.as_str()) {
        let comment = claim
            .approval_reason
            .clone()
            .filter(|_| overall == ClaimStatus::Denied || overall == ClaimStatus::PartiallyApproved)
            .or_else(|| claim.query_reason.clone().filter(|_| overall == ClaimStatus::QueryRaised));
        let date = if created { entry_date } else { now };
        claim
            .status_history
            .push(TimelineEntry::new(overall.as_str(), date).with_comment(comment));
    }
    claim.updated_at = now;

    tracing::info!(
        claim_id = %claim.claim_id,
        created,
        items = claim.items.len(),
        status = %overall,
        total = %claim.total_amt,
        accepted = %claim.accepted_amt,
        warnings = warnings.len(),
        "Document set merged"
    );
    tracing::debug!(patient = %claim.patient_name, "Merge target");

    Ok(MergeOutcome {
        claim,
        created,
        warnings,
    })
}

/// Extractor-stated totals that disagree with the recomputed ones.
fn total_mismatches(set: &ExtractedDocumentSet, claim: &Claim) -> Vec<DataQualityWarning> {
    let stated = [
        ("totalAmt", set.claim.total_amt.map(|v| (DocumentKind::Claim, v)), claim.total_amt),
        ("acceptedAmt", set.stated_amount(|d| d.accepted_amt), claim.accepted_amt),
        ("deniedAmt", set.stated_amount(|d| d.denied_amt), claim.denied_amt),
    ];

    stated
        .into_iter()
        .filter_map(|(field, stated, computed)| match stated {
            Some((document, value)) if value != computed => Some(
                DataQualityWarning::new(
                    WarningKind::TotalMismatch,
                    field,
                    format!("document states {value}, items add up to {computed}"),
                )
                .in_document(document),
            ),
            _ => None,
        })
        .collect()
}
