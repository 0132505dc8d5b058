//! Boundary normalization: raw extractor bag → [`ExtractedDocument`].
//!
//! This is the only place that knows about the `"-"` sentinel, blank
//! strings, numbers-as-strings and the assorted date layouts insurers use.

use chrono::NaiveDate;
use serde_json::Value;

use super::currency::{inspect_amount, optional_amount};
use super::types::{ExtractedDocument, ExtractedItem, RawExtraction, RawLineItem};
use crate::models::{DataQualityWarning, DocumentKind, WarningKind};

/// Date layouts seen on claim, approval and query forms.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y/%m/%d",
];

/// Quantity used when a line item does not state one.
pub const DEFAULT_QTY: u32 = 1;

/// Read a text field, treating absent, null, blank and `"-"` as no value.
pub fn clean_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() || text == "-" {
        None
    } else {
        Some(text)
    }
}

/// Parse a date of service in any of the known layouts.
/// A trailing time component (`2024-01-15T00:00:00Z`) is ignored.
pub fn parse_service_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date_part = text.split('T').next().unwrap_or(text);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        })
}

/// Read a quantity. `None` when absent; `Err(())` when present but unreadable.
fn parse_qty(value: Option<&Value>) -> Result<Option<u32>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|q| u32::try_from(q).ok())
            .map(Some)
            .ok_or(()),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == "-" {
                return Ok(None);
            }
            let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u32>().map(Some).map_err(|_| ())
        }
        Some(_) => Err(()),
    }
}

/// Normalize one raw extraction into its trusted shape.
pub fn normalize_extraction(
    kind: DocumentKind,
    file_name: &str,
    raw: &RawExtraction,
) -> ExtractedDocument {
    let mut doc = ExtractedDocument::empty(kind, file_name);
    let mut warnings = Vec::new();

    doc.claim_id = clean_text(raw.claim_id.as_ref());
    doc.patient_name = clean_text(raw.patient_name.as_ref());
    doc.status = clean_text(raw.status.as_ref());
    doc.reason = clean_text(raw.reason.as_ref());
    doc.query_reason = clean_text(raw.query_reason.as_ref());
    doc.additional_info_required = clean_text(raw.additional_info_required.as_ref());

    if let Some(text) = clean_text(raw.date_of_service.as_ref()) {
        doc.date_of_service = parse_service_date(&text);
        if doc.date_of_service.is_none() {
            warnings.push(DataQualityWarning::new(
                WarningKind::UnparseableDate,
                "dateOfService",
                format!("unrecognized date of service {text:?}"),
            ));
        }
    }

    for (field, value, slot) in [
        ("totalAmt", raw.total_amt.as_ref(), &mut doc.total_amt),
        ("acceptedAmt", raw.accepted_amt.as_ref(), &mut doc.accepted_amt),
        ("deniedAmt", raw.denied_amt.as_ref(), &mut doc.denied_amt),
    ] {
        if let Some(amount) = optional_amount(value) {
            warnings.extend(amount.warning(field));
            *slot = Some(amount.value);
        }
    }

    for value in raw.line_items() {
        let Ok(line) = serde_json::from_value::<RawLineItem>(value.clone()) else {
            continue;
        };
        if let Some(item) = normalize_line_item(&line, &mut warnings) {
            doc.items.push(item);
        }
    }

    doc.warnings = warnings.into_iter().map(|w| w.in_document(kind)).collect();
    doc
}

fn normalize_line_item(
    line: &RawLineItem,
    warnings: &mut Vec<DataQualityWarning>,
) -> Option<ExtractedItem> {
    let procedure = clean_text(line.procedure.as_ref());
    let Some(item_code) = clean_text(line.item_code.as_ref()).or_else(|| procedure.clone()) else {
        warnings.push(DataQualityWarning::new(
            WarningKind::MissingItemCode,
            "itemCode",
            "line item without code or procedure skipped",
        ));
        return None;
    };

    let amount = inspect_amount(line.amount.as_ref());
    if let Some(w) = amount.warning("amount") {
        warnings.push(w.for_item(&item_code));
    }

    let approved_amt = optional_amount(line.approved_amt.as_ref()).map(|a| {
        if let Some(w) = a.warning("approvedAmt") {
            warnings.push(w.for_item(&item_code));
        }
        a.value
    });

    let qty = match parse_qty(line.qty.as_ref()) {
        Ok(q) => q.unwrap_or(DEFAULT_QTY),
        Err(()) => {
            warnings.push(
                DataQualityWarning::new(
                    WarningKind::UnparseableQuantity,
                    "qty",
                    format!("quantity unreadable; using {DEFAULT_QTY}"),
                )
                .for_item(&item_code),
            );
            DEFAULT_QTY
        }
    };

    Some(ExtractedItem {
        procedure: procedure.unwrap_or_else(|| item_code.clone()),
        item_code,
        amount: amount.value,
        approved_amt,
        qty,
        status: clean_text(line.status.as_ref()),
        approval_status: clean_text(line.approval_status.as_ref()),
        reason: clean_text(line.reason.as_ref()),
        query_reason: clean_text(line.query_reason.as_ref()),
    })
}
