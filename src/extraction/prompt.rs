use crate::models::DocumentKind;

/// System prompt shared by all document kinds.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "\
You read scanned health insurance prior-authorization documents and return their \
fields as JSON. Copy values exactly as printed. Never guess: when a field is not \
on the page, write \"-\". Amounts are copied with their currency symbols.";

const FIELD_LIST: &str = "\
Return one ```json block with exactly these keys:
{
  \"claimId\": string,
  \"patientName\": string,
  \"dateOfService\": string,
  \"totalAmt\": string,
  \"acceptedAmt\": string,
  \"deniedAmt\": string,
  \"status\": string,
  \"reason\": string,
  \"queryReason\": string,
  \"additionalInfoRequired\": string,
  \"items\": [
    {\"itemCode\": string, \"procedure\": string, \"amount\": string, \"approvedAmt\": string,
     \"qty\": number, \"status\": string, \"reason\": string, \"queryReason\": string}
  ]
}";

/// Build the user prompt for one document kind.
pub fn build_extraction_prompt(kind: DocumentKind) -> String {
    let focus = match kind {
        DocumentKind::Claim => {
            "This is a CLAIM form submitted by the hospital. Read the billed line items \
             (item code, procedure, quantity, amount). It carries no approval data: \
             write \"-\" for approvedAmt, status, reason and queryReason."
        }
        DocumentKind::Approval => {
            "This is an APPROVAL letter from the insurer. For every line item read the \
             approved amount, the status, and any denial reason. Read the claim-level \
             approved and denied totals."
        }
        DocumentKind::Query => {
            "This is a QUERY letter from the insurer. For every line item read the approved \
             amount, any denial reason and any query raised. Copy any request for \
             additional information into additionalInfoRequired."
        }
    };
    format!("Document type hint: {}\n{focus}\n\n{FIELD_LIST}", kind.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_kind_hint_and_keys() {
        for kind in [DocumentKind::Claim, DocumentKind::Approval, DocumentKind::Query] {
            let prompt = build_extraction_prompt(kind);
            assert!(prompt.contains(kind.as_str()));
            assert!(prompt.contains("\"approvedAmt\""));
            assert!(prompt.contains("```json"));
        }
    }

    #[test]
    fn query_prompt_asks_for_additional_info() {
        assert!(build_extraction_prompt(DocumentKind::Query).contains("additionalInfoRequired"));
    }

    #[test]
    fn system_prompt_names_the_sentinel() {
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("\"-\""));
    }
}
