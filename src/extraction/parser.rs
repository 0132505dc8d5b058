use super::types::RawExtraction;
use super::ExtractionError;

/// Parse a vision model reply into the raw field bag.
///
/// Models are asked for a fenced ```json block but often answer with a bare
/// object or wrap it in prose; all three shapes are accepted.
pub fn parse_extractor_response(response: &str) -> Result<RawExtraction, ExtractionError> {
    let json_str = extract_json_object(response)?;
    serde_json::from_str::<RawExtraction>(json_str)
        .map_err(|e| ExtractionError::JsonParsing(e.to_string()))
}

/// Locate the JSON object inside a model reply.
fn extract_json_object(response: &str) -> Result<&str, ExtractionError> {
    if let Some(fenced) = fenced_block(response, "```json").or_else(|| fenced_block(response, "```")) {
        if fenced.starts_with('{') {
            return Ok(fenced);
        }
    }

    let start = response
        .find('{')
        .ok_or_else(|| ExtractionError::MalformedResponse("No JSON object found".into()))?;
    let end = response
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| ExtractionError::MalformedResponse("Unclosed JSON object".into()))?;

    Ok(response[start..=end].trim())
}

fn fenced_block<'a>(response: &'a str, fence: &str) -> Option<&'a str> {
    let open = response.find(fence)?;
    let content_start = open + fence.len();
    let close = response[content_start..].find("```")?;
    Some(response[content_start..content_start + close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn parses_fenced_json_block() {
        let response = r#"Here are the fields:

```json
{
  "claimId": "CLM-2024-118204",
  "patientName": "Jane Roe",
  "items": [{"itemCode": "LAB01", "amount": "115.00"}]
}
```

Let me know if you need anything else."#;
        let raw = parse_extractor_response(response).unwrap();
        assert_eq!(raw.claim_id, Some(Value::from("CLM-2024-118204")));
        assert_eq!(raw.line_items().len(), 1);
    }

    #[test]
    fn parses_unlabelled_fence() {
        let response = "```\n{\"patientName\": \"Ann Lee\"}\n```";
        let raw = parse_extractor_response(response).unwrap();
        assert_eq!(raw.patient_name, Some(Value::from("Ann Lee")));
    }

    #[test]
    fn parses_bare_object_with_prose() {
        let response = "Sure. {\"status\": \"Approved\", \"reason\": \"-\"} Done.";
        let raw = parse_extractor_response(response).unwrap();
        assert_eq!(raw.status, Some(Value::from("Approved")));
        assert_eq!(raw.reason, Some(Value::from("-")));
    }

    #[test]
    fn missing_object_is_malformed() {
        let result = parse_extractor_response("I could not read this document.");
        assert!(matches!(result, Err(ExtractionError::MalformedResponse(_))));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let result = parse_extractor_response("```json\n{claimId: CLM}\n```");
        assert!(matches!(result, Err(ExtractionError::JsonParsing(_))));
    }

    #[test]
    fn sentinel_items_parse_as_no_items() {
        for reply in [
            r#"{"patientName":"Jane Roe","status":"Query Raised","items":"-"}"#,
            r#"{"patientName":"Jane Roe","items":"none"}"#,
            r#"{"patientName":"Jane Roe","items":null}"#,
        ] {
            let raw = parse_extractor_response(reply).unwrap();
            assert_eq!(raw.patient_name, Some(Value::from("Jane Roe")));
            assert!(raw.line_items().is_empty(), "{reply}");
        }
    }
}
