//! Ollama-backed field extractor.
//!
//! Page images are base64-encoded and sent to `/api/chat` together with a
//! document-kind prompt; the reply's JSON block becomes a [`RawExtraction`].

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::parser::parse_extractor_response;
use super::prompt::{build_extraction_prompt, EXTRACTION_SYSTEM_PROMPT};
use super::types::{DocumentPayload, FieldExtractor, RawExtraction, VisionClient};
use super::ExtractionError;
use crate::config::ExtractorConfig;

/// Upper bound on tokens generated for one document.
const MAX_PREDICT_TOKENS: i32 = 2048;

/// Ollama HTTP client for vision chat requests.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a new OllamaClient pointing at an Ollama instance.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ExtractionError> {
        Self::new(&config.ollama_url, config.timeout_secs)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ExtractionError {
        if e.is_connect() {
            ExtractionError::OllamaConnection(self.base_url.clone())
        } else if e.is_timeout() {
            ExtractionError::Timeout(self.timeout_secs)
        } else {
            ExtractionError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama `/api/chat` with images.
#[derive(Serialize)]
struct VisionChatRequest<'a> {
    model: &'a str,
    messages: Vec<VisionChatMessage<'a>>,
    stream: bool,
    format: &'a str,
    options: VisionGenerationOptions,
}

#[derive(Serialize)]
struct VisionChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
}

/// Deterministic decoding for field extraction.
#[derive(Serialize)]
struct VisionGenerationOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Deserialize)]
struct VisionChatResponse {
    message: VisionChatReply,
}

#[derive(Deserialize)]
struct VisionChatReply {
    content: String,
}

impl VisionClient for OllamaClient {
    fn chat_with_images(
        &self,
        model: &str,
        user_prompt: &str,
        images: &[String],
        system: Option<&str>,
    ) -> Result<String, ExtractionError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(VisionChatMessage {
                role: "system",
                content: system,
                images: None,
            });
        }
        messages.push(VisionChatMessage {
            role: "user",
            content: user_prompt,
            images: Some(images),
        });

        let body = VisionChatRequest {
            model,
            messages,
            stream: false,
            format: "json",
            options: VisionGenerationOptions {
                temperature: 0.0,
                num_predict: MAX_PREDICT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: VisionChatResponse = response
            .json()
            .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

        Ok(parsed.message.content)
    }
}

/// Production field extractor: one vision chat call per document.
pub struct OllamaFieldExtractor {
    vision_client: Arc<dyn VisionClient>,
    model_name: String,
}

impl OllamaFieldExtractor {
    pub fn new(vision_client: Arc<dyn VisionClient>, model_name: impl Into<String>) -> Self {
        Self {
            vision_client,
            model_name: model_name.into(),
        }
    }

    /// Build the extractor from configuration (Ollama URL, model, timeout).
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ExtractionError> {
        let client = OllamaClient::from_config(config)?;
        Ok(Self::new(Arc::new(client), config.vision_model.clone()))
    }
}

impl FieldExtractor for OllamaFieldExtractor {
    fn extract(&self, payload: &DocumentPayload) -> Result<RawExtraction, ExtractionError> {
        let _span = tracing::info_span!(
            "extract_fields",
            kind = %payload.kind,
            model = %self.model_name,
            pages = payload.pages.len(),
        )
        .entered();
        let start = std::time::Instant::now();

        if payload.pages.is_empty() {
            return Err(ExtractionError::EmptyDocument {
                kind: payload.kind,
                file_name: payload.file_name.clone(),
            });
        }

        let images: Vec<String> = payload
            .pages
            .iter()
            .map(|page| base64::engine::general_purpose::STANDARD.encode(page))
            .collect();
        let prompt = build_extraction_prompt(payload.kind);

        let reply = self.vision_client.chat_with_images(
            &self.model_name,
            &prompt,
            &images,
            Some(EXTRACTION_SYSTEM_PROMPT),
        )?;
        let raw = parse_extractor_response(&reply)?;

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            reply_len = reply.len(),
            items = raw.line_items().len(),
            "Field extraction complete"
        );

        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentKind;
    use serde_json::Value;
    use std::sync::Mutex;

    /// Records the last request and replies with a fixed string.
    struct RecordingVisionClient {
        reply: Result<String, u16>,
        seen: Mutex<Vec<(String, usize, Option<String>)>>,
    }

    impl RecordingVisionClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(vec![]),
            }
        }
    }

    impl VisionClient for RecordingVisionClient {
        fn chat_with_images(
            &self,
            model: &str,
            user_prompt: &str,
            images: &[String],
            system: Option<&str>,
        ) -> Result<String, ExtractionError> {
            self.seen.lock().unwrap().push((
                format!("{model}|{user_prompt}"),
                images.len(),
                system.map(str::to_string),
            ));
            match &self.reply {
                Ok(r) => Ok(r.clone()),
                Err(status) => Err(ExtractionError::OllamaError {
                    status: *status,
                    body: "boom".into(),
                }),
            }
        }
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", 60).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.timeout_secs, 60);
    }

    #[test]
    fn extractor_sends_every_page_with_kind_prompt() {
        let vision = Arc::new(RecordingVisionClient::replying(
            "```json\n{\"patientName\": \"Jane Roe\"}\n```",
        ));
        let extractor = OllamaFieldExtractor::new(vision.clone(), "llava:13b");
        let payload = DocumentPayload::new(
            DocumentKind::Approval,
            "approval.png",
            vec![b"page-1".to_vec(), b"page-2".to_vec()],
        );

        let raw = extractor.extract(&payload).unwrap();
        assert_eq!(raw.patient_name, Some(Value::from("Jane Roe")));

        let seen = vision.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.starts_with("llava:13b|"));
        assert!(seen[0].0.contains("APPROVAL"));
        assert_eq!(seen[0].1, 2);
        assert_eq!(seen[0].2.as_deref(), Some(EXTRACTION_SYSTEM_PROMPT));
    }

    #[test]
    fn empty_payload_is_rejected_before_any_call() {
        let vision = Arc::new(RecordingVisionClient::replying("{}"));
        let extractor = OllamaFieldExtractor::new(vision.clone(), "llava");
        let payload = DocumentPayload::new(DocumentKind::Claim, "claim.pdf", vec![]);

        let result = extractor.extract(&payload);
        assert!(matches!(result, Err(ExtractionError::EmptyDocument { .. })));
        assert!(vision.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn vision_errors_propagate() {
        let vision = Arc::new(RecordingVisionClient {
            reply: Err(500),
            seen: Mutex::new(vec![]),
        });
        let extractor = OllamaFieldExtractor::new(vision, "llava");
        let payload = DocumentPayload::new(DocumentKind::Query, "q.png", vec![vec![1]]);
        let result = extractor.extract(&payload);
        assert!(matches!(result, Err(ExtractionError::OllamaError { status: 500, .. })));
    }

    #[test]
    fn unparseable_reply_is_an_error() {
        let vision = Arc::new(RecordingVisionClient::replying("I cannot read this image."));
        let extractor = OllamaFieldExtractor::new(vision, "llava");
        let payload = DocumentPayload::new(DocumentKind::Query, "q.png", vec![vec![1]]);
        assert!(matches!(
            extractor.extract(&payload),
            Err(ExtractionError::MalformedResponse(_))
        ));
    }
}
