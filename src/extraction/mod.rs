//! Field extraction boundary.
//!
//! Everything the vision model returns is untrusted. Raw replies are parsed
//! leniently into [`RawExtraction`], then normalized exactly once into
//! [`ExtractedDocument`] (currency coerced, `"-"` sentinels dropped, dates
//! parsed). Nothing downstream re-checks raw values.

pub mod types;
pub mod currency;
pub mod sanitize;
pub mod parser;
pub mod prompt;
pub mod ollama;
pub mod offline;
pub mod fanout;

pub use types::*;
pub use currency::*;
pub use sanitize::*;
pub use parser::*;
pub use ollama::*;
pub use offline::*;
pub use fanout::*;

use thiserror::Error;

use crate::models::DocumentKind;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed extractor response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("{kind} document {file_name} has no pages")]
    EmptyDocument { kind: DocumentKind, file_name: String },

    #[error("Extraction task failed: {0}")]
    TaskJoin(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
