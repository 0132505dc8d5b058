//! Document-set merge and status-derivation engine.
//!
//! Pure functions over in-memory claims. Every public operation takes a
//! snapshot and returns a new value; callers persist the result. An error
//! means nothing was applied.

pub mod status;
pub mod items;
pub mod merge;
pub mod actions;
pub mod summary;

pub use status::*;
pub use items::*;
pub use merge::*;
pub use actions::*;
pub use summary::*;

use thiserror::Error;

use crate::models::ActionKind;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReviewError {
    #[error("Claim document {file_name} has no patient name")]
    MissingPatientName { file_name: String },

    #[error("A comment is required to {action}")]
    MissingComment { action: ActionKind },

    #[error("Claim not found: {0}")]
    ClaimNotFound(String),

    #[error("Item {item_code} not found on claim {claim_id}")]
    ItemNotFound { claim_id: String, item_code: String },

    #[error("Document set has no claim document")]
    MissingClaimDocument,

    #[error("Delete applies to the whole claim, not to item {0}")]
    ItemScopedDelete(String),
}
