//! Claim persistence behind a trait, with SQLite and in-memory backends.
//!
//! The engine never talks to storage directly: the service reads a snapshot
//! through [`ClaimRepository`], computes a new claim, then writes it back.

mod claim;
mod memory;

pub use claim::*;
pub use memory::*;

use super::DatabaseError;
use crate::models::Claim;

/// Storage for claims, keyed by claim id.
pub trait ClaimRepository: Send {
    /// Every stored claim, oldest first.
    fn fetch_all_claims(&self) -> Result<Vec<Claim>, DatabaseError>;

    fn get_claim(&self, claim_id: &str) -> Result<Option<Claim>, DatabaseError>;

    /// Exact, case-sensitive patient name match.
    fn find_by_patient(&self, patient_name: &str) -> Result<Option<Claim>, DatabaseError>;

    /// Insert or replace by claim id.
    fn save_claim(&mut self, claim: &Claim) -> Result<(), DatabaseError>;

    /// Returns false when no claim had that id.
    fn delete_claim(&mut self, claim_id: &str) -> Result<bool, DatabaseError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_trait_is_object_safe() {
        fn _assert(_: &dyn ClaimRepository) {}
    }
}
