use super::ClaimRepository;
use crate::db::DatabaseError;
use crate::models::Claim;

/// [`ClaimRepository`] held in a `Vec`, insertion-ordered. For tests and
/// one-shot runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClaimRepository {
    claims: Vec<Claim>,
}

impl InMemoryClaimRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_claims(claims: Vec<Claim>) -> Self {
        Self { claims }
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

impl ClaimRepository for InMemoryClaimRepository {
    fn fetch_all_claims(&self) -> Result<Vec<Claim>, DatabaseError> {
        Ok(self.claims.clone())
    }

    fn get_claim(&self, claim_id: &str) -> Result<Option<Claim>, DatabaseError> {
        Ok(self.claims.iter().find(|c| c.claim_id == claim_id).cloned())
    }

    fn find_by_patient(&self, patient_name: &str) -> Result<Option<Claim>, DatabaseError> {
        Ok(self.claims.iter().find(|c| c.patient_name == patient_name).cloned())
    }

    fn save_claim(&mut self, claim: &Claim) -> Result<(), DatabaseError> {
        match self.claims.iter().position(|c| c.claim_id == claim.claim_id) {
            Some(index) => self.claims[index] = claim.clone(),
            None => self.claims.push(claim.clone()),
        }
        Ok(())
    }

    fn delete_claim(&mut self, claim_id: &str) -> Result<bool, DatabaseError> {
        let before = self.claims.len();
        self.claims.retain(|c| c.claim_id != claim_id);
        Ok(self.claims.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::sample_claim;

    #[test]
    fn upsert_keeps_insertion_order() {
        let mut repo = InMemoryClaimRepository::new();
        let mut first = sample_claim("C-1", "Jane Roe");
        repo.save_claim(&first).unwrap();
        repo.save_claim(&sample_claim("C-2", "Ali Khan")).unwrap();

        first.query_reason = Some("send notes".into());
        repo.save_claim(&first).unwrap();

        let all = repo.fetch_all_claims().unwrap();
        assert_eq!(repo.len(), 2);
        assert_eq!(all[0].claim_id, "C-1");
        assert_eq!(all[0].query_reason.as_deref(), Some("send notes"));
    }

    #[test]
    fn delete_and_lookups() {
        let mut repo = InMemoryClaimRepository::with_claims(vec![sample_claim("C-1", "Jane Roe")]);
        assert!(repo.find_by_patient("Jane Roe").unwrap().is_some());
        assert!(repo.delete_claim("C-1").unwrap());
        assert!(!repo.delete_claim("C-1").unwrap());
        assert!(repo.is_empty());
    }
}
