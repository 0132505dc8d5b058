use rusqlite::{params, Connection};

use super::ClaimRepository;
use crate::db::DatabaseError;
use crate::models::Claim;

/// Insert a claim or replace the stored body for its id.
pub fn upsert_claim(conn: &Connection, claim: &Claim) -> Result<(), DatabaseError> {
    let body = serde_json::to_string(claim)?;
    conn.execute(
        "INSERT INTO claims (claim_id, patient_name, status, body, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(claim_id) DO UPDATE SET
            patient_name = excluded.patient_name,
            status = excluded.status,
            body = excluded.body,
            updated_at = excluded.updated_at",
        params![
            claim.claim_id,
            claim.patient_name,
            claim.latest_status(),
            body,
            claim.created_at.to_rfc3339(),
            claim.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn load_claim(conn: &Connection, claim_id: &str) -> Result<Option<Claim>, DatabaseError> {
    let result = conn.query_row(
        "SELECT body FROM claims WHERE claim_id = ?1",
        params![claim_id],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(body) => Ok(Some(serde_json::from_str(&body)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn load_claim_by_patient(
    conn: &Connection,
    patient_name: &str,
) -> Result<Option<Claim>, DatabaseError> {
    let result = conn.query_row(
        "SELECT body FROM claims WHERE patient_name = ?1 ORDER BY rowid LIMIT 1",
        params![patient_name],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(body) => Ok(Some(serde_json::from_str(&body)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn load_all_claims(conn: &Connection) -> Result<Vec<Claim>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT body FROM claims ORDER BY rowid")?;
    let bodies = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    bodies
        .iter()
        .map(|body| serde_json::from_str(body).map_err(DatabaseError::from))
        .collect()
}

pub fn remove_claim(conn: &Connection, claim_id: &str) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM claims WHERE claim_id = ?1", params![claim_id])?;
    Ok(deleted > 0)
}

/// [`ClaimRepository`] over a SQLite connection.
pub struct SqliteClaimRepository {
    conn: Connection,
}

impl SqliteClaimRepository {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ClaimRepository for SqliteClaimRepository {
    fn fetch_all_claims(&self) -> Result<Vec<Claim>, DatabaseError> {
        load_all_claims(&self.conn)
    }

    fn get_claim(&self, claim_id: &str) -> Result<Option<Claim>, DatabaseError> {
        load_claim(&self.conn, claim_id)
    }

    fn find_by_patient(&self, patient_name: &str) -> Result<Option<Claim>, DatabaseError> {
        load_claim_by_patient(&self.conn, patient_name)
    }

    fn save_claim(&mut self, claim: &Claim) -> Result<(), DatabaseError> {
        upsert_claim(&self.conn, claim)
    }

    fn delete_claim(&mut self, claim_id: &str) -> Result<bool, DatabaseError> {
        remove_claim(&self.conn, claim_id)
    }
}
