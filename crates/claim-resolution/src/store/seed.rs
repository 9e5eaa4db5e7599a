//! Writers for the CRUD-owned tables (properties, policies, users, documents, estimates).
//!
//! Production rows arrive through other services; these exist for tests and local demos.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;
use serde::Serialize;

use super::schema::{CONFIRMED, PHOTO_CATEGORY};
use super::sqlite::{encode_time, SqliteStore};
use super::StoreError;
use crate::workflows::analysis::domain::{CarrierEstimate, ClaimId, OrganizationId, ScopeSheet, UserId};
use crate::workflows::escalation::domain::{PhotoDocument, UserContact};

/// A claim with its property and policy.
#[derive(Debug, Clone)]
pub struct ClaimSeed {
    pub claim_id: ClaimId,
    pub organization_id: OrganizationId,
    pub property_address: String,
    pub created_by: UserId,
    pub claim_number: Option<String>,
    pub loss_type: Option<String>,
    pub incident_date: Option<NaiveDate>,
    pub adjuster_name: Option<String>,
    pub carrier_name: Option<String>,
    pub policy_number: Option<String>,
    pub deductible: f64,
    pub exclusions: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row of `notification_log` as read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEntry {
    pub kind: String,
    pub recipient: String,
    pub outcome: String,
    pub error: Option<String>,
}

impl SqliteStore {
    pub fn seed_claim(&self, seed: &ClaimSeed) -> Result<(), StoreError> {
        let property_id = format!("prop_{}", seed.claim_id.0);
        let policy_id = format!("pol_{}", seed.claim_id.0);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO properties (id, organization_id, address) VALUES (?1, ?2, ?3)",
            params![property_id, seed.organization_id.0, seed.property_address],
        )?;
        tx.execute(
            "INSERT INTO policies (id, property_id, carrier_name, policy_number, deductible, exclusions) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                policy_id,
                property_id,
                seed.carrier_name,
                seed.policy_number,
                seed.deductible,
                seed.exclusions
            ],
        )?;
        tx.execute(
            "INSERT INTO claims (id, property_id, policy_id, claim_number, loss_type, incident_date, \
                 adjuster_name, created_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                seed.claim_id.0,
                property_id,
                policy_id,
                seed.claim_number,
                seed.loss_type,
                seed.incident_date,
                seed.adjuster_name,
                seed.created_by.0,
                encode_time(seed.created_at),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn seed_user(
        &self,
        organization_id: &OrganizationId,
        contact: &UserContact,
    ) -> Result<(), StoreError> {
        self.lock()?.execute(
            "INSERT INTO users (id, organization_id, name, email) VALUES (?1, ?2, ?3, ?4)",
            params![contact.id.0, organization_id.0, contact.name, contact.email],
        )?;
        Ok(())
    }

    pub fn seed_scope_sheet(
        &self,
        sheet: &ScopeSheet,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_string(&sheet.data)?;
        self.lock()?.execute(
            "INSERT INTO scope_sheets (id, claim_id, data, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![sheet.id, sheet.claim_id.0, data, encode_time(created_at)],
        )?;
        Ok(())
    }

    pub fn seed_carrier_estimate(&self, estimate: &CarrierEstimate) -> Result<(), StoreError> {
        let parsed = estimate
            .parsed_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.lock()?.execute(
            "INSERT INTO carrier_estimates (id, claim_id, parsed_data, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                estimate.id,
                estimate.claim_id.0,
                parsed,
                encode_time(estimate.created_at)
            ],
        )?;
        Ok(())
    }

    /// Stores a confirmed contractor photo.
    pub fn seed_photo(&self, claim_id: &ClaimId, photo: &PhotoDocument) -> Result<(), StoreError> {
        self.lock()?.execute(
            "INSERT INTO documents (id, claim_id, category, status, file_name, storage_key, \
                 content_type, uploaded_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                photo.id,
                claim_id.0,
                PHOTO_CATEGORY,
                CONFIRMED,
                photo.file_name,
                photo.storage_key,
                photo.content_type,
                encode_time(photo.uploaded_at),
            ],
        )?;
        Ok(())
    }

    /// Notification outcomes for a claim in the order they were recorded.
    pub fn notifications(&self, claim_id: &ClaimId) -> Result<Vec<NotificationEntry>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT kind, recipient, outcome, error FROM notification_log \
             WHERE claim_id = ?1 ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![claim_id.0], |row| {
                Ok(NotificationEntry {
                    kind: row.get(0)?,
                    recipient: row.get(1)?,
                    outcome: row.get(2)?,
                    error: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Metered model calls recorded for a claim.
    pub fn usage_count(&self, claim_id: &ClaimId) -> Result<u32, StoreError> {
        let count = self.lock()?.query_row(
            "SELECT COUNT(*) FROM api_usage WHERE claim_id = ?1",
            params![claim_id.0],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
