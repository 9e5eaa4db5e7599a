#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use claim_resolution::clock::Clock;
use claim_resolution::llm::{Completion, CompletionRequest, LanguageModel, LlmError, TokenUsage};
use claim_resolution::store::{ClaimSeed, SqliteStore};
use claim_resolution::workflows::analysis::{ClaimId, OrganizationId, ScopeSheet, UserId};
use claim_resolution::workflows::escalation::domain::{PhotoDocument, UserContact};
use claim_resolution::workflows::escalation::{
    BlobFetcher, EmailError, EmailSender, ObjectStorage, OutboundEmail, StorageError,
};
use claim_resolution::workflows::identity::Caller;
use serde_json::json;

pub const ORG: &str = "org-harbor";
pub const MANAGER: &str = "user-manager";
pub const MANAGER_EMAIL: &str = "manager@harborpm.com";

pub fn caller() -> Caller {
    Caller::new(ORG, MANAGER)
}

pub fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 6, 9, 30, 0).single().expect("valid timestamp")
}

/// Replays canned completions in order.
#[derive(Default)]
pub struct CannedModel {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<usize>,
}

impl CannedModel {
    pub fn new(replies: impl IntoIterator<Item = String>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("lock")
    }
}

#[async_trait]
impl LanguageModel for CannedModel {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, LlmError> {
        *self.calls.lock().expect("lock") += 1;
        let text = self
            .replies
            .lock()
            .expect("lock")
            .pop_front()
            .ok_or(LlmError::EmptyCompletion)?;
        Ok(Completion {
            text,
            model: "canned".to_string(),
            usage: TokenUsage {
                prompt_tokens: 900,
                completion_tokens: 300,
            },
        })
    }
}

#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl Outbox {
    pub fn to(&self, recipient: &str) -> Vec<OutboundEmail> {
        self.sent
            .lock()
            .expect("lock")
            .iter()
            .filter(|email| email.to == recipient)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EmailSender for Outbox {
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError> {
        self.sent.lock().expect("lock").push(email);
        Ok(())
    }
}

/// Signs keys as `bucket://<key>` and serves whatever was uploaded.
#[derive(Default)]
pub struct Bucket {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl Bucket {
    pub fn upload(&self, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .expect("lock")
            .insert(format!("bucket://{key}"), bytes.to_vec());
    }
}

impl ObjectStorage for Bucket {
    fn signed_download_url(&self, storage_key: &str, _ttl: Duration) -> Result<String, StorageError> {
        Ok(format!("bucket://{storage_key}"))
    }
}

#[async_trait]
impl BlobFetcher for Bucket {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .expect("lock")
            .get(url)
            .cloned()
            .ok_or_else(|| StorageError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

pub struct SteppedClock(Mutex<DateTime<Utc>>);

impl SteppedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.0.lock().expect("lock");
        *now = *now + chrono::Duration::days(days);
    }
}

impl Clock for SteppedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("lock")
    }
}

/// Store holding one claim with a scope sheet and its creator's contact.
pub fn store_with_claim(
    claim: &str,
    loss_type: &str,
    deductible: f64,
    exclusions: Option<&str>,
) -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().expect("in-memory store");
    store
        .seed_claim(&ClaimSeed {
            claim_id: ClaimId(claim.to_string()),
            organization_id: OrganizationId(ORG.to_string()),
            property_address: "910 Lakeshore Dr".to_string(),
            created_by: UserId(MANAGER.to_string()),
            claim_number: Some(format!("HM-{claim}")),
            loss_type: Some(loss_type.to_string()),
            incident_date: NaiveDate::from_ymd_opt(2026, 2, 20),
            adjuster_name: Some("L. Chen".to_string()),
            carrier_name: Some("Lakeshore Casualty".to_string()),
            policy_number: Some("LC-4410".to_string()),
            deductible,
            exclusions: exclusions.map(str::to_string),
            created_at: monday(),
        })
        .expect("seed claim");
    store
        .seed_user(
            &OrganizationId(ORG.to_string()),
            &UserContact {
                id: UserId(MANAGER.to_string()),
                name: "Morgan Lee".to_string(),
                email: MANAGER_EMAIL.to_string(),
            },
        )
        .expect("seed user");
    store
        .seed_scope_sheet(
            &ScopeSheet {
                id: format!("scope-{claim}"),
                claim_id: ClaimId(claim.to_string()),
                data: json!({"rooms": [{"name": "Living room", "damage": "smoke and soot"}]}),
            },
            monday(),
        )
        .expect("seed scope sheet");
    Arc::new(store)
}

pub fn photo(claim: &str, index: usize, bucket: Option<&Bucket>, store: &SqliteStore) {
    let key = format!("claims/{claim}/site-{index}.png");
    store
        .seed_photo(
            &ClaimId(claim.to_string()),
            &PhotoDocument {
                id: format!("{claim}-photo-{index}"),
                file_name: format!("site-{index}.png"),
                storage_key: key.clone(),
                content_type: Some("image/png".to_string()),
                uploaded_at: monday() + chrono::Duration::minutes(index as i64),
            },
        )
        .expect("seed photo");
    if let Some(bucket) = bucket {
        bucket.upload(&key, format!("png-{index}").as_bytes());
    }
}

/// Estimate completion whose line items sum to `total`.
pub fn estimate_reply(items: &[(&str, f64)]) -> String {
    let total: f64 = items.iter().map(|(_, amount)| amount).sum();
    let line_items: Vec<_> = items
        .iter()
        .map(|(description, amount)| {
            json!({"category": "Restoration", "description": description, "quantity": 1, "unit": "EA", "unit_price": amount, "total": amount})
        })
        .collect();
    json!({"line_items": line_items, "subtotal": total, "total": total}).to_string()
}

pub fn strategy_reply(status: &str) -> String {
    json!({
        "status": status,
        "summary": "Carrier offer reviewed against the contractor estimate.",
        "contractor_total": 0.0,
        "carrier_total": 0.0,
        "delta": 0.0,
        "delta_drivers": [],
        "coverage_disputes": [],
        "required_next_steps": ["Request a re-inspection"],
        "legal_threshold_met": false
    })
    .to_string()
}

pub fn viability_reply(recommendation: &str) -> String {
    json!({
        "recommendation": recommendation,
        "net_estimated_recovery": 0.0,
        "economics_score": 50,
        "coverage_score": 50,
        "risks": [],
        "next_steps": ["Collect contractor invoices"],
        "summary": "Screened against the scoring table."
    })
    .to_string()
}
