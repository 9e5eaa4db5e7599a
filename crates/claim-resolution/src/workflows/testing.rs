//! Fakes and fixtures shared by the workflow test modules.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::json;

use crate::clock::Clock;
use crate::llm::{Completion, CompletionRequest, LanguageModel, LlmError, TokenUsage};
use crate::store::{ClaimSeed, SqliteStore};
use crate::workflows::analysis::domain::{
    AuditReport, CarrierEstimate, ClaimId, GeneratedEstimate, LineItem, OrganizationId,
    ReportStatus, ScopeSheet, UserId,
};
use crate::workflows::analysis::repository::AnalysisRepository;
use crate::workflows::escalation::domain::{PhotoDocument, UserContact};
use crate::workflows::escalation::notify::{EmailError, EmailSender, OutboundEmail};
use crate::workflows::escalation::storage::{BlobFetcher, ObjectStorage, StorageError};
use crate::workflows::identity::Caller;

pub(crate) const ORG: &str = "org-1";
pub(crate) const OWNER: &str = "user-pm";
pub(crate) const CLAIM: &str = "claim-1";
pub(crate) const OWNER_EMAIL: &str = "pm@propco.com";

pub(crate) fn caller() -> Caller {
    Caller::new(ORG, OWNER)
}

pub(crate) fn claim_id() -> ClaimId {
    ClaimId(CLAIM.to_string())
}

pub(crate) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).single().expect("valid timestamp")
}

/// Language model that replays scripted responses in order and records each request.
#[derive(Default)]
pub(crate) struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub(crate) fn replying(responses: impl IntoIterator<Item = String>) -> Self {
        let model = Self::default();
        for response in responses {
            model.push(Ok(response));
        }
        model
    }

    pub(crate) fn push(&self, response: Result<String, LlmError>) {
        self.responses.lock().expect("lock").push_back(response);
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().expect("lock").push(request);
        let next = self
            .responses
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::NotConfigured("no scripted response left".into())));
        next.map(|text| Completion {
            text,
            model: "scripted-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 1_200,
                completion_tokens: 400,
            },
        })
    }
}

/// Outbox that records every accepted email and rejects listed recipients.
#[derive(Default)]
pub(crate) struct RecordingEmail {
    sent: Mutex<Vec<OutboundEmail>>,
    rejected: Mutex<Vec<String>>,
}

impl RecordingEmail {
    pub(crate) fn reject(&self, recipient: &str) {
        self.rejected.lock().expect("lock").push(recipient.to_string());
    }

    pub(crate) fn restore(&self, recipient: &str) {
        self.rejected.lock().expect("lock").retain(|rejected| rejected != recipient);
    }

    pub(crate) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("lock").clone()
    }

    pub(crate) fn sent_to(&self, recipient: &str) -> Vec<OutboundEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.to == recipient)
            .collect()
    }
}

#[async_trait]
impl EmailSender for RecordingEmail {
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError> {
        if self.rejected.lock().expect("lock").contains(&email.to) {
            return Err(EmailError::Rejected(format!("mailbox {} unavailable", email.to)));
        }
        self.sent.lock().expect("lock").push(email);
        Ok(())
    }
}

/// Email sender that never answers, for timeout paths.
pub(crate) struct StalledEmail;

#[async_trait]
impl EmailSender for StalledEmail {
    async fn send(&self, _email: OutboundEmail) -> Result<(), EmailError> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Ok(())
    }
}

/// Object storage whose signed URLs are just `mem://<key>`.
pub(crate) struct MemoryStorage;

impl ObjectStorage for MemoryStorage {
    fn signed_download_url(&self, storage_key: &str, _ttl: Duration) -> Result<String, StorageError> {
        Ok(format!("mem://{storage_key}"))
    }
}

/// Blob store keyed by URL; missing URLs answer 404.
#[derive(Default)]
pub(crate) struct MemoryFetcher {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fetched: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub(crate) fn put(&self, storage_key: &str, bytes: &[u8]) {
        self.blobs
            .lock()
            .expect("lock")
            .insert(format!("mem://{storage_key}"), bytes.to_vec());
    }

    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().expect("lock").clone()
    }
}

#[async_trait]
impl BlobFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        self.fetched.lock().expect("lock").push(url.to_string());
        self.blobs
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

/// Clock pinned to a moment that tests move forward explicitly.
pub(crate) struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub(crate) fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub(crate) fn advance(&self, by: chrono::Duration) {
        let mut now = self.0.lock().expect("lock");
        *now = *now + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("lock")
    }
}

/// In-memory store holding one wind claim owned by `ORG`, its creator, and a scope sheet.
pub(crate) fn seeded_store() -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().expect("in-memory store");
    store
        .seed_claim(&ClaimSeed {
            claim_id: claim_id(),
            organization_id: OrganizationId(ORG.to_string()),
            property_address: "48 Harbor View Rd".to_string(),
            created_by: UserId(OWNER.to_string()),
            claim_number: Some("CLM-2041".to_string()),
            loss_type: Some("wind".to_string()),
            incident_date: NaiveDate::from_ymd_opt(2026, 1, 18),
            adjuster_name: Some("R. Patel".to_string()),
            carrier_name: Some("Harborline Mutual".to_string()),
            policy_number: Some("HM-88231".to_string()),
            deductible: 2_500.0,
            exclusions: Some("Flood and earth movement are excluded.".to_string()),
            created_at: start(),
        })
        .expect("seed claim");
    store
        .seed_user(
            &OrganizationId(ORG.to_string()),
            &UserContact {
                id: UserId(OWNER.to_string()),
                name: "Pat Morgan".to_string(),
                email: OWNER_EMAIL.to_string(),
            },
        )
        .expect("seed user");
    store
        .seed_scope_sheet(
            &ScopeSheet {
                id: "scope-1".to_string(),
                claim_id: claim_id(),
                data: json!({
                    "rooms": [{"name": "Kitchen", "damage": "ceiling water stain, drywall"}],
                    "roof": {"squares": 24, "damage": "missing shingles"}
                }),
            },
            start(),
        )
        .expect("seed scope sheet");
    Arc::new(store)
}

pub(crate) fn line_item(category: &str, description: &str, total: f64) -> LineItem {
    LineItem {
        category: category.to_string(),
        description: description.to_string(),
        quantity: 1.0,
        unit: "EA".to_string(),
        unit_price: total,
        total,
    }
}

/// Contractor estimate totalling $17,340.00.
pub(crate) fn contractor_estimate() -> GeneratedEstimate {
    GeneratedEstimate {
        line_items: vec![
            line_item("Roofing", "Replace shingles", 9_800.0),
            line_item("Interior", "Drywall repair", 4_200.0),
            line_item("Interior", "Paint walls", 1_900.0),
        ],
        subtotal: Some(15_900.0),
        overhead_and_profit: Some(1_440.0),
        total: Some(17_340.0),
    }
}

/// Carrier estimate totalling $14,650.00.
pub(crate) fn seed_carrier(store: &SqliteStore) {
    store
        .seed_carrier_estimate(&CarrierEstimate {
            id: "carrier-1".to_string(),
            claim_id: claim_id(),
            parsed_data: Some(json!({
                "line_items": [
                    {"category": "Roofing", "description": "Replace shingles", "total": 9_800.0},
                    {"category": "Interior", "description": "Drywall repair", "total": 3_950.0},
                    {"category": "Interior", "description": "Paint walls", "total": 900.0}
                ],
                "total": 14_650.0
            })),
            created_at: start(),
        })
        .expect("seed carrier estimate");
}

/// Completed report carrying the $17,340.00 contractor estimate.
pub(crate) fn seed_completed_report(store: &SqliteStore) -> AuditReport {
    let mut report = AuditReport::pending(
        claim_id(),
        "scope-1".to_string(),
        UserId(OWNER.to_string()),
        start(),
    );
    report.generated_estimate = Some(contractor_estimate());
    report.status = ReportStatus::Completed;
    store.insert_report(&report).expect("insert report");
    report
}

pub(crate) fn seed_photos(store: &SqliteStore, fetcher: &MemoryFetcher, count: usize) {
    for index in 0..count {
        let key = format!("claims/{CLAIM}/photo-{index}.jpg");
        store
            .seed_photo(
                &claim_id(),
                &PhotoDocument {
                    id: format!("doc-{index}"),
                    file_name: format!("IMG_{index:04}.jpg"),
                    storage_key: key.clone(),
                    content_type: Some("image/jpeg".to_string()),
                    uploaded_at: start() + chrono::Duration::minutes(index as i64),
                },
            )
            .expect("seed photo");
        fetcher.put(&key, format!("jpeg-{index}").as_bytes());
    }
}

pub(crate) fn strategy_response(status: &str) -> String {
    json!({
        "status": status,
        "summary": "Carrier undercounted drywall and paint.",
        "contractor_total": 17_340.0,
        "carrier_total": 14_650.0,
        "delta": 2_690.0,
        "delta_drivers": [
            {"line_item": "Paint walls", "contractor_price": 1_900.0, "carrier_price": 900.0, "delta": 1_000.0, "reason": "two coats required"}
        ],
        "coverage_disputes": [],
        "required_next_steps": ["Send a supplement request"],
        "legal_threshold_met": false
    })
    .to_string()
}

/// Request carrying the default caller's identity headers.
pub(crate) fn authed(method: &str, uri: &str, body: Option<serde_json::Value>) -> axum::http::Request<axum::body::Body> {
    let builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(crate::workflows::identity::ORGANIZATION_HEADER, ORG)
        .header(crate::workflows::identity::USER_HEADER, OWNER);
    match body {
        Some(body) => builder
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(axum::body::Body::empty()).expect("request"),
    }
}

pub(crate) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
