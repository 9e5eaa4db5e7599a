
use std::sync::Arc;
use std::time::Duration;

use crate::store::SqliteStore;
use crate::workflows::escalation::domain::{ApprovalToken, IssueApprovalInput, IssuedApproval};
use crate::workflows::escalation::{
    ArtifactAssembler, BlobFetcher, EmailSender, EscalationSettings, LegalEscalationService,
    NotificationDispatcher,
};
use crate::workflows::testing::*;

pub(super) const PARTNER_EMAIL: &str = "dana@reyeslaw.com";
pub(super) const HOMEOWNER_EMAIL: &str = "sam@example.com";

/// Escalation service over a seeded store with in-memory mail, storage and clock.
pub(super) struct Harness {
    pub store: Arc<SqliteStore>,
    pub email: Arc<RecordingEmail>,
    pub fetcher: Arc<MemoryFetcher>,
    pub clock: Arc<FixedClock>,
    pub service: Arc<LegalEscalationService<SqliteStore>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_sender(Arc::new(RecordingEmail::default()), Duration::from_secs(5))
    }

    pub fn with_sender(email: Arc<RecordingEmail>, timeout: Duration) -> Self {
        Self::build(email.clone(), email, timeout)
    }

    pub fn build(email: Arc<RecordingEmail>, sender: Arc<dyn EmailSender>, timeout: Duration) -> Self {
        Self::build_with_fetcher(email, sender, timeout, |_, fetcher| -> Arc<dyn BlobFetcher> {
            fetcher.clone()
        })
    }

    /// Lets a test put its own fetcher in front of the in-memory blobs.
    pub fn build_with_fetcher<F>(
        email: Arc<RecordingEmail>,
        sender: Arc<dyn EmailSender>,
        timeout: Duration,
        wrap: F,
    ) -> Self
    where
        F: FnOnce(&Arc<SqliteStore>, &Arc<MemoryFetcher>) -> Arc<dyn BlobFetcher>,
    {
        let store = seeded_store();
        let fetcher = Arc::new(MemoryFetcher::default());
        let photos = wrap(&store, &fetcher);
        let clock = Arc::new(FixedClock::at(start()));
        let notifier = Arc::new(NotificationDispatcher::new(
            sender,
            store.clone(),
            clock.clone(),
            timeout,
        ));
        let assembler = Arc::new(ArtifactAssembler::new(
            Arc::new(MemoryStorage),
            photos,
            Duration::from_secs(600),
        ));
        let service = Arc::new(LegalEscalationService::new(
            store.clone(),
            assembler,
            notifier,
            clock.clone(),
            EscalationSettings {
                public_base_url: "https://claims.example.com/".to_string(),
                approval_ttl: chrono::Duration::days(7),
            },
        ));
        Self {
            store,
            email,
            fetcher,
            clock,
            service,
        }
    }

    /// Completed report, three photos and an issued request.
    pub fn issued(&self) -> IssuedApproval {
        seed_completed_report(&self.store);
        seed_photos(&self.store, &self.fetcher, 3);
        self.service
            .issue(&caller(), &claim_id(), issue_input())
            .expect("request issued")
    }
}

pub(super) fn issue_input() -> IssueApprovalInput {
    IssueApprovalInput {
        legal_partner_name: "Dana Reyes, Esq.".to_string(),
        legal_partner_email: PARTNER_EMAIL.to_string(),
        homeowner_name: "Sam Ortiz".to_string(),
        homeowner_email: HOMEOWNER_EMAIL.to_string(),
    }
}

/// Token embedded at the end of the homeowner link.
pub(super) fn token_of(issued: &IssuedApproval) -> ApprovalToken {
    let token = issued
        .approval_url
        .rsplit('/')
        .next()
        .expect("token segment");
    ApprovalToken(token.to_string())
}
