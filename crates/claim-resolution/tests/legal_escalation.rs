mod support;

use std::sync::Arc;
use std::time::Duration;

use claim_resolution::error::ResolutionError;
use claim_resolution::store::SqliteStore;
use claim_resolution::workflows::analysis::{
    AuditReport, ClaimId, GeneratedEstimate, LineItem, ReportStatus, UserId,
};
use claim_resolution::workflows::analysis::AnalysisRepository;
use claim_resolution::workflows::escalation::{
    ApprovalStatus, ApprovalToken, ArtifactAssembler, ArtifactError, EscalationRepository,
    EscalationSettings, EscalationStatus, IssueApprovalInput, LegalEscalationService,
    NotificationDispatcher,
};
use support::*;

const PARTNER: &str = "intake@okaforlaw.com";
const HOMEOWNER: &str = "jordan@example.net";

struct Escalation {
    store: Arc<SqliteStore>,
    bucket: Arc<Bucket>,
    outbox: Arc<Outbox>,
    clock: Arc<SteppedClock>,
    service: LegalEscalationService<SqliteStore>,
}

fn escalation(claim: &str) -> Escalation {
    let store = store_with_claim(claim, "water", 1_000.0, None);
    let bucket = Arc::new(Bucket::default());
    let outbox = Arc::new(Outbox::default());
    let clock = Arc::new(SteppedClock::new(monday()));
    let notifier = Arc::new(NotificationDispatcher::new(
        outbox.clone(),
        store.clone(),
        clock.clone(),
        Duration::from_secs(5),
    ));
    let assembler = Arc::new(ArtifactAssembler::new(
        bucket.clone(),
        bucket.clone(),
        Duration::from_secs(300),
    ));
    let service = LegalEscalationService::new(
        store.clone(),
        assembler,
        notifier,
        clock.clone(),
        EscalationSettings {
            public_base_url: "https://app.harborpm.com".to_string(),
            approval_ttl: chrono::Duration::days(7),
        },
    );

    let mut report = AuditReport::pending(
        ClaimId(claim.to_string()),
        format!("scope-{claim}"),
        UserId(MANAGER.to_string()),
        monday(),
    );
    report.generated_estimate = Some(GeneratedEstimate {
        line_items: vec![LineItem {
            category: "Water Mitigation".to_string(),
            description: "Dry-out and dehumidification".to_string(),
            quantity: 3.0,
            unit: "DAY".to_string(),
            unit_price: 1_150.0,
            total: 3_450.0,
        }],
        subtotal: Some(3_450.0),
        overhead_and_profit: None,
        total: Some(3_450.0),
    });
    report.status = ReportStatus::Completed;
    store.insert_report(&report).expect("insert report");

    Escalation {
        store,
        bucket,
        outbox,
        clock,
        service,
    }
}

fn input() -> IssueApprovalInput {
    IssueApprovalInput {
        legal_partner_name: "Okafor Law Group".to_string(),
        legal_partner_email: PARTNER.to_string(),
        homeowner_name: "Jordan Blake".to_string(),
        homeowner_email: HOMEOWNER.to_string(),
    }
}

fn token(url: &str) -> ApprovalToken {
    ApprovalToken(url.rsplit('/').next().unwrap_or_default().to_string())
}

fn claim_status(store: &SqliteStore, claim: &ClaimId) -> Option<EscalationStatus> {
    store
        .claim_snapshot(claim, None)
        .expect("query")
        .expect("claim")
        .escalation_status
}

#[tokio::test]
async fn declining_a_day_later_never_reaches_the_legal_partner() {
    let escalation = escalation("water-12");
    let claim = ClaimId("water-12".to_string());
    photo("water-12", 0, Some(&escalation.bucket), &escalation.store);

    let issued = escalation
        .service
        .issue(&caller(), &claim, input())
        .expect("issued");
    assert_eq!(issued.request.expires_at, monday() + chrono::Duration::days(7));

    escalation.clock.advance_days(1);
    let outcome = escalation
        .service
        .respond(&token(&issued.approval_url), "decline")
        .await
        .expect("declined");

    assert_eq!(outcome.status, ApprovalStatus::Declined);
    assert_eq!(claim_status(&escalation.store, &claim), Some(EscalationStatus::Declined));

    escalation.service.notifier().drain().await;
    assert!(escalation.outbox.to(PARTNER).is_empty());
    assert_eq!(escalation.outbox.to(HOMEOWNER).len(), 1);
}

#[tokio::test]
async fn approval_delivers_one_package_and_the_token_is_single_use() {
    let escalation = escalation("water-13");
    let claim = ClaimId("water-13".to_string());
    for index in 0..2 {
        photo("water-13", index, Some(&escalation.bucket), &escalation.store);
    }
    let issued = escalation
        .service
        .issue(&caller(), &claim, input())
        .expect("issued");
    let token = token(&issued.approval_url);

    let outcome = escalation
        .service
        .respond(&token, "approve")
        .await
        .expect("approved");
    assert_eq!(outcome.package.map(|package| package.photo_count), Some(2));

    match escalation.service.respond(&token, "approve").await {
        Err(ResolutionError::PreconditionFailed(_)) => {}
        other => panic!("expected precondition failure, got {other:?}"),
    }
    assert_eq!(escalation.outbox.to(PARTNER).len(), 1);

    escalation.service.notifier().drain().await;
    assert_eq!(escalation.outbox.to(MANAGER_EMAIL).len(), 1);
    assert_eq!(claim_status(&escalation.store, &claim), Some(EscalationStatus::Approved));
}

#[tokio::test]
async fn expired_tokens_transition_once_and_refuse_responses() {
    let escalation = escalation("water-14");
    let claim = ClaimId("water-14".to_string());
    let issued = escalation
        .service
        .issue(&caller(), &claim, input())
        .expect("issued");
    let token = token(&issued.approval_url);
    escalation.clock.advance_days(10);

    assert_eq!(
        escalation.service.resolve(&token).expect("resolved").status,
        ApprovalStatus::Expired
    );
    // A second read finds it already expired and does not write again.
    assert!(!escalation
        .store
        .expire_request(&issued.request.id, monday() + chrono::Duration::days(10))
        .expect("cas"));
    assert_eq!(
        escalation.service.resolve(&token).expect("resolved").status,
        ApprovalStatus::Expired
    );

    match escalation.service.respond(&token, "decline").await {
        Err(ResolutionError::PreconditionFailed(message)) => assert!(message.contains("expired")),
        other => panic!("expected precondition failure, got {other:?}"),
    }
}

#[tokio::test]
async fn a_failed_photo_download_sends_nothing() {
    let escalation = escalation("water-15");
    let claim = ClaimId("water-15".to_string());
    photo("water-15", 0, Some(&escalation.bucket), &escalation.store);
    photo("water-15", 1, None, &escalation.store);
    photo("water-15", 2, Some(&escalation.bucket), &escalation.store);
    let issued = escalation
        .service
        .issue(&caller(), &claim, input())
        .expect("issued");

    match escalation
        .service
        .respond(&token(&issued.approval_url), "approve")
        .await
    {
        Err(ResolutionError::Artifact(ArtifactError::Photo { position, total, .. })) => {
            assert_eq!((position, total), (2, 3));
        }
        other => panic!("expected artifact failure, got {other:?}"),
    }

    assert!(escalation.outbox.to(PARTNER).is_empty());
    assert_eq!(
        claim_status(&escalation.store, &claim),
        Some(EscalationStatus::PendingApproval)
    );
    assert_eq!(
        escalation
            .service
            .resolve(&token(&issued.approval_url))
            .expect("resolved")
            .status,
        ApprovalStatus::Pending
    );
}
