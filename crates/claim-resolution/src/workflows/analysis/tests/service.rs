use std::sync::Arc;

use serde_json::json;

use crate::error::ResolutionError;
use crate::llm::{LlmError, ValidationError};
use crate::store::SqliteStore;
use crate::workflows::analysis::domain::{AuditReport, CarrierEstimate, ReportStatus, UserId};
use crate::workflows::analysis::repository::AnalysisRepository;
use crate::workflows::analysis::{
    ClaimAnalysisService, ComparisonMode, Recommendation, StrategyStatus,
};
use crate::workflows::identity::Caller;
use crate::workflows::testing::*;

fn service(store: &Arc<SqliteStore>, model: &Arc<ScriptedModel>) -> ClaimAnalysisService<SqliteStore> {
    ClaimAnalysisService::new(store.clone(), model.clone(), Arc::new(FixedClock::at(start())))
}

fn estimate_response() -> String {
    json!({
        "line_items": [
            {"category": "Roofing", "description": "Replace shingles", "quantity": 24, "unit": "SQ", "unit_price": 408.33, "total": 9_800.0},
            {"category": "", "description": "Drywall repair", "quantity": 1, "unit": "EA", "unit_price": 4_200.0, "total": 4_200.0}
        ],
        "subtotal": 14_000.0,
        "overhead_and_profit": 1_400.0,
        "total": 15_400.0
    })
    .to_string()
}

#[tokio::test]
async fn estimate_generation_completes_a_new_report() {
    let store = seeded_store();
    let model = Arc::new(ScriptedModel::replying([format!("```json\n{}\n```", estimate_response())]));

    let report = service(&store, &model)
        .generate_estimate(&caller(), &claim_id(), None)
        .await
        .expect("estimate generated");

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.scope_sheet_id, "scope-1");
    let estimate = report.generated_estimate.as_ref().expect("estimate stored");
    assert_eq!(estimate.total, Some(15_400.0));
    assert_eq!(estimate.line_items[1].category, "General");

    let stored = store.latest_report(&claim_id()).expect("query").expect("report");
    assert_eq!(stored, report);
    assert_eq!(store.usage_count(&claim_id()).expect("usage"), 1);

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert!((requests[0].temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(requests[0].max_tokens, 8_000);
    assert!(requests[0].prompt.contains("missing shingles"));
}

#[tokio::test]
async fn failed_generation_is_persisted_with_its_error() {
    let store = seeded_store();
    let model = Arc::new(ScriptedModel::replying(["I am unable to estimate this.".to_string()]));

    match service(&store, &model)
        .generate_estimate(&caller(), &claim_id(), None)
        .await
    {
        Err(ResolutionError::MalformedResponse(ValidationError::NoJsonObject)) => {}
        other => panic!("expected malformed response, got {other:?}"),
    }

    let stored = store.latest_report(&claim_id()).expect("query").expect("report");
    assert_eq!(stored.status, ReportStatus::Failed);
    assert!(stored.error_message.is_some());
    assert!(stored.generated_estimate.is_none());
}

#[tokio::test]
async fn unknown_scope_sheet_is_not_found() {
    let store = seeded_store();
    let model = Arc::new(ScriptedModel::default());

    match service(&store, &model)
        .generate_estimate(&caller(), &claim_id(), Some("scope-404"))
        .await
    {
        Err(ResolutionError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
    assert!(store.latest_report(&claim_id()).expect("query").is_none());
}

#[tokio::test]
async fn claims_of_other_organizations_are_invisible() {
    let store = seeded_store();
    seed_completed_report(&store);
    let model = Arc::new(ScriptedModel::default());
    let outsider = Caller::new("org-2", "user-x");

    match service(&store, &model).latest_report(&outsider, &claim_id()) {
        Err(ResolutionError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn comparison_requires_a_carrier_estimate() {
    let store = seeded_store();
    seed_completed_report(&store);
    let model = Arc::new(ScriptedModel::default());

    match service(&store, &model)
        .compare_estimates(&caller(), &claim_id(), ComparisonMode::Model)
        .await
    {
        Err(ResolutionError::NotFound(what)) => assert!(what.contains("carrier")),
        other => panic!("expected not found, got {other:?}"),
    }
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn structured_comparison_reduces_line_items_without_the_model() {
    let store = seeded_store();
    let report = seed_completed_report(&store);
    seed_carrier(&store);
    let model = Arc::new(ScriptedModel::default());

    let result = service(&store, &model)
        .compare_estimates(&caller(), &claim_id(), ComparisonMode::Structured)
        .await
        .expect("compared");

    assert_eq!(result.summary.total_industry, 17_340.0);
    assert_eq!(result.summary.total_carrier, 14_650.0);
    assert_eq!(result.summary.total_delta, 2_690.0);
    let items: Vec<_> = result.discrepancies.iter().map(|d| (d.item.as_str(), d.delta)).collect();
    assert_eq!(items, vec![("Drywall repair", 250.0), ("Paint walls", 1_000.0)]);
    assert!(model.requests().is_empty());

    let stored = store.latest_report(&claim_id()).expect("query").expect("report");
    assert_eq!(stored.id, report.id);
    assert_eq!(stored.comparison, Some(result));
    assert_eq!(stored.carrier_estimate_id.as_deref(), Some("carrier-1"));
}

#[tokio::test]
async fn model_comparison_takes_totals_from_stored_estimates() {
    let store = seeded_store();
    seed_completed_report(&store);
    seed_carrier(&store);
    let model = Arc::new(ScriptedModel::replying([json!({
        "discrepancies": [
            {"item": "Paint walls", "industry_price": 1_900.0, "carrier_price": 900.0, "delta": 5.0, "justification": "two coats"}
        ],
        "summary": {"total_industry": 1.0, "total_carrier": 2.0, "total_delta": -1.0}
    })
    .to_string()]));

    let result = service(&store, &model)
        .compare_estimates(&caller(), &claim_id(), ComparisonMode::Model)
        .await
        .expect("compared");

    assert_eq!(result.discrepancies[0].delta, 1_000.0);
    assert_eq!(result.summary.total_delta, 2_690.0);
    assert_eq!(store.usage_count(&claim_id()).expect("usage"), 1);
}

#[tokio::test]
async fn comparison_without_summary_is_malformed() {
    let store = seeded_store();
    seed_completed_report(&store);
    seed_carrier(&store);
    let model = Arc::new(ScriptedModel::replying([r#"{"discrepancies": []}"#.to_string()]));

    match service(&store, &model)
        .compare_estimates(&caller(), &claim_id(), ComparisonMode::Model)
        .await
    {
        Err(ResolutionError::MalformedResponse(ValidationError::MissingField("summary"))) => {}
        other => panic!("expected missing summary, got {other:?}"),
    }
    let stored = store.latest_report(&claim_id()).expect("query").expect("report");
    assert!(stored.comparison.is_none());
}

#[tokio::test]
async fn classification_overrides_the_model_status() {
    let store = seeded_store();
    seed_completed_report(&store);
    seed_carrier(&store);
    let model = Arc::new(ScriptedModel::replying([strategy_response("LEGAL_REVIEW")]));

    let analysis = service(&store, &model)
        .classify_strategy(&caller(), &claim_id())
        .await
        .expect("classified");

    assert_eq!(analysis.status, StrategyStatus::DisputeOffer);
    assert_eq!(analysis.model_status, StrategyStatus::LegalReview);
    assert_eq!(analysis.delta, 2_690.0);
    assert!(!analysis.legal_threshold_met);

    let stored = store.latest_report(&claim_id()).expect("query").expect("report");
    assert_eq!(stored.pm_brain, Some(analysis));
}

#[tokio::test]
async fn unknown_classification_is_rejected_and_not_retried() {
    let store = seeded_store();
    seed_completed_report(&store);
    seed_carrier(&store);
    let model = Arc::new(ScriptedModel::replying([strategy_response("ESCALATE")]));

    match service(&store, &model)
        .classify_strategy(&caller(), &claim_id())
        .await
    {
        Err(ResolutionError::MalformedResponse(ValidationError::InvalidClassification(status))) => {
            assert_eq!(status, "ESCALATE")
        }
        other => panic!("expected invalid classification, got {other:?}"),
    }
    assert_eq!(model.requests().len(), 1);
    let stored = store.latest_report(&claim_id()).expect("query").expect("report");
    assert!(stored.pm_brain.is_none());
}

#[tokio::test]
async fn classification_needs_a_generated_estimate() {
    let store = seeded_store();
    let report = AuditReport::pending(claim_id(), "scope-1".into(), UserId(OWNER.into()), start());
    store.insert_report(&report).expect("insert");
    let model = Arc::new(ScriptedModel::default());

    match service(&store, &model)
        .classify_strategy(&caller(), &claim_id())
        .await
    {
        Err(ResolutionError::PreconditionFailed(_)) => {}
        other => panic!("expected precondition failure, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_carrier_data_needs_docs() {
    let store = seeded_store();
    seed_completed_report(&store);
    let model = Arc::new(ScriptedModel::replying([strategy_response("DISPUTE_OFFER")]));

    let analysis = service(&store, &model)
        .classify_strategy(&caller(), &claim_id())
        .await
        .expect("classified");
    assert_eq!(analysis.status, StrategyStatus::NeedDocs);
}

#[tokio::test]
async fn viability_scores_come_from_the_rule_table() {
    let store = seeded_store();
    seed_completed_report(&store);
    let model = Arc::new(ScriptedModel::replying([json!({
        "recommendation": "DO_NOT_PURSUE",
        "net_estimated_recovery": 1.0,
        "economics_score": 5,
        "coverage_score": 5,
        "risks": ["Roof age may be disputed"],
        "next_steps": ["Order a roof inspection"],
        "summary": "Worth pursuing."
    })
    .to_string()]));

    let analysis = service(&store, &model)
        .score_viability(&caller(), &claim_id())
        .await
        .expect("scored");

    assert_eq!(analysis.net_estimated_recovery, 14_840.0);
    assert_eq!(analysis.economics_score, 60);
    assert_eq!(analysis.coverage_score, 100);
    assert_eq!(analysis.recommendation, Recommendation::Pursue);
    assert_eq!(analysis.model_recommendation, Some(Recommendation::DoNotPursue));
    assert!(analysis.risks.contains(&"Roof age may be disputed".to_string()));

    let requests = model.requests();
    assert!((requests[0].temperature - 0.1).abs() < f32::EPSILON);
    let stored = store.latest_report(&claim_id()).expect("query").expect("report");
    assert_eq!(stored.viability, Some(analysis));
}

#[tokio::test]
async fn dispute_letters_require_a_dispute_offer_classification() {
    let store = seeded_store();
    seed_completed_report(&store);
    let model = Arc::new(ScriptedModel::default());
    let service = service(&store, &model);

    match service.generate_dispute_letter(&caller(), &claim_id()).await {
        Err(ResolutionError::PreconditionFailed(message)) => assert!(message.contains("classified")),
        other => panic!("expected precondition failure, got {other:?}"),
    }

    // Carrier paid in full, so the rules close the claim.
    model.push(Ok(strategy_response("CLOSE")));
    store
        .seed_carrier_estimate(&CarrierEstimate {
            id: "carrier-full".into(),
            claim_id: claim_id(),
            parsed_data: Some(json!({"line_items": [{"description": "All work", "total": 17_340.0}]})),
            created_at: start(),
        })
        .expect("seed carrier");
    let analysis = service
        .classify_strategy(&caller(), &claim_id())
        .await
        .expect("classified");
    assert_eq!(analysis.status, StrategyStatus::Close);

    match service.generate_dispute_letter(&caller(), &claim_id()).await {
        Err(ResolutionError::PreconditionFailed(message)) => assert!(message.contains("CLOSE")),
        other => panic!("expected precondition failure, got {other:?}"),
    }
    assert_eq!(model.requests().len(), 1);

    let stored = store.latest_report(&claim_id()).expect("query").expect("report");
    assert!(stored.dispute_letter.is_none());
}

#[tokio::test]
async fn dispute_letter_is_drafted_and_cached() {
    let store = seeded_store();
    seed_completed_report(&store);
    seed_carrier(&store);
    let model = Arc::new(ScriptedModel::replying([
        strategy_response("DISPUTE_OFFER"),
        "```\nDear adjuster,\n\nPlease revisit the paint and drywall line items.\n```".to_string(),
    ]));
    let service = service(&store, &model);

    service
        .classify_strategy(&caller(), &claim_id())
        .await
        .expect("classified");
    let letter = service
        .generate_dispute_letter(&caller(), &claim_id())
        .await
        .expect("letter drafted");

    assert!(letter.starts_with("Dear adjuster"));
    assert!(!letter.contains("```"));
    let requests = model.requests();
    assert!((requests[1].temperature - 0.3).abs() < f32::EPSILON);
    let stored = store.latest_report(&claim_id()).expect("query").expect("report");
    assert_eq!(stored.dispute_letter, Some(letter));
    assert_eq!(store.usage_count(&claim_id()).expect("usage"), 2);
}

#[tokio::test]
async fn model_transport_errors_surface_as_model_failures() {
    let store = seeded_store();
    seed_completed_report(&store);
    let model = Arc::new(ScriptedModel::default());
    model.push(Err(LlmError::RateLimited("slow down".into())));

    match service(&store, &model)
        .score_viability(&caller(), &claim_id())
        .await
    {
        Err(ResolutionError::Model(LlmError::RateLimited(_))) => {}
        other => panic!("expected model failure, got {other:?}"),
    }
    assert_eq!(store.usage_count(&claim_id()).expect("usage"), 0);
}
