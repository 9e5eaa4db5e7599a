use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::comparison::ComparisonMode;
use super::domain::ClaimId;
use super::repository::AnalysisRepository;
use super::service::ClaimAnalysisService;
use crate::workflows::identity::Caller;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EstimateBody {
    #[serde(default)]
    scope_sheet_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ComparisonBody {
    #[serde(default)]
    mode: ComparisonMode,
}

/// Router builder for the per-claim analysis endpoints.
pub fn analysis_router<R>(service: Arc<ClaimAnalysisService<R>>) -> Router
where
    R: AnalysisRepository + 'static,
{
    Router::new()
        .route("/api/v1/claims/:claim_id/estimates", post(estimate_handler::<R>))
        .route("/api/v1/claims/:claim_id/comparison", post(comparison_handler::<R>))
        .route("/api/v1/claims/:claim_id/strategy", post(strategy_handler::<R>))
        .route("/api/v1/claims/:claim_id/viability", post(viability_handler::<R>))
        .route(
            "/api/v1/claims/:claim_id/dispute-letter",
            post(dispute_letter_handler::<R>),
        )
        .route("/api/v1/claims/:claim_id/audit-report", get(report_handler::<R>))
        .with_state(service)
}

pub(crate) async fn estimate_handler<R>(
    State(service): State<Arc<ClaimAnalysisService<R>>>,
    caller: Caller,
    Path(claim_id): Path<String>,
    body: Option<Json<EstimateBody>>,
) -> Response
where
    R: AnalysisRepository + 'static,
{
    let Json(body) = body.unwrap_or_default();
    let result = service
        .generate_estimate(&caller, &ClaimId(claim_id), body.scope_sheet_id.as_deref())
        .await;
    match result {
        Ok(report) => (StatusCode::CREATED, Json(report)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn comparison_handler<R>(
    State(service): State<Arc<ClaimAnalysisService<R>>>,
    caller: Caller,
    Path(claim_id): Path<String>,
    body: Option<Json<ComparisonBody>>,
) -> Response
where
    R: AnalysisRepository + 'static,
{
    let Json(body) = body.unwrap_or_default();
    match service
        .compare_estimates(&caller, &ClaimId(claim_id), body.mode)
        .await
    {
        Ok(comparison) => (StatusCode::OK, Json(comparison)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn strategy_handler<R>(
    State(service): State<Arc<ClaimAnalysisService<R>>>,
    caller: Caller,
    Path(claim_id): Path<String>,
) -> Response
where
    R: AnalysisRepository + 'static,
{
    match service.classify_strategy(&caller, &ClaimId(claim_id)).await {
        Ok(analysis) => (StatusCode::OK, Json(analysis)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn viability_handler<R>(
    State(service): State<Arc<ClaimAnalysisService<R>>>,
    caller: Caller,
    Path(claim_id): Path<String>,
) -> Response
where
    R: AnalysisRepository + 'static,
{
    match service.score_viability(&caller, &ClaimId(claim_id)).await {
        Ok(analysis) => (StatusCode::OK, Json(analysis)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn dispute_letter_handler<R>(
    State(service): State<Arc<ClaimAnalysisService<R>>>,
    caller: Caller,
    Path(claim_id): Path<String>,
) -> Response
where
    R: AnalysisRepository + 'static,
{
    match service.generate_dispute_letter(&caller, &ClaimId(claim_id)).await {
        Ok(letter) => (StatusCode::OK, Json(json!({ "dispute_letter": letter }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn report_handler<R>(
    State(service): State<Arc<ClaimAnalysisService<R>>>,
    caller: Caller,
    Path(claim_id): Path<String>,
) -> Response
where
    R: AnalysisRepository + 'static,
{
    match service.latest_report(&caller, &ClaimId(claim_id)) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => err.into_response(),
    }
}
