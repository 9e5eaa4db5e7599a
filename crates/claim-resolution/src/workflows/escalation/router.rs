use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApprovalRequestId, ApprovalToken, IssueApprovalInput};
use super::repository::EscalationRepository;
use super::service::LegalEscalationService;
use crate::error::ResolutionError;
use crate::workflows::analysis::domain::ClaimId;
use crate::workflows::identity::Caller;

#[derive(Debug, Deserialize)]
pub(crate) struct RespondBody {
    action: String,
}

/// Owner-facing escalation endpoints plus the public homeowner token endpoints.
pub fn escalation_router<R>(service: Arc<LegalEscalationService<R>>) -> Router
where
    R: EscalationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/claims/:claim_id/legal-approvals",
            post(issue_handler::<R>).get(history_handler::<R>),
        )
        .route(
            "/api/v1/claims/:claim_id/legal-approvals/:request_id/resend",
            post(resend_handler::<R>),
        )
        .route(
            "/api/v1/legal-approval/:token",
            get(resolve_handler::<R>).post(respond_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn issue_handler<R>(
    State(service): State<Arc<LegalEscalationService<R>>>,
    caller: Caller,
    Path(claim_id): Path<String>,
    body: Result<Json<IssueApprovalInput>, JsonRejection>,
) -> Response
where
    R: EscalationRepository + 'static,
{
    let Json(input) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed_body(rejection),
    };
    match service.issue(&caller, &ClaimId(claim_id), input) {
        Ok(issued) => (StatusCode::CREATED, Json(issued.request)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn history_handler<R>(
    State(service): State<Arc<LegalEscalationService<R>>>,
    caller: Caller,
    Path(claim_id): Path<String>,
) -> Response
where
    R: EscalationRepository + 'static,
{
    match service.history(&caller, &ClaimId(claim_id)) {
        Ok(requests) => (StatusCode::OK, Json(json!({ "requests": requests }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn resend_handler<R>(
    State(service): State<Arc<LegalEscalationService<R>>>,
    caller: Caller,
    Path((claim_id, request_id)): Path<(String, String)>,
) -> Response
where
    R: EscalationRepository + 'static,
{
    let result = service
        .resend_package(&caller, &ClaimId(claim_id), &ApprovalRequestId(request_id))
        .await;
    match result {
        Ok(receipt) => (StatusCode::OK, Json(json!({ "package": receipt }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn resolve_handler<R>(
    State(service): State<Arc<LegalEscalationService<R>>>,
    Path(token): Path<String>,
) -> Response
where
    R: EscalationRepository + 'static,
{
    match service.resolve(&ApprovalToken(token)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn respond_handler<R>(
    State(service): State<Arc<LegalEscalationService<R>>>,
    Path(token): Path<String>,
    body: Result<Json<RespondBody>, JsonRejection>,
) -> Response
where
    R: EscalationRepository + 'static,
{
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed_body(rejection),
    };
    match service.respond(&ApprovalToken(token), &body.action).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Missing, mistyped, or unparseable bodies are caller errors, reported like any other.
fn malformed_body(rejection: JsonRejection) -> Response {
    ResolutionError::InvalidArgument(format!("malformed request body: {}", rejection.body_text()))
        .into_response()
}
