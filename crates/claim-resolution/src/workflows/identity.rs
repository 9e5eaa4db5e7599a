use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::analysis::domain::{OrganizationId, UserId};

pub const ORGANIZATION_HEADER: &str = "x-organization-id";
pub const USER_HEADER: &str = "x-user-id";

/// Authenticated caller as resolved by the upstream session layer.
///
/// The engine trusts these headers completely; ownership is enforced by joining
/// claim → property → organization against `organization_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
}

impl Caller {
    pub fn new(organization_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            organization_id: OrganizationId(organization_id.into()),
            user_id: UserId(user_id.into()),
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        match (header(ORGANIZATION_HEADER), header(USER_HEADER)) {
            (Some(organization_id), Some(user_id)) => Ok(Caller::new(organization_id, user_id)),
            _ => Err((
                StatusCode::UNAUTHORIZED,
                axum::Json(json!({ "error": "missing caller identity" })),
            )
                .into_response()),
        }
    }
}
