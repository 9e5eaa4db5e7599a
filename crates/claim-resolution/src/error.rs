use crate::config::ConfigError;
use crate::llm::{LlmError, ValidationError};
use crate::store::StoreError;
use crate::telemetry::TelemetryError;
use crate::workflows::escalation::artifact::ArtifactError;
use crate::workflows::escalation::notify::EmailError;
use crate::workflows::escalation::storage::StorageError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Process-level failures surfaced by the binary.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Store(StoreError),
    Model(LlmError),
    Storage(StorageError),
    Email(EmailError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Model(err) => write!(f, "language model error: {}", err),
            AppError::Storage(err) => write!(f, "object storage error: {}", err),
            AppError::Email(err) => write!(f, "email error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Model(err) => Some(err),
            AppError::Storage(err) => Some(err),
            AppError::Email(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<LlmError> for AppError {
    fn from(value: LlmError) -> Self {
        Self::Model(value)
    }
}

impl From<StorageError> for AppError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<EmailError> for AppError {
    fn from(value: EmailError) -> Self {
        Self::Email(value)
    }
}

/// Error taxonomy shared by the analysis and escalation workflows.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("malformed model response: {0}")]
    MalformedResponse(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Model(#[from] LlmError),
    #[error("legal package assembly failed: {0}")]
    Artifact(#[from] ArtifactError),
    /// The approval is durable; only the legal-partner send failed and may be retried.
    #[error("request approved but legal package delivery failed: {0}")]
    Delivery(EmailError),
}

impl ResolutionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResolutionError::NotFound(_) => StatusCode::NOT_FOUND,
            ResolutionError::PreconditionFailed(_) => StatusCode::CONFLICT,
            ResolutionError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ResolutionError::MalformedResponse(_)
            | ResolutionError::Model(_)
            | ResolutionError::Artifact(_)
            | ResolutionError::Delivery(_) => StatusCode::BAD_GATEWAY,
            ResolutionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ResolutionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ResolutionError::Delivery(_) => json!({
                "error": self.to_string(),
                "approved": true,
                "retryable": true,
            }),
            ResolutionError::MalformedResponse(_) | ResolutionError::Model(_) => json!({
                "error": self.to_string(),
                "retryable": true,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
