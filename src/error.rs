// SPDX-License-Identifier: MIT
//! API-facing error taxonomy.
//!
//! Every handler returns `Result<T, ApiError>`. `ApiError` knows how to
//! render itself as the `{detail, error, path, request_id}` envelope callers
//! depend on; the request id and path are filled in by the error-rendering
//! middleware, not by the handler that raised the error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("site not found: {site_id}")]
    SiteNotFound {
        site_id: String,
        /// Up to 50 active sites, offered as a recovery hint.
        known_sites: Vec<String>,
    },

    #[error("folio not found: {0}")]
    FolioNotFound(String),

    #[error("thread not found: {0}")]
    ThreadNotFound(String),

    #[error("shard not found: {0}")]
    ShardNotFound(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("yield not found: {0}")]
    YieldNotFound(String),

    #[error("screenshot not found: {0}")]
    ScreenshotNotFound(String),

    #[error("{reason}")]
    TitleInvalid { reason: String, example: String },

    #[error("{0}")]
    ValidationError(String),

    #[error("{message}")]
    Precondition {
        message: String,
        conflicts: Vec<String>,
    },

    #[error("tool capability unavailable: {0}")]
    ToolCapability(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::ProjectNotFound(_)
            | ApiError::SiteNotFound { .. }
            | ApiError::FolioNotFound(_)
            | ApiError::ThreadNotFound(_)
            | ApiError::ShardNotFound(_)
            | ApiError::AgentNotFound(_)
            | ApiError::YieldNotFound(_)
            | ApiError::ScreenshotNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TitleInvalid { .. } | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Precondition { .. } => StatusCode::CONFLICT,
            ApiError::ToolCapability(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::ProjectNotFound(_) => "project_not_found",
            ApiError::SiteNotFound { .. } => "site_not_found",
            ApiError::FolioNotFound(_) => "folio_not_found",
            ApiError::ThreadNotFound(_) => "thread_not_found",
            ApiError::ShardNotFound(_) => "shard_not_found",
            ApiError::AgentNotFound(_) => "agent_not_found",
            ApiError::YieldNotFound(_) => "yield_not_found",
            ApiError::ScreenshotNotFound(_) => "screenshot_not_found",
            ApiError::TitleInvalid { .. } => "title_invalid",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::Precondition { .. } => "precondition_failed",
            ApiError::ToolCapability(_) => "tool_capability",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// Render the body, without the `path`/`request_id` fields the
    /// surrounding middleware is responsible for attaching.
    fn detail_body(&self) -> serde_json::Value {
        match self {
            ApiError::SiteNotFound { site_id, known_sites } => json!({
                "detail": format!(
                    "site '{}' does not exist. Known sites: {}",
                    site_id,
                    if known_sites.is_empty() { "(none yet)".to_string() } else { known_sites.join(", ") }
                ),
                "error": self.error_type(),
            }),
            ApiError::TitleInvalid { reason, example } => json!({
                "detail": format!("{reason}\n\nExample: {example}"),
                "error": self.error_type(),
            }),
            ApiError::Precondition { message, conflicts } => json!({
                "detail": message,
                "error": self.error_type(),
                "conflicts": conflicts,
            }),
            ApiError::Internal(e) => {
                tracing::error!(err = %e, "unhandled internal error");
                json!({
                    "detail": "an internal error occurred",
                    "error": self.error_type(),
                })
            }
            other => json!({
                "detail": other.to_string(),
                "error": self.error_type(),
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.detail_body();
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
