// SPDX-License-Identifier: MIT
//! `X-Project-Id` / `X-Agent-Id` header extraction.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use std::sync::Arc;

use crate::error::ApiError;
use crate::{AppContext, ProjectServices};

const PROJECT_HEADER: &str = "x-project-id";
const AGENT_HEADER: &str = "x-agent-id";

/// The resolved service bundle for the project named in `X-Project-Id`, plus
/// the optional caller agent id from `X-Agent-Id`.
pub struct ProjectCtx {
    pub project_id: String,
    pub agent_id: Option<String>,
    pub services: Arc<ProjectServices>,
    pub app: Arc<AppContext>,
}

impl<S> FromRequestParts<S> for ProjectCtx
where
    Arc<AppContext>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = Arc::<AppContext>::from_ref(state);

        let project_id = parts
            .headers
            .get(PROJECT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::ValidationError(
                    "missing required header 'X-Project-Id'. Set it to the identifier you registered \
                     the project under (see the project registry's `register` operation) before calling \
                     this endpoint."
                        .to_string(),
                )
            })?;

        let agent_id = parts
            .headers
            .get(AGENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let services = ctx.project(&project_id).await?;
        Ok(ProjectCtx { project_id, agent_id, services, app: ctx })
    }
}
