// SPDX-License-Identifier: MIT
//! Recent-activity endpoint.

use axum::extract::Query;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::artifact::ArtifactService;
use crate::error::ApiError;
use crate::rest::extract::ProjectCtx;
use crate::store::model::Folio;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub since: Option<String>,
}

pub async fn activity(ctx: ProjectCtx, Query(q): Query<ActivityQuery>) -> Result<Json<Vec<Folio>>, ApiError> {
    let since = match &q.since {
        Some(raw) => Some(crate::identity::parse_relative_time(raw, Utc::now()).map_err(|e| ApiError::ValidationError(e.to_string()))?),
        None => None,
    };
    let service = ArtifactService::new(&ctx.services.store, &ctx.services.derived);
    Ok(Json(service.recent_activity(since)?))
}
