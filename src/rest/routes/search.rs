// SPDX-License-Identifier: MIT
//! Unified search endpoint.

use axum::extract::Query;
use axum::Json;
use chrono::Utc;

use crate::artifact::search::{run_search, SearchRequest, SearchResponse};
use crate::error::ApiError;
use crate::rest::extract::ProjectCtx;

pub async fn search(ctx: ProjectCtx, Query(mut req): Query<SearchRequest>) -> Result<Json<SearchResponse>, ApiError> {
    req.caller_agent_id = ctx.agent_id.clone();
    Ok(Json(run_search(&ctx.services.store, &ctx.services.derived, &req, Utc::now())?))
}
