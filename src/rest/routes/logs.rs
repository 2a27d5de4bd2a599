// SPDX-License-Identifier: MIT
//! Log endpoints.

use axum::extract::{Path, Query};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::logstore::model::{LogLineInput, LogRow, StreamSummary};
use crate::rest::extract::ProjectCtx;

#[derive(Debug, Deserialize)]
pub struct AddLogsRequest {
    pub stream: String,
    pub source: Option<String>,
    pub lines: Vec<LogLineInput>,
}

pub async fn add(ctx: ProjectCtx, Json(req): Json<AddLogsRequest>) -> Result<Json<Value>, ApiError> {
    let count = ctx
        .services
        .logs
        .add_logs(&req.stream, req.source.as_deref(), &req.lines)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(json!({ "added": count })))
}

pub async fn streams(ctx: ProjectCtx) -> Result<Json<Vec<StreamSummary>>, ApiError> {
    Ok(Json(ctx.services.logs.get_streams().await.map_err(ApiError::Internal)?))
}

#[derive(Debug, Deserialize)]
pub struct GetLogsQuery {
    pub since: Option<String>,
    pub level: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get(ctx: ProjectCtx, Path(stream): Path<String>, Query(q): Query<GetLogsQuery>) -> Result<Json<Vec<LogRow>>, ApiError> {
    let since = match &q.since {
        Some(raw) => Some(
            crate::identity::parse_relative_time(raw, Utc::now())
                .map_err(|e| ApiError::ValidationError(e.to_string()))?
                .to_rfc3339(),
        ),
        None => None,
    };
    let rows = ctx
        .services
        .logs
        .get_logs(&stream, since.as_deref(), q.level.as_deref(), q.search.as_deref(), q.limit.unwrap_or(1000))
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(rows))
}
