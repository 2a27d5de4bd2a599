// SPDX-License-Identifier: MIT
//! Screenshot endpoints.

use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::logstore::model::{ScreenshotInput, ScreenshotRow};
use crate::rest::extract::ProjectCtx;

#[derive(Debug, Deserialize)]
pub struct AddScreenshotRequest {
    pub strand_id: String,
    pub turn_number: Option<i64>,
    pub label: Option<String>,
    pub file_path: String,
    pub file_size: Option<i64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

pub async fn add(ctx: ProjectCtx, Json(req): Json<AddScreenshotRequest>) -> Result<Json<serde_json::Value>, ApiError> {
    let screenshot_id = format!("screenshot-{}", Uuid::new_v4());
    let input = ScreenshotInput {
        strand_id: req.strand_id,
        turn_number: req.turn_number,
        label: req.label,
        file_path: req.file_path,
        file_size: req.file_size,
        metadata: req.metadata,
    };
    ctx.services.logs.add_screenshot(&screenshot_id, &input).await.map_err(ApiError::Internal)?;
    Ok(Json(serde_json::json!({ "screenshot_id": screenshot_id })))
}

#[derive(Debug, Deserialize)]
pub struct ListScreenshotsQuery {
    pub strand_id: Option<String>,
    pub since: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list(ctx: ProjectCtx, Query(q): Query<ListScreenshotsQuery>) -> Result<Json<Vec<ScreenshotRow>>, ApiError> {
    let rows = ctx
        .services
        .logs
        .get_screenshots(q.strand_id.as_deref(), q.since.as_deref(), q.limit.unwrap_or(100))
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(rows))
}

async fn find(ctx: &ProjectCtx, id: &str) -> Result<ScreenshotRow, ApiError> {
    ctx.services
        .logs
        .get_screenshot(id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::ScreenshotNotFound(id.to_string()))
}

pub async fn get(ctx: ProjectCtx, Path(id): Path<String>) -> Result<Response, ApiError> {
    let row = find(&ctx, &id).await?;
    let bytes = tokio::fs::read(&row.file_path).await.map_err(|e| ApiError::Internal(e.into()))?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

pub async fn metadata(ctx: ProjectCtx, Path(id): Path<String>) -> Result<Json<ScreenshotRow>, ApiError> {
    Ok(Json(find(&ctx, &id).await?))
}
