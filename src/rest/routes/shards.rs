// SPDX-License-Identifier: MIT
//! Shard subsystem endpoints.

use axum::extract::{Path, Query};
use axum::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::rest::extract::ProjectCtx;
use crate::shard::model::{DiffStat, DriftInfo, GraftOutcome, MergeOutcome, ReviewQueue, ShardInfo, ShardRecord};

#[derive(Debug, Deserialize)]
pub struct SpawnRequest {
    pub name: String,
    pub spawning_name: Option<String>,
    pub brief_id: Option<String>,
    pub description: Option<String>,
}

pub async fn spawn(ctx: ProjectCtx, Json(req): Json<SpawnRequest>) -> Result<Json<ShardInfo>, ApiError> {
    Ok(Json(
        ctx.services
            .shards
            .spawn(&req.name, req.spawning_name.as_deref(), req.brief_id.as_deref(), req.description.as_deref())
            .await?,
    ))
}

pub async fn list(ctx: ProjectCtx) -> Result<Json<Vec<ShardInfo>>, ApiError> {
    Ok(Json(ctx.services.shards.list_shards().await?))
}

pub async fn review_queue(ctx: ProjectCtx) -> Result<Json<ReviewQueue>, ApiError> {
    Ok(Json(ctx.services.shards.review_queue().await?))
}

pub async fn status(ctx: ProjectCtx, Path(name): Path<String>) -> Result<Json<ShardRecord>, ApiError> {
    Ok(Json(ctx.services.shards.get_shard_status(&name).await?))
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    #[serde(default)]
    pub keep_branch: bool,
}

pub async fn cleanup(ctx: ProjectCtx, Path(name): Path<String>, Query(q): Query<CleanupQuery>) -> Result<Json<serde_json::Value>, ApiError> {
    ctx.services.shards.cleanup(&name, q.keep_branch, None).await?;
    Ok(Json(serde_json::json!({ "cleaned_up": name })))
}

#[derive(Debug, Deserialize)]
pub struct DiffQuery {
    #[serde(default)]
    pub integration: bool,
}

pub async fn diff(ctx: ProjectCtx, Path(name): Path<String>, Query(q): Query<DiffQuery>) -> Result<Json<DiffStat>, ApiError> {
    Ok(Json(ctx.services.shards.get_shard_diff(&name, q.integration).await?))
}

pub async fn drift(ctx: ProjectCtx, Path(name): Path<String>) -> Result<Json<DriftInfo>, ApiError> {
    Ok(Json(ctx.services.shards.get_shard_drift_info(&name).await?))
}

pub async fn merge(ctx: ProjectCtx, Path(name): Path<String>) -> Result<Json<MergeOutcome>, ApiError> {
    let caller_cwd = std::env::current_dir().map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Json(ctx.services.shards.merge(&name, &caller_cwd).await?))
}

pub async fn graft(ctx: ProjectCtx, Path(name): Path<String>) -> Result<Json<GraftOutcome>, ApiError> {
    Ok(Json(ctx.services.shards.graft(&name).await?))
}
