// SPDX-License-Identifier: MIT
//! Yield endpoints.

use axum::extract::Path;
use axum::Json;

use crate::error::ApiError;
use crate::logstore::model::{YieldInput, YieldRow};
use crate::rest::extract::ProjectCtx;

pub async fn add(ctx: ProjectCtx, Json(input): Json<YieldInput>) -> Result<Json<YieldRow>, ApiError> {
    Ok(Json(ctx.services.logs.add_yield(&input).await.map_err(ApiError::Internal)?))
}

pub async fn chain(ctx: ProjectCtx, Path(chain_id): Path<String>) -> Result<Json<Vec<YieldRow>>, ApiError> {
    Ok(Json(ctx.services.logs.get_chain_yields(&chain_id).await.map_err(ApiError::Internal)?))
}

pub async fn get(ctx: ProjectCtx, Path(sack_id): Path<String>) -> Result<Json<YieldRow>, ApiError> {
    ctx.services
        .logs
        .get_yield(&sack_id)
        .await
        .map_err(ApiError::Internal)?
        .map(Json)
        .ok_or_else(|| ApiError::YieldNotFound(sack_id))
}

pub async fn by_status(ctx: ProjectCtx, Path(status): Path<String>) -> Result<Json<Vec<YieldRow>>, ApiError> {
    Ok(Json(ctx.services.logs.get_yields_by_status(&status).await.map_err(ApiError::Internal)?))
}

pub async fn by_agent(ctx: ProjectCtx, Path(agent_id): Path<String>) -> Result<Json<Vec<YieldRow>>, ApiError> {
    Ok(Json(ctx.services.logs.get_agent_yields(&agent_id).await.map_err(ApiError::Internal)?))
}
