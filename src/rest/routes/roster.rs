// SPDX-License-Identifier: MIT
//! Roster endpoints: register/list/get/patch agents, including the
//! retirement-time yield handoff.

use axum::extract::{Path, Query};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::logstore::model::YieldInput;
use crate::rest::extract::ProjectCtx;
use crate::store::model::{Agent, AgentPatch, AgentRegistration};

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatchAgentRequest {
    #[serde(flatten)]
    pub patch: AgentPatch,
    /// Chain identifier for the handoff this agent is retiring from. When
    /// present and the patch transitions status to `retired`, a yield record
    /// is created for the chain; yields are never rewritten once created.
    pub chain_id: Option<String>,
}

pub async fn register(ctx: ProjectCtx, Json(registration): Json<AgentRegistration>) -> Result<Json<Agent>, ApiError> {
    let agent = ctx.services.store.save_agent(registration, Utc::now()).map_err(ApiError::Internal)?;
    Ok(Json(agent))
}

pub async fn list(ctx: ProjectCtx, Query(q): Query<StatusQuery>) -> Result<Json<Vec<Agent>>, ApiError> {
    let agents = ctx.services.store.get_agents(q.status.as_deref()).map_err(ApiError::Internal)?;
    Ok(Json(agents))
}

pub async fn get(ctx: ProjectCtx, Path(id): Path<String>) -> Result<Json<Agent>, ApiError> {
    Ok(Json(ctx.services.store.get_agent(&id)?))
}

pub async fn patch(ctx: ProjectCtx, Path(id): Path<String>, Json(req): Json<PatchAgentRequest>) -> Result<Json<Agent>, ApiError> {
    let retiring = req.patch.status.as_deref() == Some("retired");
    let agent = ctx.services.store.patch_agent(&id, req.patch)?;

    if retiring {
        if let Some(chain_id) = req.chain_id {
            let input = YieldInput {
                sack_id: format!("yield-{}", Uuid::new_v4()),
                chain_id,
                task_id: id.clone(),
                agent_id: Some(id),
                status: "completed".to_string(),
                outcome: None,
                artifact_ids: Vec::new(),
                notes: None,
                duration_seconds: None,
                tokens_used: None,
                shard_path: None,
                tender_id: None,
                metadata: Default::default(),
            };
            ctx.services.logs.add_yield(&input).await.map_err(ApiError::Internal)?;
        }
    }

    Ok(Json(agent))
}
