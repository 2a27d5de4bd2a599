// SPDX-License-Identifier: MIT
//! Thread endpoints: create/list, inbox, mark-read.

use axum::extract::{Path, Query};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::artifact::ArtifactService;
use crate::error::ApiError;
use crate::rest::extract::ProjectCtx;
use crate::store::model::{Thread, ThreadCreate, ThreadFilter};

pub async fn create(ctx: ProjectCtx, Json(create): Json<ThreadCreate>) -> Result<Json<Thread>, ApiError> {
    let service = ArtifactService::new(&ctx.services.store, &ctx.services.derived);
    Ok(Json(service.create_thread(create, ctx.agent_id.as_deref(), Utc::now())?))
}

#[derive(Debug, Deserialize)]
pub struct ThreadListQuery {
    pub from_id: Option<String>,
    pub to_id: Option<String>,
    #[serde(rename = "type")]
    pub thread_type: Option<String>,
    pub weaver: Option<String>,
    pub search: Option<String>,
    pub since: Option<String>,
}

pub async fn list(ctx: ProjectCtx, Query(q): Query<ThreadListQuery>) -> Result<Json<Vec<Thread>>, ApiError> {
    let weaver = match q.weaver.as_deref() {
        Some("me") => ctx.agent_id.clone(),
        other => other.map(str::to_string),
    };
    let filter = ThreadFilter {
        from_id: q.from_id,
        to_id: q.to_id,
        thread_type: q.thread_type,
        weaver,
    };
    let mut threads = ctx.services.store.get_threads(&filter).map_err(ApiError::Internal)?;
    if let Some(since) = &q.since {
        let bound = crate::identity::parse_relative_time(since, Utc::now()).map_err(|e| ApiError::ValidationError(e.to_string()))?;
        threads.retain(|t| t.created_at >= bound);
    }
    if let Some(search) = &q.search {
        let needle = search.to_lowercase();
        threads.retain(|t| t.content.as_deref().map(|c| c.to_lowercase().contains(&needle)).unwrap_or(false));
    }
    Ok(Json(threads))
}

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread: bool,
}

pub async fn inbox(ctx: ProjectCtx, Query(q): Query<InboxQuery>) -> Result<Json<Vec<Thread>>, ApiError> {
    let agent_id = ctx.agent_id.clone().ok_or_else(|| {
        ApiError::ValidationError("inbox requires the 'X-Agent-Id' header to identify the recipient".to_string())
    })?;
    let service = ArtifactService::new(&ctx.services.store, &ctx.services.derived);
    Ok(Json(service.inbox(&agent_id, q.unread)?))
}

pub async fn mark_read(ctx: ProjectCtx, Path(id): Path<String>) -> Result<Json<Thread>, ApiError> {
    let service = ArtifactService::new(&ctx.services.store, &ctx.services.derived);
    Ok(Json(service.mark_thread_read(&id, Utc::now())?))
}
