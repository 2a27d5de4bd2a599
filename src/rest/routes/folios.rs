// SPDX-License-Identifier: MIT
//! Folio endpoints.

use axum::extract::{Path, Query};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::artifact::search::{run_search, SearchRequest};
use crate::artifact::ArtifactService;
use crate::error::ApiError;
use crate::rest::extract::ProjectCtx;
use crate::store::model::{Folio, FolioCreate, FolioPatch};

pub async fn create(ctx: ProjectCtx, Json(create): Json<FolioCreate>) -> Result<Json<Folio>, ApiError> {
    let created_by = ctx.agent_id.clone().unwrap_or_else(|| "system".to_string());
    let service = ArtifactService::new(&ctx.services.store, &ctx.services.derived);
    Ok(Json(service.create_folio(create, &created_by, Utc::now())?))
}

#[derive(Debug, Deserialize)]
pub struct FolioListQuery {
    #[serde(rename = "type")]
    pub folio_type: Option<String>,
    pub site_id: Option<String>,
    pub assigned_to: Option<String>,
    pub status: Option<String>,
    pub archived: Option<bool>,
}

pub async fn list(ctx: ProjectCtx, Query(q): Query<FolioListQuery>) -> Result<Json<Vec<Folio>>, ApiError> {
    let service = ArtifactService::new(&ctx.services.store, &ctx.services.derived);
    let mut folios = service.list_folios(q.site_id.as_deref())?;
    if let Some(folio_type) = &q.folio_type {
        folios.retain(|f| &f.folio_type == folio_type);
    }
    if let Some(assigned_to) = &q.assigned_to {
        folios.retain(|f| f.assigned_to.as_deref() == Some(assigned_to.as_str()));
    }
    if let Some(status) = &q.status {
        folios.retain(|f| &f.status == status);
    }
    let archived = q.archived.unwrap_or(false);
    folios.retain(|f| f.archived == archived);
    Ok(Json(folios))
}

#[derive(Debug, Deserialize)]
pub struct LegacySearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub folio_type: Option<String>,
    pub status: Option<String>,
}

/// `GET /folios/search` predates the unified `/search` endpoint; it is kept
/// as a thin folios-only view over the same search logic.
pub async fn search_legacy(ctx: ProjectCtx, Query(q): Query<LegacySearchQuery>) -> Result<Json<serde_json::Value>, ApiError> {
    let request = SearchRequest {
        q: q.q.unwrap_or_default(),
        resources: Some(vec!["folios".to_string()]),
        folio_type: q.folio_type,
        status: q.status,
        caller_agent_id: ctx.agent_id.clone(),
        ..Default::default()
    };
    let response = run_search(&ctx.services.store, &ctx.services.derived, &request, Utc::now())?;
    Ok(Json(serde_json::json!({
        "total": response.folios.as_ref().map(|r| r.total).unwrap_or(0),
        "items": response.folios.map(|r| r.items).unwrap_or_default(),
    })))
}

pub async fn get(ctx: ProjectCtx, Path(id): Path<String>) -> Result<Json<Folio>, ApiError> {
    let service = ArtifactService::new(&ctx.services.store, &ctx.services.derived);
    Ok(Json(service.get_folio(&id)?))
}

pub async fn patch(ctx: ProjectCtx, Path(id): Path<String>, Json(patch): Json<FolioPatch>) -> Result<Json<Folio>, ApiError> {
    let service = ArtifactService::new(&ctx.services.store, &ctx.services.derived);
    Ok(Json(service.patch_folio(&id, patch, ctx.agent_id.as_deref(), Utc::now())?))
}
