// SPDX-License-Identifier: MIT
//! Site endpoints.

use axum::extract::{Path, Query};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::artifact::ArtifactService;
use crate::error::ApiError;
use crate::rest::extract::ProjectCtx;
use crate::store::model::{Folio, FolioCreate, Site, SiteCreate};

#[derive(Debug, Deserialize)]
pub struct SiteListQuery {
    pub status: Option<String>,
    pub tag: Option<String>,
}

pub async fn create(ctx: ProjectCtx, Json(create): Json<SiteCreate>) -> Result<Json<Site>, ApiError> {
    let created_by = ctx.agent_id.clone().unwrap_or_else(|| "system".to_string());
    let service = ArtifactService::new(&ctx.services.store, &ctx.services.derived);
    Ok(Json(service.create_site(create, &created_by, Utc::now())?))
}

pub async fn list(ctx: ProjectCtx, Query(q): Query<SiteListQuery>) -> Result<Json<Vec<Site>>, ApiError> {
    let mut sites = ctx.services.store.get_sites().map_err(ApiError::Internal)?;
    if let Some(status) = &q.status {
        sites.retain(|s| &s.status == status);
    }
    if let Some(tag) = &q.tag {
        sites.retain(|s| {
            s.metadata
                .get("tags")
                .and_then(|v| v.as_array())
                .map(|tags| tags.iter().any(|t| t.as_str() == Some(tag.as_str())))
                .unwrap_or(false)
        });
    }
    Ok(Json(sites))
}

pub async fn get(ctx: ProjectCtx, Path(id): Path<String>) -> Result<Json<Site>, ApiError> {
    Ok(Json(ctx.services.store.get_site(&id)?))
}

#[derive(Debug, Deserialize)]
pub struct SiteFoliosQuery {
    #[serde(rename = "type")]
    pub folio_type: Option<String>,
    pub since: Option<String>,
}

pub async fn folios(ctx: ProjectCtx, Path(id): Path<String>, Query(q): Query<SiteFoliosQuery>) -> Result<Json<Vec<Folio>>, ApiError> {
    let service = ArtifactService::new(&ctx.services.store, &ctx.services.derived);
    let mut folios = service.list_folios(Some(&id))?;
    if let Some(folio_type) = &q.folio_type {
        folios.retain(|f| &f.folio_type == folio_type);
    }
    if let Some(since) = &q.since {
        let bound = crate::identity::parse_relative_time(since, Utc::now())
            .or_else(|_| crate::identity::normalize_datetime(since))
            .map_err(|e| ApiError::ValidationError(e.to_string()))?;
        folios.retain(|f| f.created_at >= bound);
    }
    Ok(Json(folios))
}

pub async fn create_folio(ctx: ProjectCtx, Path(id): Path<String>, Json(mut create): Json<FolioCreate>) -> Result<Json<Folio>, ApiError> {
    create.site_id = id;
    let created_by = ctx.agent_id.clone().unwrap_or_else(|| "system".to_string());
    let service = ArtifactService::new(&ctx.services.store, &ctx.services.derived);
    Ok(Json(service.create_folio(create, &created_by, Utc::now())?))
}
