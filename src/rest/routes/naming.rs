// SPDX-License-Identifier: MIT
//! Naming-generator endpoint.

use std::collections::HashSet;
use std::time::Duration;

use axum::extract::Query;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::config;
use crate::error::ApiError;
use crate::identity;
use crate::rest::extract::ProjectCtx;

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub brief_content: String,
    #[serde(default)]
    pub project: String,
}

pub async fn generate(ctx: ProjectCtx, Query(q): Query<GenerateQuery>) -> Result<Json<serde_json::Value>, ApiError> {
    let existing_names: HashSet<String> = ctx
        .services
        .store
        .get_agents(None)
        .map_err(ApiError::Internal)?
        .into_iter()
        .filter_map(|a| a.name)
        .collect();

    let generator_path = config::resolve_naming_generator();
    let timeout = Duration::from_secs(ctx.app.config.name_generator_timeout_secs);

    let name = identity::generate_agent_name(
        &q.project,
        &q.role,
        &q.brief_content,
        &existing_names,
        generator_path.as_deref(),
        timeout,
        Utc::now(),
    );

    Ok(Json(json!({ "name": name })))
}
