// SPDX-License-Identifier: MIT
//! Unified search across folios, threads, agents, and sites.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::derived::DerivedStateEngine;
use crate::error::ApiError;
use crate::store::model::{Agent, Folio, Site, Thread};
use crate::store::ObjectStore;

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Created,
    CreatedAsc,
    Relevance,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub q: String,
    pub resources: Option<Vec<String>>,
    pub status: Option<String>,
    pub since: Option<String>,
    pub before: Option<String>,

    pub folio_type: Option<String>,
    pub site_id: Option<String>,
    pub site_glob: Option<String>,
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub include_archived: bool,

    pub thread_type: Option<String>,
    pub weaver: Option<String>,
    pub from_id: Option<String>,
    pub to_id: Option<String>,

    pub agent_kind: Option<String>,
    pub has_capabilities: Option<Vec<String>>,

    pub sort: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,

    /// The calling agent, from `X-Agent-Id`; used to resolve `weaver=me`.
    pub caller_agent_id: Option<String>,
}

const VALID_RESOURCES: &[&str] = &["folios", "threads", "agents", "sites"];

#[derive(Debug, Serialize)]
pub struct ResourceResult<T> {
    pub total: usize,
    pub items: Vec<T>,
}

#[derive(Debug, Default, Serialize)]
pub struct SearchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folios: Option<ResourceResult<Folio>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<ResourceResult<Thread>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents: Option<ResourceResult<Agent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sites: Option<ResourceResult<Site>>,
    pub took_ms: u128,
}

fn resolve_sort(raw: Option<&str>) -> Sort {
    match raw {
        Some("created_asc") => Sort::CreatedAsc,
        Some("relevance") => Sort::Relevance,
        _ => Sort::Created,
    }
}

fn relevance(query: &str, title: &str, content: &str) -> i32 {
    let q = query.to_lowercase();
    let mut score = 0;
    if title.to_lowercase().contains(&q) {
        score += 10;
    }
    if content.to_lowercase().contains(&q) {
        score += 1;
    }
    score
}

fn parse_time_bound(raw: &Option<String>, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => crate::identity::parse_relative_time(s, now)
            .map(Some)
            .map_err(|e| ApiError::ValidationError(e.to_string())),
    }
}

pub fn run_search(
    store: &ObjectStore,
    derived: &DerivedStateEngine,
    req: &SearchRequest,
    now: DateTime<Utc>,
) -> Result<SearchResponse, ApiError> {
    let started = Instant::now();

    let requested: Vec<String> = req
        .resources
        .clone()
        .unwrap_or_else(|| vec!["folios".to_string()]);
    for r in &requested {
        if !VALID_RESOURCES.contains(&r.as_str()) {
            return Err(ApiError::ValidationError(format!(
                "unknown search resource '{r}': expected one of {VALID_RESOURCES:?}"
            )));
        }
    }

    let since = parse_time_bound(&req.since, now)?;
    let before = parse_time_bound(&req.before, now)?;
    let limit = req.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = req.offset.unwrap_or(0);
    let sort = resolve_sort(req.sort.as_deref());
    let query_is_empty = req.q.trim().is_empty();

    let mut response = SearchResponse::default();

    if requested.iter().any(|r| r == "folios") {
        response.folios = Some(search_folios(store, derived, req, since, before, sort, query_is_empty, limit, offset)?);
    }
    if requested.iter().any(|r| r == "threads") {
        response.threads = Some(search_threads(store, req, since, before, limit, offset)?);
    }
    if requested.iter().any(|r| r == "agents") {
        response.agents = Some(search_agents(store, req, limit, offset)?);
    }
    if requested.iter().any(|r| r == "sites") {
        response.sites = Some(search_sites(store, req, limit, offset)?);
    }

    response.took_ms = started.elapsed().as_millis();
    Ok(response)
}

fn paginate<T>(mut items: Vec<T>, limit: usize, offset: usize) -> ResourceResult<T> {
    let total = items.len();
    if offset >= items.len() {
        items.clear();
    } else {
        items = items.split_off(offset);
    }
    items.truncate(limit);
    ResourceResult { total, items }
}

fn site_matches_glob(site_id: &str, pattern: &str) -> bool {
    glob::Pattern::new(pattern)
        .map(|p| p.matches(site_id))
        .unwrap_or(false)
}

/// Overlays a folio's derived status/assigned-to onto its stored record —
/// stored values are a cache/shadow, never authoritative on their own.
fn with_derived(store: &ObjectStore, derived: &DerivedStateEngine, mut folio: Folio) -> Result<Folio, ApiError> {
    if let Some(status) = derived.current_status(store, &folio.folio_id).map_err(ApiError::Internal)? {
        folio.status = status;
    }
    if let Some(assigned_to) = derived.current_assignment(store, &folio.folio_id).map_err(ApiError::Internal)? {
        folio.assigned_to = Some(assigned_to);
    }
    Ok(folio)
}

#[allow(clippy::too_many_arguments)]
fn search_folios(
    store: &ObjectStore,
    derived: &DerivedStateEngine,
    req: &SearchRequest,
    since: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
    sort: Sort,
    query_is_empty: bool,
    limit: usize,
    offset: usize,
) -> Result<ResourceResult<Folio>, ApiError> {
    let mut folios = store.get_folios(req.site_id.as_deref()).map_err(ApiError::Internal)?;
    folios = folios
        .into_iter()
        .map(|f| with_derived(store, derived, f))
        .collect::<Result<Vec<_>, _>>()?;

    let q = req.q.to_lowercase();
    folios.retain(|f| {
        if !req.include_archived && f.archived {
            return false;
        }
        if let Some(t) = &req.folio_type {
            if &f.folio_type != t {
                return false;
            }
        }
        if let Some(pattern) = &req.site_glob {
            if !site_matches_glob(&f.site_id, pattern) {
                return false;
            }
        }
        if let Some(assigned_to) = &req.assigned_to {
            if f.assigned_to.as_deref() != Some(assigned_to.as_str()) {
                return false;
            }
        }
        if let Some(status) = &req.status {
            if &f.status != status {
                return false;
            }
        }
        if let Some(since) = since {
            if f.created_at < since {
                return false;
            }
        }
        if let Some(before) = before {
            if f.created_at > before {
                return false;
            }
        }
        if !q.is_empty() {
            if !f.title.to_lowercase().contains(&q) && !f.content.to_lowercase().contains(&q) {
                return false;
            }
        }
        true
    });

    match sort {
        Sort::CreatedAsc => folios.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        Sort::Relevance if !query_is_empty => folios.sort_by(|a, b| {
            relevance(&req.q, &b.title, &b.content).cmp(&relevance(&req.q, &a.title, &a.content))
        }),
        _ => folios.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }

    Ok(paginate(folios, limit, offset))
}

fn search_threads(
    store: &ObjectStore,
    req: &SearchRequest,
    since: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
    limit: usize,
    offset: usize,
) -> Result<ResourceResult<Thread>, ApiError> {
    let mut threads = store
        .get_threads(&crate::store::model::ThreadFilter {
            from_id: req.from_id.clone(),
            to_id: req.to_id.clone(),
            thread_type: req.thread_type.clone(),
            weaver: None,
        })
        .map_err(ApiError::Internal)?;

    let weaver_filter = req.weaver.as_deref().map(|w| {
        if w == "me" {
            req.caller_agent_id.clone().unwrap_or_default()
        } else {
            w.to_string()
        }
    });

    let q = req.q.to_lowercase();
    threads.retain(|t| {
        if let Some(weaver) = &weaver_filter {
            if t.weaver.as_deref() != Some(weaver.as_str()) {
                return false;
            }
        }
        if let Some(since) = since {
            if t.created_at < since {
                return false;
            }
        }
        if let Some(before) = before {
            if t.created_at > before {
                return false;
            }
        }
        if !q.is_empty() {
            let content = t.content.as_deref().unwrap_or("").to_lowercase();
            if !content.contains(&q) {
                return false;
            }
        }
        true
    });

    threads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(paginate(threads, limit, offset))
}

fn search_agents(
    store: &ObjectStore,
    req: &SearchRequest,
    limit: usize,
    offset: usize,
) -> Result<ResourceResult<Agent>, ApiError> {
    let mut agents = store.get_agents(req.status.as_deref()).map_err(ApiError::Internal)?;

    let q = req.q.to_lowercase();
    agents.retain(|a| {
        if let Some(kind) = &req.agent_kind {
            let matches = a
                .agent_type
                .map(|k| format!("{k:?}").to_lowercase() == kind.to_lowercase())
                .unwrap_or(false);
            if !matches {
                return false;
            }
        }
        if let Some(caps) = &req.has_capabilities {
            if !caps.iter().all(|c| a.capabilities.contains(c)) {
                return false;
            }
        }
        if !q.is_empty() {
            let name = a.name.as_deref().unwrap_or("").to_lowercase();
            let caps_text = a.capabilities.join(" ").to_lowercase();
            if !a.agent_id.to_lowercase().contains(&q) && !name.contains(&q) && !caps_text.contains(&q) {
                return false;
            }
        }
        true
    });

    agents.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
    Ok(paginate(agents, limit, offset))
}

fn search_sites(
    store: &ObjectStore,
    req: &SearchRequest,
    limit: usize,
    offset: usize,
) -> Result<ResourceResult<Site>, ApiError> {
    let mut sites = store.get_sites().map_err(ApiError::Internal)?;

    let q = req.q.to_lowercase();
    sites.retain(|s| {
        if let Some(status) = &req.status {
            if &s.status != status {
                return false;
            }
        }
        if !q.is_empty() {
            if !s.site_id.to_lowercase().contains(&q) && !s.purpose.to_lowercase().contains(&q) {
                return false;
            }
        }
        true
    });

    sites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(paginate(sites, limit, offset))
}
