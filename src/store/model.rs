// SPDX-License-Identifier: MIT
//! Artifact-graph data model: roster, sites, folios, threads.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set describing an agent's runtime origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    ClaudeCode,
    Patbot,
    Horizon,
    Human,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub agent_id: String,
    pub name: Option<String>,
    pub agent_type: Option<AgentKind>,
    pub description: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub name: Option<String>,
    pub agent_type: Option<AgentKind>,
    pub description: Option<String>,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default = "default_orienting")]
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

fn default_orienting() -> String {
    "orienting".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentPatch {
    pub status: Option<String>,
    pub name: Option<String>,
    pub agent_type: Option<AgentKind>,
    pub description: Option<String>,
    pub capabilities: Option<Vec<String>>,
    pub metadata: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteCreate {
    pub site_id: String,
    pub purpose: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub site_id: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub purpose: String,
    #[serde(default = "default_active")]
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

fn default_active() -> String {
    "active".to_string()
}

/// Closed set of folio types. `writ` is part of this set even though
/// it was missing from an earlier iteration of the data model.
pub const FOLIO_TYPES: &[&str] = &[
    "issue", "friction", "brief", "summary", "finding", "notion", "tender", "playbook", "mantle",
    "plan", "writ",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolioCreate {
    #[serde(rename = "type")]
    pub folio_type: String,
    pub site_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub assigned_to: Option<String>,
    pub target_agent: Option<String>,
    pub successor_name: Option<String>,
    pub omlet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folio {
    pub folio_id: String,
    #[serde(rename = "type")]
    pub folio_type: String,
    pub site_id: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub title: String,
    pub content: String,
    #[serde(default = "default_open")]
    pub status: String,
    pub assigned_to: Option<String>,
    pub target_agent: Option<String>,
    pub successor_name: Option<String>,
    pub omlet: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content_hash: Option<String>,
}

fn default_open() -> String {
    "open".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolioPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub archived: Option<bool>,
}

/// Closed set of thread types.
pub const THREAD_TYPES: &[&str] = &[
    "message",
    "mention",
    "reference",
    "assignment",
    "succession",
    "reply",
    "tag",
    "status",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadCreate {
    pub from_id: String,
    pub to_id: String,
    #[serde(rename = "type")]
    pub thread_type: String,
    pub content: Option<String>,
    pub weaver: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(rename = "type")]
    pub thread_type: String,
    pub content: Option<String>,
    pub weaver: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ThreadFilter {
    pub from_id: Option<String>,
    pub to_id: Option<String>,
    pub thread_type: Option<String>,
    pub weaver: Option<String>,
}
