// SPDX-License-Identifier: MIT
//! Row and request/response types for the log store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct LogRow {
    pub id: i64,
    pub stream_id: String,
    pub timestamp: String,
    pub level: Option<String>,
    pub source: Option<String>,
    pub message: String,
    pub metadata: Option<String>,
}

impl LogRow {
    pub fn metadata_value(&self) -> Value {
        self.metadata
            .as_deref()
            .and_then(|m| serde_json::from_str(m).ok())
            .unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogLineInput {
    pub level: Option<String>,
    pub message: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct StreamSummary {
    pub stream_id: String,
    pub line_count: i64,
    pub first_timestamp: String,
    pub last_timestamp: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ScreenshotRow {
    pub id: i64,
    pub screenshot_id: String,
    pub strand_id: String,
    pub timestamp: String,
    pub turn_number: Option<i64>,
    pub label: Option<String>,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreenshotInput {
    pub strand_id: String,
    pub turn_number: Option<i64>,
    pub label: Option<String>,
    pub file_path: String,
    pub file_size: Option<i64>,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct YieldRow {
    pub id: i64,
    pub sack_id: String,
    pub chain_id: String,
    pub task_id: String,
    pub agent_id: Option<String>,
    pub timestamp: String,
    pub status: String,
    pub outcome: Option<String>,
    pub artifact_ids: Option<String>,
    pub notes: Option<String>,
    pub duration_seconds: Option<f64>,
    pub tokens_used: Option<i64>,
    pub shard_path: Option<String>,
    pub tender_id: Option<String>,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YieldInput {
    pub sack_id: String,
    pub chain_id: String,
    pub task_id: String,
    pub agent_id: Option<String>,
    pub status: String,
    pub outcome: Option<String>,
    #[serde(default)]
    pub artifact_ids: Vec<String>,
    pub notes: Option<String>,
    pub duration_seconds: Option<f64>,
    pub tokens_used: Option<i64>,
    pub shard_path: Option<String>,
    pub tender_id: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}
