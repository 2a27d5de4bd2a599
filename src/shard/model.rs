// SPDX-License-Identifier: MIT
//! Shard metadata row and the response shapes for git-info/diff/drift/merge.

use serde::Serialize;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ShardRecord {
    pub worktree_name: String,
    pub parent_worktree: Option<String>,
    pub base_commit: String,
    pub created_at: String,
    pub spawning_name: Option<String>,
    pub brief_id: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub tendered_at: Option<String>,
    pub merged_at: Option<String>,
    pub confidence: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShardInfo {
    pub shard_id: String,
    pub worktree_name: String,
    pub branch: String,
    pub base_commit: String,
    pub created_at: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStatus {
    Clean,
    Conflict,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct GitInfo {
    pub commits_ahead: usize,
    pub working_tree_clean: bool,
    pub merge_status: MergeStatus,
    pub commit_log: Vec<String>,
    pub diff_stat: DiffStat,
    pub uncommitted_files: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffStat {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftInfo {
    pub base_commit: String,
    pub commits_on_main_since_base: usize,
    pub notable_main_changes: Vec<String>,
    pub work_diff_stat: DiffStat,
    pub integration_diff_stat: DiffStat,
    pub merge_status: MergeStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub success: bool,
    pub message: String,
    pub conflicts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraftOutcome {
    pub success: bool,
    pub graft_worktree_name: String,
    pub conflicts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewQueue {
    pub needs_commit: Vec<ShardInfo>,
    pub conflicts: Vec<ShardInfo>,
    pub ready: Vec<ShardInfo>,
    pub stale: Vec<ShardInfo>,
}
