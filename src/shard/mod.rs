// SPDX-License-Identifier: MIT
//! Shard subsystem: worktree-isolated branches of work on a shared source
//! tree, with safe spawn/merge/cleanup, drift visibility, and grafts.

pub mod model;
pub mod naming;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use git2::{Repository, StatusOptions};
use once_cell::sync::OnceCell;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::security::is_inside_worktree;
use model::{DiffStat, DriftInfo, GitInfo, GraftOutcome, MergeOutcome, MergeStatus, ReviewQueue, ShardInfo, ShardRecord};
use naming::{branch_name, next_sequence, parse_worktree_name, shard_id, validate_shard_name};

const WORKTREES_DIR_NAME: &str = "worktrees";
const MAIN_BRANCH_CANDIDATES: &[&str] = &["main", "master"];

static MERGE_TREE_CAPABLE: OnceCell<bool> = OnceCell::new();

/// Three-argument merge-tree conflict reporting requires a
/// sufficiently recent tool. git2's `merge_trees` always supports this (it
/// does not shell out to a `git` binary whose version could lag), so the
/// guard is permanently satisfied for this implementation — it is kept as an
/// explicit, named check so the fail-`unknown` path stays reachable if a
/// future build swaps in a subprocess-based backend.
fn merge_tree_capable() -> bool {
    *MERGE_TREE_CAPABLE.get_or_init(|| {
        let v = git2::Version::get();
        v.0 >= 1
    })
}

pub struct ShardSubsystem {
    project_root: PathBuf,
    worktrees_dir: PathBuf,
    pool: SqlitePool,
    stale_days: i64,
}

impl ShardSubsystem {
    pub async fn new(project_root: PathBuf, stale_days: i64) -> Result<Self> {
        let skein_dir = project_root.join(".skein");
        tokio::fs::create_dir_all(&skein_dir).await?;
        let db_path = skein_dir.join("shards.db");
        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;

        Ok(Self {
            worktrees_dir: project_root.join(WORKTREES_DIR_NAME),
            project_root,
            pool,
            stale_days,
        })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        for stmt in include_str!("migrations/001_shards.sql").split(';') {
            let stmt = stmt.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(pool).await?;
            }
        }
        Ok(())
    }

    fn worktree_path(&self, worktree_name: &str) -> PathBuf {
        self.worktrees_dir.join(worktree_name)
    }

    async fn get_record(&self, worktree_name: &str) -> Result<ShardRecord, ApiError> {
        sqlx::query_as::<_, ShardRecord>("SELECT * FROM shards WHERE worktree_name = ?")
            .bind(worktree_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?
            .ok_or_else(|| ApiError::ShardNotFound(worktree_name.to_string()))
    }

    // ─── Spawn ───────────────────────────────────────────────────────────

    pub async fn spawn(
        &self,
        name: &str,
        spawning_name: Option<&str>,
        brief_id: Option<&str>,
        description: Option<&str>,
    ) -> Result<ShardInfo, ApiError> {
        validate_shard_name(name)?;
        tokio::fs::create_dir_all(&self.worktrees_dir)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;

        let today = Utc::now().format("%Y%m%d").to_string();
        let prefix = format!("{name}-{today}-");
        let mut existing_sequences = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.worktrees_dir)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| ApiError::Internal(e.into()))? {
            if let Some(file_name) = entry.file_name().to_str() {
                if let Some(suffix) = file_name.strip_prefix(&prefix) {
                    if let Ok(seq) = suffix.parse::<u32>() {
                        existing_sequences.push(seq);
                    }
                }
            }
        }
        let sequence = next_sequence(&existing_sequences)?;
        let worktree_name = format!("{name}-{today}-{sequence:03}");
        let branch = branch_name(&worktree_name);
        let worktree_path = self.worktree_path(&worktree_name);

        let project_root = self.project_root.clone();
        let branch_owned = branch.clone();
        let wt_path = worktree_path.clone();
        let base_commit = tokio::task::spawn_blocking(move || spawn_worktree_blocking(&project_root, &branch_owned, &wt_path))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn task panicked: {e}")))?
            .map_err(ApiError::Internal)?;

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO shards (worktree_name, base_commit, created_at, spawning_name, brief_id, description, status) \
             VALUES (?, ?, ?, ?, ?, ?, 'active')",
        )
        .bind(&worktree_name)
        .bind(&base_commit)
        .bind(&now)
        .bind(spawning_name)
        .bind(brief_id)
        .bind(description)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

        info!(worktree = %worktree_name, branch = %branch, "shard spawned");
        Ok(ShardInfo {
            shard_id: shard_id(&worktree_name),
            worktree_name,
            branch,
            base_commit,
            created_at: now,
            status: "active".to_string(),
        })
    }

    // ─── List / status ───────────────────────────────────────────────────

    /// Asks git for the worktrees that actually exist under the project's
    /// worktrees directory, then joins each against its metadata row for the
    /// richer fields — the SQLite table is a cache, not the source of truth
    /// for which shards exist.
    pub async fn list_shards(&self) -> Result<Vec<ShardInfo>, ApiError> {
        let project_root = self.project_root.clone();
        let worktrees_dir = self.worktrees_dir.clone();
        let names = tokio::task::spawn_blocking(move || list_worktree_names_blocking(&project_root, &worktrees_dir))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("list-shards task panicked: {e}")))?
            .map_err(ApiError::Internal)?;

        let mut infos = Vec::with_capacity(names.len());
        for name in names {
            let record = sqlx::query_as::<_, ShardRecord>("SELECT * FROM shards WHERE worktree_name = ?")
                .bind(&name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ApiError::Internal(e.into()))?;
            match record {
                Some(r) if r.status != "merged" => infos.push(record_to_info(r)),
                // Merged shards are retired even if a stray worktree lingers.
                Some(_) => continue,
                // A worktree git2 knows about but the metadata table doesn't
                // (manual creation, or a crash between worktree-add and the
                // INSERT in spawn()) still counts as an active shard.
                None => infos.push(ShardInfo {
                    shard_id: shard_id(&name),
                    worktree_name: name.clone(),
                    branch: branch_name(&name),
                    base_commit: String::new(),
                    created_at: String::new(),
                    status: "active".to_string(),
                }),
            }
        }
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(infos)
    }

    pub async fn get_shard_status(&self, worktree_name: &str) -> Result<ShardRecord, ApiError> {
        self.get_record(worktree_name).await
    }

    // ─── Git info / diff / drift ─────────────────────────────────────────

    pub async fn get_shard_git_info(&self, worktree_name: &str) -> Result<GitInfo, ApiError> {
        let record = self.get_record(worktree_name).await?;
        let project_root = self.project_root.clone();
        let worktree_path = self.worktree_path(worktree_name);
        let base_commit = record.base_commit.clone();
        tokio::task::spawn_blocking(move || git_info_blocking(&project_root, &worktree_path, &base_commit))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("git-info task panicked: {e}")))?
            .map_err(ApiError::Internal)
    }

    pub async fn get_shard_work_diff(&self, worktree_name: &str) -> Result<DiffStat, ApiError> {
        let record = self.get_record(worktree_name).await?;
        let project_root = self.project_root.clone();
        let base_commit = record.base_commit.clone();
        let branch = branch_name(worktree_name);
        tokio::task::spawn_blocking(move || work_diff_stat_blocking(&project_root, &base_commit, &branch))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("diff task panicked: {e}")))?
            .map_err(ApiError::Internal)
    }

    pub async fn get_shard_diff(&self, worktree_name: &str, integration: bool) -> Result<DiffStat, ApiError> {
        if !integration {
            return self.get_shard_work_diff(worktree_name).await;
        }
        self.get_record(worktree_name).await?;
        let project_root = self.project_root.clone();
        let branch = branch_name(worktree_name);
        tokio::task::spawn_blocking(move || integration_diff_stat_blocking(&project_root, &branch))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("diff task panicked: {e}")))?
            .map_err(ApiError::Internal)
    }

    pub async fn get_shard_drift_info(&self, worktree_name: &str) -> Result<DriftInfo, ApiError> {
        let record = self.get_record(worktree_name).await?;
        let project_root = self.project_root.clone();
        let base_commit = record.base_commit.clone();
        let branch = branch_name(worktree_name);
        tokio::task::spawn_blocking(move || drift_info_blocking(&project_root, &base_commit, &branch))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("drift task panicked: {e}")))?
            .map_err(ApiError::Internal)
    }

    // ─── Merge ───────────────────────────────────────────────────────────

    pub async fn merge(&self, worktree_name: &str, caller_cwd: &Path) -> Result<MergeOutcome, ApiError> {
        self.get_record(worktree_name).await?;
        let worktree_path = self.worktree_path(worktree_name);
        if !worktree_path.exists() {
            return Err(ApiError::ShardNotFound(worktree_name.to_string()));
        }

        if is_inside_worktree(caller_cwd, &worktree_path) {
            return Err(ApiError::Precondition {
                message: format!("refusing to merge: caller is inside the worktree {}", worktree_path.display()),
                conflicts: Vec::new(),
            });
        }

        let project_root = self.project_root.clone();
        let branch = branch_name(worktree_name);
        let outcome = tokio::task::spawn_blocking(move || merge_blocking(&project_root, &worktree_path, &branch))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("merge task panicked: {e}")))?
            .map_err(ApiError::Internal)?;

        match outcome {
            MergeOutcomeInternal::Precondition { message, conflicts } => {
                return Err(ApiError::Precondition { message, conflicts });
            }
            MergeOutcomeInternal::Merged => {}
        }

        self.cleanup(worktree_name, false, None).await?;

        Ok(MergeOutcome {
            success: true,
            message: format!("merged {}", branch_name(worktree_name)),
            conflicts: Vec::new(),
        })
    }

    // ─── Cleanup ─────────────────────────────────────────────────────────

    pub async fn cleanup(
        &self,
        worktree_name: &str,
        keep_branch: bool,
        caller_cwd: Option<&Path>,
    ) -> Result<(), ApiError> {
        let basename = Path::new(worktree_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(worktree_name)
            .to_string();

        if basename.is_empty() || basename == WORKTREES_DIR_NAME {
            return Err(ApiError::ValidationError("invalid shard name for cleanup".to_string()));
        }

        let worktree_path = crate::security::safe_path(&self.worktrees_dir, Path::new(&basename))
            .map_err(|e| ApiError::ValidationError(e.to_string()))?;

        let cwd = match caller_cwd {
            Some(p) => p.to_path_buf(),
            None => std::env::current_dir().map_err(|e| ApiError::Internal(e.into()))?,
        };
        if is_inside_worktree(&cwd, &worktree_path) {
            return Err(ApiError::Precondition {
                message: format!("refusing to clean up: caller is inside the worktree {}", worktree_path.display()),
                conflicts: Vec::new(),
            });
        }

        let project_root = self.project_root.clone();
        let branch = branch_name(&basename);
        let wt_path = worktree_path.clone();
        tokio::task::spawn_blocking(move || cleanup_worktree_blocking(&project_root, &wt_path, &branch, keep_branch))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("cleanup task panicked: {e}")))?
            .map_err(ApiError::Internal)?;

        sqlx::query("DELETE FROM shards WHERE worktree_name = ?")
            .bind(&basename)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;
        Ok(())
    }

    // ─── Graft ───────────────────────────────────────────────────────────

    pub async fn graft(&self, worktree_name: &str) -> Result<GraftOutcome, ApiError> {
        let source = self.get_record(worktree_name).await?;
        let graft_name = format!("{worktree_name}-graft");
        if self.get_record(&graft_name).await.is_ok() {
            return Err(ApiError::Precondition {
                message: format!("a graft of {worktree_name} already exists"),
                conflicts: Vec::new(),
            });
        }

        let project_root = self.project_root.clone();
        let source_branch = branch_name(worktree_name);
        let graft_branch = branch_name(&graft_name);
        let graft_path = self.worktree_path(&graft_name);
        let base_commit = source.base_commit.clone();

        let (new_base, conflicts) = tokio::task::spawn_blocking(move || {
            graft_blocking(&project_root, &source_branch, &base_commit, &graft_branch, &graft_path)
        })
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("graft task panicked: {e}")))?
        .map_err(ApiError::Internal)?;

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO shards (worktree_name, parent_worktree, base_commit, created_at, status) VALUES (?, ?, ?, ?, 'active')",
        )
        .bind(&graft_name)
        .bind(worktree_name)
        .bind(&new_base)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

        Ok(GraftOutcome {
            success: conflicts.is_empty(),
            graft_worktree_name: graft_name,
            conflicts,
        })
    }

    pub async fn get_graft_chain_root(&self, worktree_name: &str) -> Result<String, ApiError> {
        let mut current = worktree_name.to_string();
        loop {
            match self.get_record(&current).await {
                Ok(record) => match record.parent_worktree {
                    Some(parent) => current = parent,
                    None => return Ok(current),
                },
                Err(_) => {
                    if let Some(parsed) = parse_worktree_name(&current) {
                        if parsed.is_graft {
                            current = current.trim_end_matches("-graft").to_string();
                            continue;
                        }
                    }
                    return Ok(current);
                }
            }
        }
    }

    pub async fn get_graft_chain(&self, worktree_name: &str) -> Result<Vec<String>, ApiError> {
        let root = self.get_graft_chain_root(worktree_name).await?;
        let mut chain = vec![root.clone()];
        let mut frontier = root;
        loop {
            let children: Vec<String> = sqlx::query_scalar::<_, String>("SELECT worktree_name FROM shards WHERE parent_worktree = ?")
                .bind(&frontier)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| ApiError::Internal(e.into()))?;
            match children.into_iter().next() {
                Some(child) => {
                    chain.push(child.clone());
                    frontier = child;
                }
                None => break,
            }
        }
        Ok(chain)
    }

    // ─── Review queue ────────────────────────────────────────────────────

    pub async fn review_queue(&self) -> Result<ReviewQueue, ApiError> {
        let records = sqlx::query_as::<_, ShardRecord>("SELECT * FROM shards WHERE status = 'active'")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;

        let mut queue = ReviewQueue::default();
        let now = Utc::now();
        for record in records {
            let info = record_to_info(record.clone());
            let git_info = match self.get_shard_git_info(&record.worktree_name).await {
                Ok(g) => g,
                Err(_) => continue,
            };
            let created_at = chrono::DateTime::parse_from_rfc3339(&record.created_at)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or(now);
            let age_days = (now - created_at).num_days().max(0);

            if !git_info.working_tree_clean {
                queue.needs_commit.push(info);
            } else if git_info.merge_status == MergeStatus::Conflict {
                queue.conflicts.push(info);
            } else if git_info.commits_ahead == 0 && age_days >= self.stale_days {
                queue.stale.push(info);
            } else if git_info.commits_ahead > 0 && git_info.merge_status == MergeStatus::Clean {
                queue.ready.push(info);
            }
        }

        for bucket in [&mut queue.needs_commit, &mut queue.conflicts, &mut queue.ready, &mut queue.stale] {
            bucket.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        }
        Ok(queue)
    }
}

fn record_to_info(record: ShardRecord) -> ShardInfo {
    ShardInfo {
        shard_id: shard_id(&record.worktree_name),
        branch: branch_name(&record.worktree_name),
        worktree_name: record.worktree_name,
        base_commit: record.base_commit,
        created_at: record.created_at,
        status: record.status,
    }
}

// ─── Blocking git2 helpers ──────────────────────────────────────────────────

fn find_main_branch(repo: &Repository) -> Result<git2::Branch> {
    for candidate in MAIN_BRANCH_CANDIDATES {
        if let Ok(branch) = repo.find_branch(candidate, git2::BranchType::Local) {
            return Ok(branch);
        }
    }
    let head = repo.head().context("repository has no HEAD")?;
    let name = head.shorthand().context("HEAD is not a branch")?.to_string();
    repo.find_branch(&name, git2::BranchType::Local).context("could not resolve main branch")
}

fn spawn_worktree_blocking(project_root: &Path, branch_name: &str, wt_path: &Path) -> Result<String> {
    let repo = Repository::open(project_root).context("opening project repository")?;
    let main = find_main_branch(&repo)?;
    let base_commit = main.get().peel_to_commit().context("resolving main branch tip")?;

    let branch = repo
        .branch(branch_name, &base_commit, false)
        .context("creating shard branch")?;

    let wt_name = branch_name.replace('/', "--");
    let mut opts = git2::WorktreeAddOptions::new();
    opts.reference(Some(branch.get()));
    repo.worktree(&wt_name, wt_path, Some(&opts)).context("adding git worktree")?;

    Ok(base_commit.id().to_string())
}

/// Lists the worktree directory names git2 actually has registered under
/// `worktrees_dir`. The administrative name `repo.worktrees()` returns is
/// derived from the branch (see `spawn_worktree_blocking`), not the
/// directory, so the worktree_name is recovered from the path's basename.
fn list_worktree_names_blocking(project_root: &Path, worktrees_dir: &Path) -> Result<Vec<String>> {
    let repo = Repository::open(project_root).context("opening project repository")?;
    let admin_names = repo.worktrees().context("listing git worktrees")?;
    let mut out = Vec::new();
    for admin_name in admin_names.iter().flatten() {
        let wt = match repo.find_worktree(admin_name) {
            Ok(wt) => wt,
            Err(_) => continue,
        };
        if !wt.path().starts_with(worktrees_dir) {
            continue;
        }
        let Some(worktree_name) = wt.path().file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if parse_worktree_name(worktree_name).is_none() {
            continue;
        }
        out.push(worktree_name.to_string());
    }
    Ok(out)
}

fn working_tree_is_clean(repo: &Repository) -> Result<(bool, Vec<String>)> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true).recurse_untracked_dirs(true);
    let statuses = repo.statuses(Some(&mut opts))?;
    let files: Vec<String> = statuses.iter().filter_map(|e| e.path().map(str::to_string)).collect();
    Ok((files.is_empty(), files))
}

fn compute_merge_status(repo: &Repository, main_tip: git2::Oid, branch_tip: git2::Oid) -> Result<(MergeStatus, Vec<String>)> {
    if !merge_tree_capable() {
        return Ok((MergeStatus::Unknown, Vec::new()));
    }
    if main_tip == branch_tip {
        return Ok((MergeStatus::Clean, Vec::new()));
    }
    let base_oid = repo.merge_base(main_tip, branch_tip).context("computing merge base")?;
    let base_tree = repo.find_commit(base_oid)?.tree()?;
    let our_tree = repo.find_commit(main_tip)?.tree()?;
    let their_tree = repo.find_commit(branch_tip)?.tree()?;

    let mut index = repo.merge_trees(&base_tree, &our_tree, &their_tree, None).context("trial merge")?;
    if index.has_conflicts() {
        let conflicts: Vec<String> = index
            .conflicts()?
            .filter_map(|c| c.ok())
            .filter_map(|c| c.our.or(c.their).or(c.ancestor))
            .filter_map(|entry| std::str::from_utf8(&entry.path).ok().map(str::to_string))
            .collect();
        Ok((MergeStatus::Conflict, conflicts))
    } else {
        Ok((MergeStatus::Clean, Vec::new()))
    }
}

fn git_info_blocking(project_root: &Path, worktree_path: &Path, base_commit: &str) -> Result<GitInfo> {
    let main_repo = Repository::open(project_root)?;
    let main_tip = find_main_branch(&main_repo)?.get().peel_to_commit()?.id();

    let wt_repo = Repository::open(worktree_path).context("opening shard worktree repository")?;
    let branch_tip = wt_repo.head()?.peel_to_commit()?.id();

    let (working_tree_clean, uncommitted_files) = working_tree_is_clean(&wt_repo)?;
    let (commits_ahead, _) = main_repo.graph_ahead_behind(branch_tip, main_tip).unwrap_or((0, 0));
    let (merge_status, _conflicts) = compute_merge_status(&main_repo, main_tip, branch_tip)?;

    let base_oid = git2::Oid::from_str(base_commit).unwrap_or(branch_tip);
    let mut revwalk = main_repo.revwalk()?;
    revwalk.push(branch_tip)?;
    revwalk.hide(base_oid).ok();
    let mut commit_log = Vec::new();
    for oid in revwalk.flatten().take(50) {
        if let Ok(commit) = main_repo.find_commit(oid) {
            commit_log.push(commit.summary().unwrap_or("").to_string());
        }
    }

    let base_tree = main_repo.find_commit(base_oid).ok().and_then(|c| c.tree().ok());
    let branch_tree = main_repo.find_commit(branch_tip)?.tree()?;
    let diff = main_repo.diff_tree_to_tree(base_tree.as_ref(), Some(&branch_tree), None)?;
    let stats = diff.stats()?;

    Ok(GitInfo {
        commits_ahead,
        working_tree_clean,
        merge_status,
        commit_log,
        diff_stat: DiffStat {
            files_changed: stats.files_changed(),
            insertions: stats.insertions(),
            deletions: stats.deletions(),
        },
        uncommitted_files,
    })
}

fn work_diff_stat_blocking(project_root: &Path, base_commit: &str, branch: &str) -> Result<DiffStat> {
    let repo = Repository::open(project_root)?;
    let base_oid = git2::Oid::from_str(base_commit)?;
    let base_tree = repo.find_commit(base_oid)?.tree()?;
    let branch_tip = repo.find_branch(branch, git2::BranchType::Local)?.get().peel_to_commit()?;
    let branch_tree = branch_tip.tree()?;
    let diff = repo.diff_tree_to_tree(Some(&base_tree), Some(&branch_tree), None)?;
    let stats = diff.stats()?;
    Ok(DiffStat {
        files_changed: stats.files_changed(),
        insertions: stats.insertions(),
        deletions: stats.deletions(),
    })
}

fn integration_diff_stat_blocking(project_root: &Path, branch: &str) -> Result<DiffStat> {
    let repo = Repository::open(project_root)?;
    let main_tip = find_main_branch(&repo)?.get().peel_to_commit()?.id();
    let branch_tip = repo.find_branch(branch, git2::BranchType::Local)?.get().peel_to_commit()?.id();
    let merge_base = repo.merge_base(main_tip, branch_tip)?;
    let base_tree = repo.find_commit(merge_base)?.tree()?;
    let branch_tree = repo.find_commit(branch_tip)?.tree()?;
    let diff = repo.diff_tree_to_tree(Some(&base_tree), Some(&branch_tree), None)?;
    let stats = diff.stats()?;
    Ok(DiffStat {
        files_changed: stats.files_changed(),
        insertions: stats.insertions(),
        deletions: stats.deletions(),
    })
}

fn drift_info_blocking(project_root: &Path, base_commit: &str, branch: &str) -> Result<DriftInfo> {
    let repo = Repository::open(project_root)?;
    let base_oid = git2::Oid::from_str(base_commit)?;
    let main_tip = find_main_branch(&repo)?.get().peel_to_commit()?.id();
    let branch_tip = repo.find_branch(branch, git2::BranchType::Local)?.get().peel_to_commit()?.id();

    let mut revwalk = repo.revwalk()?;
    revwalk.push(main_tip)?;
    revwalk.hide(base_oid).ok();
    let mut notable_main_changes = Vec::new();
    let mut commits_on_main_since_base = 0usize;
    for oid in revwalk.flatten() {
        commits_on_main_since_base += 1;
        if notable_main_changes.len() < 10 {
            if let Ok(commit) = repo.find_commit(oid) {
                notable_main_changes.push(commit.summary().unwrap_or("").to_string());
            }
        }
    }

    let work_diff_stat = work_diff_stat_blocking(project_root, base_commit, branch)?;
    let integration_diff_stat = integration_diff_stat_blocking(project_root, branch)?;
    let (merge_status, _) = compute_merge_status(&repo, main_tip, branch_tip)?;

    Ok(DriftInfo {
        base_commit: base_commit.to_string(),
        commits_on_main_since_base,
        notable_main_changes,
        work_diff_stat,
        integration_diff_stat,
        merge_status,
    })
}

enum MergeOutcomeInternal {
    Merged,
    Precondition { message: String, conflicts: Vec<String> },
}

fn merge_blocking(project_root: &Path, worktree_path: &Path, branch: &str) -> Result<MergeOutcomeInternal> {
    let wt_repo = Repository::open(worktree_path)?;
    let (clean, uncommitted) = working_tree_is_clean(&wt_repo)?;
    if !clean {
        return Ok(MergeOutcomeInternal::Precondition {
            message: "shard working tree has uncommitted changes".to_string(),
            conflicts: uncommitted,
        });
    }

    let repo = Repository::open(project_root)?;
    let main_branch = find_main_branch(&repo)?;
    let main_ref_name = main_branch.get().name().unwrap_or("refs/heads/main").to_string();
    let main_tip = main_branch.get().peel_to_commit()?;
    let branch_tip = repo.find_branch(branch, git2::BranchType::Local)?.get().peel_to_commit()?;

    let (status, conflicts) = compute_merge_status(&repo, main_tip.id(), branch_tip.id())?;
    if status != MergeStatus::Clean {
        return Ok(MergeOutcomeInternal::Precondition {
            message: format!("merge status is {status:?}, refusing to merge"),
            conflicts,
        });
    }

    let base_oid = repo.merge_base(main_tip.id(), branch_tip.id())?;
    let base_tree = repo.find_commit(base_oid)?.tree()?;
    let our_tree = main_tip.tree()?;
    let their_tree = branch_tip.tree()?;
    let mut index = repo.merge_trees(&base_tree, &our_tree, &their_tree, None)?;
    let tree_oid = index.write_tree_to(&repo)?;
    let tree = repo.find_tree(tree_oid)?;

    let signature = repo.signature().or_else(|_| git2::Signature::now("skeind", "skeind@localhost"))?;
    let message = format!("Merge {branch}");
    let original_target = repo.find_reference(&main_ref_name)?.target();

    let commit_result = repo.commit(
        Some(&main_ref_name),
        &signature,
        &signature,
        &message,
        &tree,
        &[&main_tip, &branch_tip],
    );

    match commit_result {
        Ok(_) => Ok(MergeOutcomeInternal::Merged),
        Err(e) => {
            if let Some(target) = original_target {
                let _ = repo.find_reference(&main_ref_name).and_then(|mut r| r.set_target(target, "restore after failed merge"));
            }
            bail!("merge commit failed: {e}")
        }
    }
}

fn cleanup_worktree_blocking(project_root: &Path, worktree_path: &Path, branch: &str, keep_branch: bool) -> Result<()> {
    let repo = Repository::open(project_root)?;
    let names = repo.worktrees()?;
    let mut found = false;
    for name in names.iter().flatten() {
        if let Ok(wt) = repo.find_worktree(name) {
            if wt.path() == worktree_path {
                found = true;
                if wt.prune(None).is_err() {
                    let mut opts = git2::WorktreePruneOptions::new();
                    opts.valid(true).working_tree(true);
                    wt.prune(Some(&mut opts)).context("force-pruning worktree")?;
                }
                break;
            }
        }
    }
    if !found && worktree_path.exists() {
        std::fs::remove_dir_all(worktree_path).context("removing orphaned worktree directory")?;
    }
    if worktree_path.exists() {
        std::fs::remove_dir_all(worktree_path).ok();
    }

    if !keep_branch {
        if let Ok(mut b) = repo.find_branch(branch, git2::BranchType::Local) {
            if let Err(e) = b.delete() {
                warn!(branch, err = %e, "branch deletion failed (ignored)");
            }
        }
    }
    Ok(())
}

fn graft_blocking(
    project_root: &Path,
    source_branch: &str,
    base_commit: &str,
    graft_branch: &str,
    graft_path: &Path,
) -> Result<(String, Vec<String>)> {
    let repo = Repository::open(project_root)?;
    let base_oid = git2::Oid::from_str(base_commit)?;
    let source_tip = repo.find_branch(source_branch, git2::BranchType::Local)?.get().peel_to_commit()?;

    let mut revwalk = repo.revwalk()?;
    revwalk.push(source_tip.id())?;
    revwalk.hide(base_oid).ok();
    let mut commits: Vec<git2::Oid> = revwalk.flatten().collect();
    commits.reverse();

    let main = find_main_branch(&repo)?;
    let main_tip = main.get().peel_to_commit()?;
    let new_branch = repo.branch(graft_branch, &main_tip, false)?;
    let mut opts = git2::WorktreeAddOptions::new();
    opts.reference(Some(new_branch.get()));
    let wt_name = graft_branch.replace('/', "--");
    repo.worktree(&wt_name, graft_path, Some(&opts)).context("adding graft worktree")?;

    let graft_repo = Repository::open(graft_path)?;
    for oid in commits {
        let commit = repo.find_commit(oid)?;
        graft_repo.cherrypick(&commit, None).context("cherry-picking commit into graft")?;
        let mut index = graft_repo.index()?;
        if index.has_conflicts() {
            let conflicts: Vec<String> = index
                .conflicts()?
                .filter_map(|c| c.ok())
                .filter_map(|c| c.our.or(c.their).or(c.ancestor))
                .filter_map(|entry| std::str::from_utf8(&entry.path).ok().map(str::to_string))
                .collect();
            return Ok((main_tip.id().to_string(), conflicts));
        }
        let tree_oid = index.write_tree_to(&graft_repo)?;
        let tree = graft_repo.find_tree(tree_oid)?;
        let signature = graft_repo.signature().or_else(|_| git2::Signature::now("skeind", "skeind@localhost"))?;
        let head_commit = graft_repo.head()?.peel_to_commit()?;
        let new_oid = graft_repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            commit.message().unwrap_or("cherry-pick"),
            &tree,
            &[&head_commit],
        )?;
        graft_repo.cleanup_state()?;
        let _ = new_oid;
    }

    Ok((main_tip.id().to_string(), Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        let mut index = repo.index().unwrap();
        index.add_all(["."], git2::IndexAddOption::DEFAULT, None).unwrap();
        index.write().unwrap();
        let tree_oid = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        let parents: Vec<git2::Commit> = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs).unwrap()
    }

    fn init_project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("README.md"), "hello\n").unwrap();
        commit_all(&repo, "initial commit");

        // git2::Repository::init defaults to "master" unless configured otherwise;
        // normalize to "main" so find_main_branch's first candidate matches.
        let head = repo.head().unwrap();
        if head.shorthand() != Some("main") {
            let commit = head.peel_to_commit().unwrap();
            repo.branch("main", &commit, false).unwrap();
            repo.set_head("refs/heads/main").unwrap();
        }
        dir
    }

    async fn subsystem(dir: &tempfile::TempDir) -> ShardSubsystem {
        ShardSubsystem::new(dir.path().to_path_buf(), 7).await.unwrap()
    }

    #[tokio::test]
    async fn spawn_creates_worktree_and_branch() {
        let dir = init_project();
        let sub = subsystem(&dir).await;
        let info = sub.spawn("fix-bug", Some("alice"), None, None).await.unwrap();
        assert!(info.worktree_name.starts_with("fix-bug-"));
        assert_eq!(info.branch, format!("shard-{}", info.worktree_name));
        assert!(dir.path().join("worktrees").join(&info.worktree_name).join("README.md").exists());
    }

    #[tokio::test]
    async fn spawn_rejects_invalid_name() {
        let dir = init_project();
        let sub = subsystem(&dir).await;
        assert!(sub.spawn("-bad", None, None, None).await.is_err());
    }

    #[tokio::test]
    async fn spawn_twice_same_day_increments_sequence() {
        let dir = init_project();
        let sub = subsystem(&dir).await;
        let first = sub.spawn("fix-bug", None, None, None).await.unwrap();
        let second = sub.spawn("fix-bug", None, None, None).await.unwrap();
        assert_ne!(first.worktree_name, second.worktree_name);
    }

    #[tokio::test]
    async fn git_info_reports_clean_tree_and_zero_commits_ahead() {
        let dir = init_project();
        let sub = subsystem(&dir).await;
        let info = sub.spawn("fix-bug", None, None, None).await.unwrap();
        let git_info = sub.get_shard_git_info(&info.worktree_name).await.unwrap();
        assert!(git_info.working_tree_clean);
        assert_eq!(git_info.commits_ahead, 0);
        assert_eq!(git_info.merge_status, MergeStatus::Clean);
    }

    #[tokio::test]
    async fn merge_refuses_when_caller_is_inside_worktree() {
        let dir = init_project();
        let sub = subsystem(&dir).await;
        let info = sub.spawn("fix-bug", None, None, None).await.unwrap();
        let worktree_path = dir.path().join("worktrees").join(&info.worktree_name);
        let result = sub.merge(&info.worktree_name, &worktree_path).await;
        assert!(matches!(result, Err(ApiError::Precondition { .. })));
    }

    #[tokio::test]
    async fn merge_commits_shard_changes_onto_main() {
        let dir = init_project();
        let sub = subsystem(&dir).await;
        let info = sub.spawn("fix-bug", None, None, None).await.unwrap();
        let worktree_path = dir.path().join("worktrees").join(&info.worktree_name);
        fs::write(worktree_path.join("NOTES.md"), "work\n").unwrap();
        let wt_repo = Repository::open(&worktree_path).unwrap();
        commit_all(&wt_repo, "add notes");

        let outside = dir.path().to_path_buf();
        let outcome = sub.merge(&info.worktree_name, &outside).await.unwrap();
        assert!(outcome.success);
        assert!(!worktree_path.exists());
        assert!(sub.get_record(&info.worktree_name).await.is_err());
    }

    #[tokio::test]
    async fn review_queue_flags_dirty_shard_as_needs_commit() {
        let dir = init_project();
        let sub = subsystem(&dir).await;
        let info = sub.spawn("fix-bug", None, None, None).await.unwrap();
        let worktree_path = dir.path().join("worktrees").join(&info.worktree_name);
        fs::write(worktree_path.join("scratch.txt"), "wip\n").unwrap();

        let queue = sub.review_queue().await.unwrap();
        assert_eq!(queue.needs_commit.len(), 1);
        assert_eq!(queue.needs_commit[0].worktree_name, info.worktree_name);
    }

    #[tokio::test]
    async fn list_shards_reflects_git_worktrees_over_stale_metadata() {
        let dir = init_project();
        let sub = subsystem(&dir).await;
        let info = sub.spawn("fix-bug", None, None, None).await.unwrap();

        sqlx::query("DELETE FROM shards WHERE worktree_name = ?")
            .bind(&info.worktree_name)
            .execute(&sub.pool)
            .await
            .unwrap();

        let shards = sub.list_shards().await.unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].worktree_name, info.worktree_name);
        assert_eq!(shards[0].status, "active");
    }

    #[tokio::test]
    async fn list_shards_excludes_merged() {
        let dir = init_project();
        let sub = subsystem(&dir).await;
        let info = sub.spawn("fix-bug", None, None, None).await.unwrap();
        sqlx::query("UPDATE shards SET status = 'merged' WHERE worktree_name = ?")
            .bind(&info.worktree_name)
            .execute(&sub.pool)
            .await
            .unwrap();

        let shards = sub.list_shards().await.unwrap();
        assert!(shards.is_empty());
    }

    #[tokio::test]
    async fn cleanup_removes_worktree_and_metadata() {
        let dir = init_project();
        let sub = subsystem(&dir).await;
        let info = sub.spawn("fix-bug", None, None, None).await.unwrap();
        let worktree_path = dir.path().join("worktrees").join(&info.worktree_name);
        assert!(worktree_path.exists());

        sub.cleanup(&info.worktree_name, false, Some(dir.path())).await.unwrap();
        assert!(!worktree_path.exists());
        assert!(sub.get_record(&info.worktree_name).await.is_err());
    }
}
