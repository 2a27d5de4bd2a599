// SPDX-License-Identifier: MIT
//! Per-project structured-log database: logs with full-text search,
//! screenshots, and chain-yield records.

pub mod model;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::SqlitePool;

use model::{LogRow, ScreenshotInput, ScreenshotRow, StreamSummary, YieldInput, YieldRow};

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "log store query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

#[derive(Clone)]
pub struct LogStore {
    pool: SqlitePool,
}

impl LogStore {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("skein.db");
        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        for stmt in include_str!("migrations/001_init.sql").split(';') {
            let stmt = stmt.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(pool).await?;
            }
        }
        Ok(())
    }

    // ─── Logs ────────────────────────────────────────────────────────────

    pub async fn add_logs(&self, stream_id: &str, source: Option<&str>, lines: &[model::LogLineInput]) -> Result<usize> {
        with_timeout(async {
            let mut tx = self.pool.begin().await?;
            for line in lines {
                let metadata = serde_json::to_string(&line.metadata)?;
                let result = sqlx::query(
                    "INSERT INTO logs (stream_id, level, source, message, metadata) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(stream_id)
                .bind(&line.level)
                .bind(source)
                .bind(&line.message)
                .bind(&metadata)
                .execute(&mut *tx)
                .await?;
                let row_id = result.last_insert_rowid();
                sqlx::query("INSERT INTO logs_fts (rowid, message) VALUES (?, ?)")
                    .bind(row_id)
                    .bind(&line.message)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            Ok(lines.len())
        })
        .await
    }

    pub async fn get_logs(
        &self,
        stream_id: &str,
        since: Option<&str>,
        level: Option<&str>,
        search: Option<&str>,
        limit: i64,
    ) -> Result<Vec<LogRow>> {
        let limit = limit.clamp(1, 10_000);
        with_timeout(async {
            if let Some(query) = search.filter(|s| !s.is_empty()) {
                let rows = sqlx::query_as::<_, LogRow>(
                    "SELECT logs.* FROM logs \
                     JOIN logs_fts ON logs_fts.rowid = logs.id \
                     WHERE logs.stream_id = ? \
                       AND logs_fts MATCH ? \
                       AND (? IS NULL OR logs.timestamp >= ?) \
                       AND (? IS NULL OR logs.level = ?) \
                     ORDER BY logs.timestamp DESC LIMIT ?",
                )
                .bind(stream_id)
                .bind(query)
                .bind(since)
                .bind(since)
                .bind(level)
                .bind(level)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .context("full-text log search failed")?;
                Ok(rows)
            } else {
                let rows = sqlx::query_as::<_, LogRow>(
                    "SELECT * FROM logs \
                     WHERE stream_id = ? \
                       AND (? IS NULL OR timestamp >= ?) \
                       AND (? IS NULL OR level = ?) \
                     ORDER BY timestamp DESC LIMIT ?",
                )
                .bind(stream_id)
                .bind(since)
                .bind(since)
                .bind(level)
                .bind(level)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
                Ok(rows)
            }
        })
        .await
    }

    pub async fn get_streams(&self) -> Result<Vec<StreamSummary>> {
        with_timeout(async {
            let rows = sqlx::query_as::<_, StreamSummary>(
                "SELECT stream_id, COUNT(*) as line_count, \
                        MIN(timestamp) as first_timestamp, MAX(timestamp) as last_timestamp \
                 FROM logs GROUP BY stream_id ORDER BY last_timestamp DESC",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
        .await
    }

    // ─── Screenshots ─────────────────────────────────────────────────────

    pub async fn add_screenshot(&self, screenshot_id: &str, input: &ScreenshotInput) -> Result<()> {
        let metadata = serde_json::to_string(&input.metadata)?;
        with_timeout(async {
            sqlx::query(
                "INSERT INTO screenshots (screenshot_id, strand_id, turn_number, label, file_path, file_size, metadata) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(screenshot_id)
            .bind(&input.strand_id)
            .bind(input.turn_number)
            .bind(&input.label)
            .bind(&input.file_path)
            .bind(input.file_size)
            .bind(&metadata)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    pub async fn get_screenshots(&self, strand_id: Option<&str>, since: Option<&str>, limit: i64) -> Result<Vec<ScreenshotRow>> {
        let limit = limit.clamp(1, 10_000);
        with_timeout(async {
            let rows = sqlx::query_as::<_, ScreenshotRow>(
                "SELECT * FROM screenshots \
                 WHERE (? IS NULL OR strand_id = ?) AND (? IS NULL OR timestamp >= ?) \
                 ORDER BY timestamp DESC LIMIT ?",
            )
            .bind(strand_id)
            .bind(strand_id)
            .bind(since)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
        .await
    }

    pub async fn get_screenshot(&self, screenshot_id: &str) -> Result<Option<ScreenshotRow>> {
        with_timeout(async {
            let row = sqlx::query_as::<_, ScreenshotRow>("SELECT * FROM screenshots WHERE screenshot_id = ?")
                .bind(screenshot_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        })
        .await
    }

    // ─── Yields ──────────────────────────────────────────────────────────

    pub async fn add_yield(&self, input: &YieldInput) -> Result<YieldRow> {
        let artifact_ids = serde_json::to_string(&input.artifact_ids)?;
        let metadata = serde_json::to_string(&input.metadata)?;
        with_timeout(async {
            sqlx::query(
                "INSERT INTO yields (sack_id, chain_id, task_id, agent_id, status, outcome, artifact_ids, \
                                      notes, duration_seconds, tokens_used, shard_path, tender_id, metadata) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&input.sack_id)
            .bind(&input.chain_id)
            .bind(&input.task_id)
            .bind(&input.agent_id)
            .bind(&input.status)
            .bind(&input.outcome)
            .bind(&artifact_ids)
            .bind(&input.notes)
            .bind(input.duration_seconds)
            .bind(input.tokens_used)
            .bind(&input.shard_path)
            .bind(&input.tender_id)
            .bind(&metadata)
            .execute(&self.pool)
            .await
            .context("inserting yield record")?;

            sqlx::query_as::<_, YieldRow>("SELECT * FROM yields WHERE sack_id = ?")
                .bind(&input.sack_id)
                .fetch_one(&self.pool)
                .await
                .context("reading back inserted yield")
        })
        .await
    }

    pub async fn get_chain_yields(&self, chain_id: &str) -> Result<Vec<YieldRow>> {
        with_timeout(async {
            Ok(sqlx::query_as::<_, YieldRow>(
                "SELECT * FROM yields WHERE chain_id = ? ORDER BY timestamp ASC",
            )
            .bind(chain_id)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    pub async fn get_yield(&self, sack_id: &str) -> Result<Option<YieldRow>> {
        with_timeout(async {
            Ok(sqlx::query_as::<_, YieldRow>("SELECT * FROM yields WHERE sack_id = ?")
                .bind(sack_id)
                .fetch_optional(&self.pool)
                .await?)
        })
        .await
    }

    pub async fn get_yields_by_status(&self, status: &str) -> Result<Vec<YieldRow>> {
        with_timeout(async {
            Ok(
                sqlx::query_as::<_, YieldRow>("SELECT * FROM yields WHERE status = ? ORDER BY timestamp DESC")
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?,
            )
        })
        .await
    }

    pub async fn get_agent_yields(&self, agent_id: &str) -> Result<Vec<YieldRow>> {
        with_timeout(async {
            Ok(
                sqlx::query_as::<_, YieldRow>("SELECT * FROM yields WHERE agent_id = ? ORDER BY timestamp DESC")
                    .bind(agent_id)
                    .fetch_all(&self.pool)
                    .await?,
            )
        })
        .await
    }

    pub async fn get_previous_yield(&self, chain_id: &str, task_id: &str) -> Result<Option<YieldRow>> {
        with_timeout(async {
            Ok(sqlx::query_as::<_, YieldRow>(
                "SELECT * FROM yields WHERE chain_id = ? AND task_id = ? ORDER BY timestamp DESC LIMIT 1",
            )
            .bind(chain_id)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{LogLineInput, YieldInput};
    use serde_json::json;

    async fn memory_store() -> LogStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        LogStore::migrate(&pool).await.unwrap();
        LogStore { pool }
    }

    #[tokio::test]
    async fn add_and_get_logs_round_trips() {
        let store = memory_store().await;
        store
            .add_logs(
                "strand-1",
                Some("agent"),
                &[LogLineInput { level: Some("info".to_string()), message: "pool exhausted".to_string(), metadata: json!({}) }],
            )
            .await
            .unwrap();
        let rows = store.get_logs("strand-1", None, None, None, 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "pool exhausted");
    }

    #[tokio::test]
    async fn full_text_search_matches_message() {
        let store = memory_store().await;
        store
            .add_logs(
                "strand-1",
                None,
                &[
                    LogLineInput { level: None, message: "connection pool exhausted".to_string(), metadata: json!({}) },
                    LogLineInput { level: None, message: "unrelated line".to_string(), metadata: json!({}) },
                ],
            )
            .await
            .unwrap();
        let rows = store.get_logs("strand-1", None, None, Some("exhausted"), 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "connection pool exhausted");
    }

    #[tokio::test]
    async fn yields_ordered_by_timestamp_within_chain() {
        let store = memory_store().await;
        store
            .add_yield(&YieldInput {
                sack_id: "yield-1".to_string(),
                chain_id: "chain-1".to_string(),
                task_id: "task-1".to_string(),
                agent_id: Some("alice".to_string()),
                status: "complete".to_string(),
                outcome: Some("done".to_string()),
                artifact_ids: vec![],
                notes: None,
                duration_seconds: Some(12.5),
                tokens_used: Some(100),
                shard_path: None,
                tender_id: None,
                metadata: json!({}),
            })
            .await
            .unwrap();
        let yields = store.get_chain_yields("chain-1").await.unwrap();
        assert_eq!(yields.len(), 1);
        assert_eq!(yields[0].sack_id, "yield-1");
    }
}
