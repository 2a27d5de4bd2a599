// SPDX-License-Identifier: MIT
pub mod artifact;
pub mod config;
pub mod derived;
pub mod error;
pub mod identity;
pub mod logstore;
pub mod registry;
pub mod rest;
pub mod security;
pub mod shard;
pub mod store;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use config::SkeinConfig;
use derived::DerivedStateEngine;
use error::ApiError;
use logstore::LogStore;
use registry::ProjectRegistry;
use shard::ShardSubsystem;
use store::ObjectStore;

/// Per-project bundle of services, built lazily on first use and cached for
/// the life of the process; there is no global lock above a single request.
pub struct ProjectServices {
    pub store: ObjectStore,
    pub derived: DerivedStateEngine,
    pub logs: LogStore,
    pub shards: ShardSubsystem,
}

/// Shared application state passed to every HTTP handler.
pub struct AppContext {
    pub config: Arc<SkeinConfig>,
    pub registry: Arc<ProjectRegistry>,
    pub started_at: Instant,
    projects: RwLock<HashMap<String, Arc<ProjectServices>>>,
}

impl AppContext {
    pub fn new(config: SkeinConfig) -> Self {
        let registry = Arc::new(ProjectRegistry::new(config.registry_path.clone()));
        Self {
            config: Arc::new(config),
            registry,
            started_at: Instant::now(),
            projects: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve (and lazily construct) the service bundle for a project.
    ///
    /// `data_dir` (from the project registry) holds the roster/sites/threads
    /// object store and `skein.db`. The shard subsystem instead needs a
    /// source-tree root, which defaults to `data_dir` but can be overridden
    /// with `SKEIN_PROJECT_ROOT` (useful when the data directory and the git
    /// checkout it tracks live in different places).
    pub async fn project(&self, project_id: &str) -> Result<Arc<ProjectServices>, ApiError> {
        if let Some(existing) = self.projects.read().await.get(project_id) {
            return Ok(Arc::clone(existing));
        }

        let data_dir = self.registry.resolve(project_id)?;
        let project_root: PathBuf = std::env::var("SKEIN_PROJECT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.clone());

        let store = ObjectStore::new(data_dir.join("objects"));
        let derived = DerivedStateEngine::new();
        let logs = LogStore::new(&data_dir).await.map_err(ApiError::Internal)?;
        let shards = ShardSubsystem::new(project_root, self.config.stale_days as i64)
            .await
            .map_err(ApiError::Internal)?;

        let services = Arc::new(ProjectServices { store, derived, logs, shards });
        self.projects.write().await.insert(project_id.to_string(), Arc::clone(&services));
        Ok(services)
    }
}
