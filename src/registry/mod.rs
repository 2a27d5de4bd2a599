// SPDX-License-Identifier: MIT
//! Project registry — resolves a project identifier to its data directory.
//!
//! Reads/writes a JSON file shaped `{"projects": {"<id>": {"data_dir": "<path>"}}}`,
//! read fresh on every resolve; there is no caching beyond the request.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectEntry {
    data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct RegistryFile {
    #[serde(default)]
    projects: HashMap<String, ProjectEntry>,
}

/// Resolves project identifiers against the registry file on disk.
pub struct ProjectRegistry {
    path: PathBuf,
}

impl ProjectRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> Result<RegistryFile> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                serde_json::from_str(&contents).context("malformed project registry file")
            }
            // A missing registry file is an empty registry, not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RegistryFile::default()),
            Err(e) => Err(e).context("failed to read project registry file"),
        }
    }

    fn write(&self, file: &RegistryFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(file)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Resolve a project identifier to its data directory.
    pub fn resolve(&self, project_id: &str) -> Result<PathBuf, ApiError> {
        let file = self
            .read()
            .map_err(ApiError::Internal)?;
        file.projects
            .get(project_id)
            .map(|e| e.data_dir.clone())
            .ok_or_else(|| ApiError::ProjectNotFound(project_id.to_string()))
    }

    /// Register (or update) a project's data directory.
    pub fn register(&self, project_id: &str, data_dir: &Path) -> Result<()> {
        let mut file = self.read()?;
        file.projects.insert(
            project_id.to_string(),
            ProjectEntry {
                data_dir: data_dir.to_path_buf(),
            },
        );
        self.write(&file)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self.read()?.projects.into_keys().collect())
    }
}
