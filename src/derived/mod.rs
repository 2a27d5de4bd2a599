// SPDX-License-Identifier: MIT
//! Derived-state engine: computes folio status/assignment from the thread
//! log and caches the result per folio.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::store::model::{Thread, ThreadFilter};
use crate::store::ObjectStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidateKind {
    Status,
    Assignment,
}

#[derive(Default)]
struct Cache {
    status: HashMap<String, Option<String>>,
    assignment: HashMap<String, Option<String>>,
}

/// Process-scoped cache over a folio's derived status and assignment.
///
/// One `DerivedStateEngine` is shared (via `Arc`) across all requests for a
/// project; invalidation must be called synchronously by every thread-append
/// path before that append is reported to its caller as successful.
pub struct DerivedStateEngine {
    cache: RwLock<Cache>,
}

impl DerivedStateEngine {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(Cache::default()),
        }
    }

    pub fn current_status(&self, store: &ObjectStore, folio_id: &str) -> anyhow::Result<Option<String>> {
        if let Some(cached) = self.cache.read().unwrap().status.get(folio_id) {
            return Ok(cached.clone());
        }
        let threads = store.get_threads(&ThreadFilter {
            to_id: Some(folio_id.to_string()),
            thread_type: Some("status".to_string()),
            ..Default::default()
        })?;
        let value = latest(&threads).and_then(|t| t.content.clone());
        self.cache
            .write()
            .unwrap()
            .status
            .insert(folio_id.to_string(), value.clone());
        Ok(value)
    }

    pub fn current_assignment(
        &self,
        store: &ObjectStore,
        folio_id: &str,
    ) -> anyhow::Result<Option<String>> {
        if let Some(cached) = self.cache.read().unwrap().assignment.get(folio_id) {
            return Ok(cached.clone());
        }
        let threads = store.get_threads(&ThreadFilter {
            from_id: Some(folio_id.to_string()),
            thread_type: Some("assignment".to_string()),
            ..Default::default()
        })?;
        let value = latest(&threads).map(|t| t.to_id.clone());
        self.cache
            .write()
            .unwrap()
            .assignment
            .insert(folio_id.to_string(), value.clone());
        Ok(value)
    }

    /// Drops the cached value for `folio_id` so the next read recomputes it.
    pub fn invalidate(&self, kind: InvalidateKind, folio_id: &str) {
        let mut cache = self.cache.write().unwrap();
        match kind {
            InvalidateKind::Status => cache.status.remove(folio_id),
            InvalidateKind::Assignment => cache.assignment.remove(folio_id),
        };
    }
}

impl Default for DerivedStateEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn latest(threads: &[Thread]) -> Option<&Thread> {
    threads.iter().max_by_key(|t| t.created_at)
}
