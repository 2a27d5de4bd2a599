// SPDX-License-Identifier: MIT
//! Artifact service: site/folio/thread CRUD, title validation, mention
//! expansion, inbox assembly, and unified search.

pub mod search;
pub mod title;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::derived::{DerivedStateEngine, InvalidateKind};
use crate::error::ApiError;
use crate::identity::{generate_folio_id, generate_thread_id, parse_mentions};
use crate::store::model::{Folio, FolioCreate, FolioPatch, Site, SiteCreate, Thread, ThreadCreate};
use crate::store::ObjectStore;

pub struct ArtifactService<'a> {
    pub store: &'a ObjectStore,
    pub derived: &'a DerivedStateEngine,
}

impl<'a> ArtifactService<'a> {
    pub fn new(store: &'a ObjectStore, derived: &'a DerivedStateEngine) -> Self {
        Self { store, derived }
    }

    pub fn create_site(
        &self,
        create: SiteCreate,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Site, ApiError> {
        let site = Site {
            site_id: create.site_id,
            created_at: now,
            created_by: created_by.to_string(),
            purpose: create.purpose,
            status: "active".to_string(),
            metadata: create.metadata,
        };
        self.store.save_site(&site).map_err(ApiError::Internal)?;
        Ok(site)
    }

    /// Creates a folio, validates its title, and appends the sugar threads
    /// in the order mentions → status → assignment → target-agent message
    ///. Each append is independent; a failure partway through is
    /// not rolled back.
    pub fn create_folio(
        &self,
        create: FolioCreate,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Folio, ApiError> {
        if !self.store.site_exists(&create.site_id) {
            let known_sites = self
                .store
                .get_sites()
                .unwrap_or_default()
                .into_iter()
                .filter(|s| s.status == "active")
                .take(50)
                .map(|s| s.site_id)
                .collect();
            return Err(ApiError::SiteNotFound {
                site_id: create.site_id,
                known_sites,
            });
        }

        let title = title::validate_title(&create.title, &create.folio_type)?;
        let folio_id = generate_folio_id(&create.folio_type, now);

        let initial_status = match create.metadata.get("status").and_then(Value::as_str) {
            Some(s) if s != "open" => s.to_string(),
            _ => "open".to_string(),
        };

        let folio = Folio {
            folio_id: folio_id.clone(),
            folio_type: create.folio_type,
            site_id: create.site_id,
            created_at: now,
            created_by: created_by.to_string(),
            title,
            content: create.content.clone(),
            status: initial_status.clone(),
            assigned_to: create.assigned_to.clone(),
            target_agent: create.target_agent.clone(),
            successor_name: create.successor_name,
            omlet: create.omlet,
            archived: false,
            metadata: create.metadata.clone(),
            acknowledged_at: None,
            content_hash: None,
        };
        let folio = self.store.save_folio(folio).map_err(ApiError::Internal)?;

        for mentioned in parse_mentions(&create.content) {
            self.append_thread_best_effort(&folio.folio_id, &mentioned, "mention", None, created_by, now);
        }

        if initial_status != "open" {
            self.append_thread_best_effort(
                &folio.folio_id,
                &folio.folio_id,
                "status",
                Some(initial_status.as_str()),
                created_by,
                now,
            );
        }

        if let Some(assigned_to) = &create.assigned_to {
            self.append_thread_best_effort(&folio.folio_id, assigned_to, "assignment", None, created_by, now);
        }

        if let Some(target_agent) = &create.target_agent {
            self.append_thread_best_effort(
                &folio.folio_id,
                target_agent,
                "message",
                Some(create.content.as_str()),
                created_by,
                now,
            );
        }

        Ok(folio)
    }

    fn append_thread_best_effort(
        &self,
        from_id: &str,
        to_id: &str,
        thread_type: &str,
        content: Option<&str>,
        weaver: &str,
        now: DateTime<Utc>,
    ) {
        let thread = Thread {
            thread_id: generate_thread_id(now),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            thread_type: thread_type.to_string(),
            content: content.map(str::to_string),
            weaver: Some(weaver.to_string()),
            created_at: now,
            read_at: None,
        };
        if let Err(e) = self.store.save_thread(&thread) {
            tracing::error!(err = %e, thread_type, "sugar thread append failed");
            return;
        }
        match thread_type {
            "status" => self.derived.invalidate(InvalidateKind::Status, from_id),
            "assignment" => self.derived.invalidate(InvalidateKind::Assignment, from_id),
            _ => {}
        }
    }

    /// Overlays a folio's derived status/assigned-to onto its stored record
    /// These fields are computed, never authoritative on disk.
    fn with_derived(&self, mut folio: Folio) -> Result<Folio, ApiError> {
        if let Some(status) = self.derived.current_status(self.store, &folio.folio_id).map_err(ApiError::Internal)? {
            folio.status = status;
        }
        if let Some(assigned_to) = self.derived.current_assignment(self.store, &folio.folio_id).map_err(ApiError::Internal)? {
            folio.assigned_to = Some(assigned_to);
        }
        Ok(folio)
    }

    pub fn get_folio(&self, folio_id: &str) -> Result<Folio, ApiError> {
        self.with_derived(self.store.get_folio(folio_id)?)
    }

    pub fn list_folios(&self, site_id: Option<&str>) -> Result<Vec<Folio>, ApiError> {
        self.store
            .get_folios(site_id)
            .map_err(ApiError::Internal)?
            .into_iter()
            .map(|f| self.with_derived(f))
            .collect()
    }

    pub fn create_thread(&self, create: ThreadCreate, weaver: Option<&str>, now: DateTime<Utc>) -> Result<Thread, ApiError> {
        let thread = Thread {
            thread_id: generate_thread_id(now),
            from_id: create.from_id.clone(),
            to_id: create.to_id.clone(),
            thread_type: create.thread_type.clone(),
            content: create.content,
            weaver: create.weaver.or_else(|| weaver.map(str::to_string)),
            created_at: now,
            read_at: None,
        };
        self.store.save_thread(&thread).map_err(ApiError::Internal)?;
        match thread.thread_type.as_str() {
            "status" => self.derived.invalidate(InvalidateKind::Status, &thread.to_id),
            "assignment" => self.derived.invalidate(InvalidateKind::Assignment, &thread.from_id),
            _ => {}
        }
        Ok(thread)
    }

    /// Applies a folio patch: title/content/archived update the
    /// record directly; status/assigned_to instead append a thread and let
    /// the derived-state engine own the authoritative value.
    pub fn patch_folio(
        &self,
        folio_id: &str,
        patch: FolioPatch,
        weaver: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Folio, ApiError> {
        let status = patch.status.clone();
        let assigned_to = patch.assigned_to.clone();

        let record_patch = FolioPatch {
            title: patch.title,
            content: patch.content,
            archived: patch.archived,
            status: None,
            assigned_to: None,
        };
        let mut folio = if record_patch.title.is_some()
            || record_patch.content.is_some()
            || record_patch.archived.is_some()
        {
            self.store.patch_folio(folio_id, record_patch)?
        } else {
            self.store.get_folio(folio_id)?
        };

        if let Some(status) = status {
            self.append_thread_best_effort(folio_id, folio_id, "status", Some(status.as_str()), weaver.unwrap_or("system"), now);
            folio.status = self
                .derived
                .current_status(self.store, folio_id)
                .map_err(ApiError::Internal)?
                .unwrap_or(folio.status);
        }
        if let Some(assigned_to) = assigned_to {
            self.append_thread_best_effort(folio_id, &assigned_to, "assignment", None, weaver.unwrap_or("system"), now);
            folio.assigned_to = self
                .derived
                .current_assignment(self.store, folio_id)
                .map_err(ApiError::Internal)?
                .or(folio.assigned_to);
        }

        Ok(folio)
    }

    pub fn inbox(&self, agent_id: &str, unread_only: bool) -> Result<Vec<Thread>, ApiError> {
        self.store.get_inbox(agent_id, unread_only).map_err(ApiError::Internal)
    }

    pub fn mark_thread_read(&self, thread_id: &str, now: DateTime<Utc>) -> Result<Thread, ApiError> {
        self.store.mark_thread_read(thread_id, now)
    }

    /// Last 10 folios by recency, favoring distinct creators.
    pub fn recent_activity(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Folio>, ApiError> {
        let mut folios = self.store.get_folios(None).map_err(ApiError::Internal)?;
        if let Some(since) = since {
            folios.retain(|f| f.created_at >= since);
        }
        folios.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut seen_creators: HashMap<String, usize> = HashMap::new();
        let mut ordered = Vec::new();
        let mut overflow = Vec::new();
        for folio in folios {
            let count = seen_creators.entry(folio.created_by.clone()).or_insert(0);
            if *count == 0 {
                *count += 1;
                ordered.push(folio);
            } else {
                *count += 1;
                overflow.push(folio);
            }
            if ordered.len() >= 10 {
                break;
            }
        }
        ordered.extend(overflow);
        ordered.truncate(10);
        ordered.into_iter().map(|f| self.with_derived(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::model::SiteCreate;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap()
    }

    fn fixture() -> (tempfile::TempDir, ObjectStore, DerivedStateEngine) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path().to_path_buf());
        (dir, store, DerivedStateEngine::new())
    }

    #[test]
    fn create_folio_rejects_missing_site() {
        let (_dir, store, derived) = fixture();
        let service = ArtifactService::new(&store, &derived);
        let err = service
            .create_folio(
                FolioCreate {
                    folio_type: "issue".to_string(),
                    site_id: "ops".to_string(),
                    title: "DB connection pool exhausted".to_string(),
                    content: "30s timeouts".to_string(),
                    metadata: HashMap::new(),
                    assigned_to: None,
                    target_agent: None,
                    successor_name: None,
                    omlet: None,
                },
                "alice",
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::SiteNotFound { .. }));
    }

    #[test]
    fn create_folio_expands_mentions_in_order() {
        let (_dir, store, derived) = fixture();
        let service = ArtifactService::new(&store, &derived);
        service
            .create_site(
                SiteCreate { site_id: "ops".to_string(), purpose: "ops".to_string(), metadata: HashMap::new() },
                "alice",
                now(),
            )
            .unwrap();

        let folio = service
            .create_folio(
                FolioCreate {
                    folio_type: "issue".to_string(),
                    site_id: "ops".to_string(),
                    title: "DB connection pool exhausted".to_string(),
                    content: "See @issue-20240101-abcd per @agent-007.".to_string(),
                    metadata: HashMap::new(),
                    assigned_to: None,
                    target_agent: None,
                    successor_name: None,
                    omlet: None,
                },
                "alice",
                now(),
            )
            .unwrap();

        let threads = store
            .get_threads(&crate::store::model::ThreadFilter {
                from_id: Some(folio.folio_id.clone()),
                thread_type: Some("mention".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(threads.len(), 2);
    }

    #[test]
    fn create_folio_appends_assignment_sugar() {
        let (_dir, store, derived) = fixture();
        let service = ArtifactService::new(&store, &derived);
        service
            .create_site(
                SiteCreate { site_id: "ops".to_string(), purpose: "ops".to_string(), metadata: HashMap::new() },
                "alice",
                now(),
            )
            .unwrap();

        let folio = service
            .create_folio(
                FolioCreate {
                    folio_type: "brief".to_string(),
                    site_id: "ops".to_string(),
                    title: "Rate-limit the public search endpoint".to_string(),
                    content: "no mentions here".to_string(),
                    metadata: HashMap::new(),
                    assigned_to: Some("bob".to_string()),
                    target_agent: None,
                    successor_name: None,
                    omlet: None,
                },
                "alice",
                now(),
            )
            .unwrap();

        assert_eq!(
            derived.current_assignment(&store, &folio.folio_id).unwrap(),
            Some("bob".to_string())
        );
    }

    #[test]
    fn patch_status_updates_derived_state() {
        let (_dir, store, derived) = fixture();
        let service = ArtifactService::new(&store, &derived);
        service
            .create_site(
                SiteCreate { site_id: "ops".to_string(), purpose: "ops".to_string(), metadata: HashMap::new() },
                "alice",
                now(),
            )
            .unwrap();
        let folio = service
            .create_folio(
                FolioCreate {
                    folio_type: "issue".to_string(),
                    site_id: "ops".to_string(),
                    title: "DB connection pool exhausted".to_string(),
                    content: "30s timeouts".to_string(),
                    metadata: HashMap::new(),
                    assigned_to: None,
                    target_agent: None,
                    successor_name: None,
                    omlet: None,
                },
                "alice",
                now(),
            )
            .unwrap();

        let updated = service
            .patch_folio(
                &folio.folio_id,
                FolioPatch { status: Some("investigating".to_string()), ..Default::default() },
                Some("alice"),
                now(),
            )
            .unwrap();
        assert_eq!(updated.status, "investigating");
    }
}
