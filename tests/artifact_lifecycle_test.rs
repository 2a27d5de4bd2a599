//! Integration tests for the artifact service: site/folio CRUD, the
//! derived-state overlay, and inbox assembly over a real on-disk store.

use chrono::Utc;
use skeind::artifact::ArtifactService;
use skeind::derived::DerivedStateEngine;
use skeind::store::model::{FolioCreate, FolioPatch, SiteCreate, ThreadCreate};
use skeind::store::ObjectStore;
use tempfile::TempDir;

fn service(tmp: &TempDir) -> (ObjectStore, DerivedStateEngine) {
    (ObjectStore::new(tmp.path().join("objects")), DerivedStateEngine::new())
}

#[test]
fn folio_status_patch_is_reflected_on_every_read_path() {
    let tmp = TempDir::new().expect("tempdir");
    let (store, derived) = service(&tmp);
    let svc = ArtifactService::new(&store, &derived);
    let now = Utc::now();

    svc.create_site(
        SiteCreate { site_id: "site-a".to_string(), purpose: "testing".to_string(), metadata: Default::default() },
        "alice",
        now,
    )
    .expect("create site");

    let folio = svc
        .create_folio(
            FolioCreate {
                folio_type: "brief".to_string(),
                site_id: "site-a".to_string(),
                title: "Investigate the flaky upload test".to_string(),
                content: "Reproduce locally and bisect.".to_string(),
                metadata: Default::default(),
                assigned_to: None,
                target_agent: None,
                successor_name: None,
                omlet: None,
            },
            "alice",
            now,
        )
        .expect("create folio");
    assert_eq!(folio.status, "open");

    svc.patch_folio(
        &folio.folio_id,
        FolioPatch { title: None, content: None, status: Some("in_progress".to_string()), assigned_to: Some("bob".to_string()), archived: None },
        Some("alice"),
        now,
    )
    .expect("patch folio");

    // A fresh read through get_folio (not the patch's own return value) must
    // see the same derived status and assignment.
    let reloaded = svc.get_folio(&folio.folio_id).expect("get folio");
    assert_eq!(reloaded.status, "in_progress");
    assert_eq!(reloaded.assigned_to.as_deref(), Some("bob"));

    // list_folios must apply the same overlay.
    let listed = svc.list_folios(Some("site-a")).expect("list folios");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, "in_progress");
}

#[test]
fn create_folio_with_target_agent_and_mention_appends_sugar_threads() {
    let tmp = TempDir::new().expect("tempdir");
    let (store, derived) = service(&tmp);
    let svc = ArtifactService::new(&store, &derived);
    let now = Utc::now();

    svc.create_site(SiteCreate { site_id: "site-a".to_string(), purpose: "testing".to_string(), metadata: Default::default() }, "alice", now)
        .expect("create site");

    let folio = svc
        .create_folio(
            FolioCreate {
                folio_type: "brief".to_string(),
                site_id: "site-a".to_string(),
                title: "Hand off the auth rework".to_string(),
                content: "cc @carol, over to you".to_string(),
                metadata: Default::default(),
                assigned_to: None,
                target_agent: Some("carol".to_string()),
                successor_name: None,
                omlet: None,
            },
            "alice",
            now,
        )
        .expect("create folio");

    let inbox = svc.inbox("carol", false).expect("inbox");
    assert!(inbox.iter().any(|t| t.from_id == folio.folio_id && t.thread_type == "mention"));
    assert!(inbox.iter().any(|t| t.from_id == folio.folio_id && t.thread_type == "message"));
}

#[test]
fn create_folio_rejects_unknown_site() {
    let tmp = TempDir::new().expect("tempdir");
    let (store, derived) = service(&tmp);
    let svc = ArtifactService::new(&store, &derived);
    let now = Utc::now();

    let result = svc.create_folio(
        FolioCreate {
            folio_type: "brief".to_string(),
            site_id: "no-such-site".to_string(),
            title: "Some title long enough to pass validation".to_string(),
            content: "body".to_string(),
            metadata: Default::default(),
            assigned_to: None,
            target_agent: None,
            successor_name: None,
            omlet: None,
        },
        "alice",
        now,
    );
    assert!(matches!(result, Err(skeind::error::ApiError::SiteNotFound { .. })));
}

#[test]
fn create_thread_invalidates_derived_state() {
    let tmp = TempDir::new().expect("tempdir");
    let (store, derived) = service(&tmp);
    let svc = ArtifactService::new(&store, &derived);
    let now = Utc::now();

    svc.create_site(SiteCreate { site_id: "site-a".to_string(), purpose: "testing".to_string(), metadata: Default::default() }, "alice", now)
        .expect("create site");
    let folio = svc
        .create_folio(
            FolioCreate {
                folio_type: "brief".to_string(),
                site_id: "site-a".to_string(),
                title: "A folio worth tracking status on".to_string(),
                content: "body".to_string(),
                metadata: Default::default(),
                assigned_to: None,
                target_agent: None,
                successor_name: None,
                omlet: None,
            },
            "alice",
            now,
        )
        .expect("create folio");

    svc.create_thread(
        ThreadCreate { from_id: folio.folio_id.clone(), to_id: folio.folio_id.clone(), thread_type: "status".to_string(), content: Some("blocked".to_string()), weaver: Some("bob".to_string()) },
        Some("bob"),
        now,
    )
    .expect("create thread");

    let reloaded = svc.get_folio(&folio.folio_id).expect("get folio");
    assert_eq!(reloaded.status, "blocked");
}
