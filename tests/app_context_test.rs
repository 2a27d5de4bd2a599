//! Integration tests for `AppContext`'s lazy per-project service construction
//! and the project registry it sits on top of.

use skeind::config::SkeinConfig;
use skeind::registry::ProjectRegistry;
use skeind::AppContext;
use tempfile::TempDir;

fn test_config(tmp: &TempDir) -> SkeinConfig {
    SkeinConfig::load(Some(0), None, Some("error".to_string()), Some(tmp.path().join("config.toml")), Some(tmp.path().join("projects.json")))
}

#[tokio::test]
async fn unresolved_project_surfaces_project_not_found() {
    let tmp = TempDir::new().expect("tempdir");
    let ctx = AppContext::new(test_config(&tmp));

    let err = ctx.project("ghost-project").await.unwrap_err();
    assert!(matches!(err, skeind::error::ApiError::ProjectNotFound(id) if id == "ghost-project"));
}

#[tokio::test]
async fn project_services_are_constructed_once_and_cached() {
    let tmp = TempDir::new().expect("tempdir");
    let config = test_config(&tmp);
    let registry = ProjectRegistry::new(config.registry_path.clone());
    let data_dir = tmp.path().join("acme-data");
    registry.register("acme", &data_dir).expect("register project");

    let ctx = AppContext::new(config);

    let first = ctx.project("acme").await.expect("resolve project");
    let second = ctx.project("acme").await.expect("resolve project again");

    // Same cached bundle, not a fresh construction — Arc::ptr_eq proves reuse.
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    // The shard subsystem initializes its own metadata database under the
    // resolved project root (data_dir, absent a SKEIN_PROJECT_ROOT override).
    assert!(data_dir.join(".skein").join("shards.db").exists());
}
