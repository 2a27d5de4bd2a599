//! Server configuration.
//!
//! Priority (highest to lowest): CLI flags / environment variables (via
//! `clap`'s `env` feature) > `config.toml` > built-in defaults.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::error;

const DEFAULT_PORT: u16 = 4600;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_LOG: &str = "info";
const DEFAULT_STALE_DAYS: u32 = 7;
const DEFAULT_NAME_GENERATOR_TIMEOUT_SECS: u64 = 5;
const DEFAULT_WORKTREES_DIR: &str = "worktrees";

/// `~/.skein/config.toml` — all fields are optional overrides.
#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    port: Option<u16>,
    host: Option<String>,
    log: Option<String>,
    registry_path: Option<PathBuf>,
    stale_days: Option<u32>,
    name_generator_timeout_secs: Option<u64>,
    worktrees_dir: Option<String>,
}

fn load_toml(path: &std::path::Path) -> Option<TomlConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — exiting");
            std::process::exit(1);
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkeinConfig {
    pub host: String,
    pub port: u16,
    pub log: String,
    /// Path to the project registry file (`~/.skein/projects.json` by default).
    pub registry_path: PathBuf,
    /// Review-queue staleness threshold, in days.
    pub stale_days: u32,
    /// Timeout for the pluggable name-generator subprocess.
    pub name_generator_timeout_secs: u64,
    /// Directory name under a project root that holds shard worktrees.
    pub worktrees_dir: String,
}

impl SkeinConfig {
    pub fn load(
        port: Option<u16>,
        host: Option<String>,
        log: Option<String>,
        config_path: Option<PathBuf>,
        registry_path: Option<PathBuf>,
    ) -> Self {
        let config_path = config_path.unwrap_or_else(|| config_home().join("config.toml"));
        let toml = load_toml(&config_path).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let host = host.or(toml.host).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let log = log.or(toml.log).unwrap_or_else(|| DEFAULT_LOG.to_string());
        let registry_path = registry_path
            .or(toml.registry_path)
            .unwrap_or_else(|| config_home().join("projects.json"));
        let stale_days = toml.stale_days.unwrap_or(DEFAULT_STALE_DAYS);
        let name_generator_timeout_secs = toml
            .name_generator_timeout_secs
            .unwrap_or(DEFAULT_NAME_GENERATOR_TIMEOUT_SECS);
        let worktrees_dir = toml
            .worktrees_dir
            .unwrap_or_else(|| DEFAULT_WORKTREES_DIR.to_string());

        Self {
            host,
            port,
            log,
            registry_path,
            stale_days,
            name_generator_timeout_secs,
            worktrees_dir,
        }
    }
}

/// `~/.skein` on Unix-likes, `%APPDATA%\skein` on Windows.
pub fn config_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("skein");
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".skein");
    }
    PathBuf::from(".skein")
}

/// Resolves the pluggable naming-generator script path: `naming.generator`
/// inside `./.skein/config.json`, falling back to `~/.skein/config.json`
///. A missing or malformed file is treated as "no generator
/// configured" — ignition must still succeed via the default generator.
pub fn resolve_naming_generator() -> Option<PathBuf> {
    read_naming_generator(&PathBuf::from(".skein/config.json")).or_else(|| read_naming_generator(&config_home().join("config.json")))
}

fn read_naming_generator(path: &std::path::Path) -> Option<PathBuf> {
    let contents = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&contents).ok()?;
    value.get("naming")?.get("generator")?.as_str().map(PathBuf::from)
}
