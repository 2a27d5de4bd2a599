// SPDX-License-Identifier: MIT
//! Identity and time utilities: id generation, mention extraction, relative
//! time parsing, content hashing, and memorable-name generation.

pub mod words;

use std::collections::HashSet;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use rand::Rng as _;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

// ─── Identifier generation ───────────────────────────────────────────────────

fn random_alnum4() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..4)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// `<prefix>-YYYYMMDD-<4 lowercase-alnum>` — the folio/thread/yield id family.
fn generate_dated_id(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}-{}", prefix, now.format("%Y%m%d"), random_alnum4())
}

pub fn generate_folio_id(folio_type: &str, now: DateTime<Utc>) -> String {
    generate_dated_id(folio_type, now)
}

pub fn generate_thread_id(now: DateTime<Utc>) -> String {
    generate_dated_id("thread", now)
}

pub fn generate_yield_id(now: DateTime<Utc>) -> String {
    generate_dated_id("yield", now)
}

// ─── Mention extraction ──────────────────────────────────────────────────────

static MENTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([a-z0-9][a-z0-9-]*-[a-z0-9-]*)").unwrap());

/// Extract `@`-mentions from folio content.
///
/// The content is lowercased before matching. A mention must contain at
/// least one hyphen — this excludes bare `@word` handles that aren't shaped
/// like a SKEIN resource identifier (agent ids, folio ids, and thread ids
/// all contain at least one hyphen).
pub fn parse_mentions(content: &str) -> Vec<String> {
    let lowered = content.to_lowercase();
    let mut seen = HashSet::new();
    let mut mentions = Vec::new();
    for cap in MENTION_PATTERN.captures_iter(&lowered) {
        let m = cap[1].trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
        if m.contains('-') && seen.insert(m.to_string()) {
            mentions.push(m.to_string());
        }
    }
    mentions
}

// ─── Relative-time parsing ────────────────────────────────────────────

static RELATIVE_TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(day|hour|min|minute)s?$").unwrap());

/// Parse a time filter: either an ISO-8601 timestamp (naive timestamps are
/// coerced to UTC) or a relative duration like `2hours`, `7days`, `30min`.
pub fn parse_relative_time(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Some(caps) = RELATIVE_TIME_PATTERN.captures(input) {
        let amount: i64 = caps[1].parse().context("relative time amount overflow")?;
        let unit = &caps[2];
        let duration = match unit {
            "day" => chrono::Duration::days(amount),
            "hour" => chrono::Duration::hours(amount),
            "min" | "minute" => chrono::Duration::minutes(amount),
            _ => unreachable!(),
        };
        return Ok(now - duration);
    }

    bail!(
        "invalid time filter '{input}': expected ISO-8601 or a relative form like '2hours', '7days', '30min'"
    )
}

/// Coerce a possibly timezone-naive timestamp to UTC.
pub fn normalize_datetime(naive_or_aware: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(naive_or_aware) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(naive_or_aware, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(naive_or_aware, "%Y-%m-%dT%H:%M:%S"))
        .context("unparseable timestamp")?;
    Ok(Utc.from_utc_datetime(&naive))
}

// ─── Content hashing ──────────────────────────────────────────────────

/// SHA-256 over a folio's immutable fields, hex-encoded.
pub fn content_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\0");
    }
    format!("{:x}", hasher.finalize())
}

// ─── Memorable name generation ────────────────────────────────────────

#[derive(Serialize)]
struct GeneratorRequest<'a> {
    project: &'a str,
    role: &'a str,
    timestamp: String,
    brief_content: &'a str,
}

/// Assign a name for a newly-ignited agent.
///
/// Tries the pluggable external generator first (if configured), then falls
/// back to the default adjective-noun-MMDD generator.
pub fn generate_agent_name(
    project: &str,
    role: &str,
    brief_content: &str,
    existing_names: &HashSet<String>,
    generator_path: Option<&std::path::Path>,
    timeout: Duration,
    now: DateTime<Utc>,
) -> String {
    if let Some(path) = generator_path {
        if let Some(candidate) = run_custom_generator(path, project, role, brief_content, now, timeout) {
            return ensure_unique_by_suffix(&candidate, existing_names);
        }
    }
    generate_default_name(existing_names, now)
}

fn run_custom_generator(
    path: &std::path::Path,
    project: &str,
    role: &str,
    brief_content: &str,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Option<String> {
    use std::io::Write as _;

    let request = GeneratorRequest {
        project,
        role,
        timestamp: now.to_rfc3339(),
        brief_content,
    };
    let payload = serde_json::to_vec(&request).ok()?;

    let mut child = std::process::Command::new(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(&payload).ok()?;
    }

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let result = child.wait_with_output();
        let _ = tx.send(result);
    });

    let output = rx.recv_timeout(timeout).ok()?.ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first_line = stdout.lines().next()?.trim();
    if first_line.is_empty() {
        return None;
    }
    Some(first_line.to_string())
}

/// Custom-generator names are disambiguated with an incrementing suffix
/// (`-2`, `-3`, ...) for up to 99 attempts, then a random fallback — distinct
/// from the default generator's redraw-new-words strategy.
fn ensure_unique_by_suffix(candidate: &str, existing_names: &HashSet<String>) -> String {
    if !existing_names.contains(candidate) {
        return candidate.to_string();
    }
    for attempt in 2..=99 {
        let suffixed = format!("{candidate}-{attempt}");
        if !existing_names.contains(&suffixed) {
            return suffixed;
        }
    }
    format!("{candidate}-{}", random_alnum4())
}

fn generate_default_name(existing_names: &HashSet<String>, now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let date = now.format("%m%d").to_string();

    for _ in 0..10 {
        let adjective = words::ADJECTIVES[rng.gen_range(0..words::ADJECTIVES.len())];
        let noun = words::NOUNS[rng.gen_range(0..words::NOUNS.len())];
        let candidate = format!("{adjective}-{noun}-{date}");
        if !existing_names.contains(&candidate) {
            return candidate;
        }
    }

    let adjective = words::ADJECTIVES[rng.gen_range(0..words::ADJECTIVES.len())];
    let noun = words::NOUNS[rng.gen_range(0..words::NOUNS.len())];
    format!("{adjective}-{noun}-{date}-{}", random_alnum4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap()
    }

    #[test]
    fn folio_id_matches_expected_shape() {
        let id = generate_folio_id("issue", fixed_now());
        assert!(id.starts_with("issue-20260727-"));
        assert_eq!(id.len(), "issue-20260727-".len() + 4);
    }

    #[test]
    fn thread_id_has_thread_prefix() {
        let id = generate_thread_id(fixed_now());
        assert!(id.starts_with("thread-20260727-"));
    }

    #[test]
    fn mention_extraction_requires_hyphen() {
        let mentions = parse_mentions("See @issue-20240101-abcd per @agent-007. Also @nobody and @me.");
        assert_eq!(mentions, vec!["issue-20240101-abcd", "agent-007"]);
    }

    #[test]
    fn mention_extraction_dedupes() {
        let mentions = parse_mentions("ping @agent-1 and again @agent-1");
        assert_eq!(mentions, vec!["agent-1"]);
    }

    #[test]
    fn relative_time_parses_days_hours_minutes() {
        let now = fixed_now();
        assert_eq!(parse_relative_time("2days", now).unwrap(), now - chrono::Duration::days(2));
        assert_eq!(parse_relative_time("3hours", now).unwrap(), now - chrono::Duration::hours(3));
        assert_eq!(parse_relative_time("30min", now).unwrap(), now - chrono::Duration::minutes(30));
        assert_eq!(parse_relative_time("5minutes", now).unwrap(), now - chrono::Duration::minutes(5));
    }

    #[test]
    fn relative_time_rejects_garbage() {
        assert!(parse_relative_time("next tuesday", fixed_now()).is_err());
    }

    #[test]
    fn relative_time_accepts_iso8601() {
        let now = fixed_now();
        let parsed = parse_relative_time("2026-07-20T00:00:00Z", now).unwrap();
        assert_eq!(parsed.format("%Y-%m-%d").to_string(), "2026-07-20");
    }

    #[test]
    fn content_hash_is_deterministic_and_order_sensitive() {
        let a = content_hash(&["issue-1", "issue", "title"]);
        let b = content_hash(&["issue-1", "issue", "title"]);
        let c = content_hash(&["issue", "issue-1", "title"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn default_name_generation_is_well_formed() {
        let existing = HashSet::new();
        let name = generate_default_name(&existing, fixed_now());
        let parts: Vec<&str> = name.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], "0727");
    }

    #[test]
    fn default_name_generation_avoids_collisions() {
        // Force a collision by pre-seeding the one adjective-noun-date combo
        // and confirming the generator still returns *some* unique name.
        let mut existing = HashSet::new();
        for _ in 0..5 {
            let n = generate_default_name(&existing, fixed_now());
            assert!(!existing.contains(&n));
            existing.insert(n);
        }
    }

    #[test]
    fn custom_generator_suffix_disambiguation() {
        let mut existing = HashSet::new();
        existing.insert("river-otter-0727".to_string());
        let name = ensure_unique_by_suffix("river-otter-0727", &existing);
        assert_eq!(name, "river-otter-0727-2");
    }
}
