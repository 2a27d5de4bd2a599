// SPDX-License-Identifier: MIT
//! Title cleaning and validation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ApiError;

const GENERIC_TITLES: &[&str] = &[
    "handoff",
    "handoff brief",
    "brief",
    "untitled",
    "test",
    "title",
    "issue",
    "friction",
    "finding",
    "notion",
    "summary",
    "tender",
    "writ",
    "new folio",
    "folio",
    "update",
    "fix",
    "change",
    "todo",
    "task",
];

static MARKDOWN_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#+\s*").unwrap());
static BOLD_STAR_WRAPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*\*(.+?)\*\*").unwrap());
static BOLD_UNDERSCORE_WRAPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^__(.+?)__").unwrap());
static STATUS_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\*\*)?Status:(?:\*\*)?\s*\S+\.?\s*").unwrap());
static TYPE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(tender|brief|issue|finding|friction|notion|summary|writ|playbook|mantle|plan):\s*")
        .unwrap()
});
static SHARD_PREFIX_HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-f0-9]{8}-\d{8}-\d{3,6}:\s*").unwrap());
static SHARD_PREFIX_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z]+-\d{4}-\d{8}-\d{3}:\s*").unwrap());

/// Applies the title-cleaning pipeline below. Returns the cleaned
/// title, which may be empty (callers reject empty titles separately).
pub fn clean_title(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let mut t = raw.trim().to_string();
    t = MARKDOWN_HEADER.replace(&t, "").into_owned();

    t = BOLD_STAR_WRAPPER.replace(&t, "$1").into_owned();
    t = BOLD_UNDERSCORE_WRAPPER.replace(&t, "$1").into_owned();
    t = t.trim().to_string();

    t = STATUS_MARKER.replace_all(&t, "").trim().to_string();
    t = TYPE_PREFIX.replace(&t, "").into_owned();

    t = SHARD_PREFIX_HEX
        .replace(&t, "")
        .to_string();
    t = SHARD_PREFIX_WORD.replace(&t, "").into_owned();

    t = TYPE_PREFIX.replace(&t, "").into_owned();

    t.trim().to_string()
}

fn example_for(folio_type: &str) -> &'static str {
    match folio_type {
        "issue" => "DB connection pool exhausted under load",
        "friction" => "Deploy script silently swallows migration failures",
        "brief" => "Rate-limit the public search endpoint before launch",
        "summary" => "Week 3 sprint: auth rewrite landed, two regressions found",
        "finding" => "Cache eviction thrashes when working set exceeds 2x capacity",
        "notion" => "Consider a write-ahead log for the folio store",
        "tender" => "Please review the shard-merge precondition changes",
        "playbook" => "Runbook: recovering from a corrupted shard metadata db",
        "mantle" => "Shared conventions for folio title formatting",
        "plan" => "Migrate log storage to a dedicated SQLite file per project",
        "writ" => "Decision: derived state is authoritative over stored fields",
        _ => "A specific, descriptive title of at least ten characters",
    }
}

/// Cleans and validates `raw`, returning the (possibly truncated) final
/// title or a `TitleInvalid` error carrying a type-specific example.
pub fn validate_title(raw: &str, folio_type: &str) -> Result<String, ApiError> {
    let cleaned = clean_title(raw);
    let example = example_for(folio_type).to_string();

    if cleaned.is_empty() {
        return Err(ApiError::TitleInvalid {
            reason: "title is empty after cleaning".to_string(),
            example,
        });
    }
    if GENERIC_TITLES.contains(&cleaned.to_lowercase().as_str()) {
        return Err(ApiError::TitleInvalid {
            reason: format!("'{cleaned}' is too generic to be useful"),
            example,
        });
    }
    if cleaned.chars().count() < 10 {
        return Err(ApiError::TitleInvalid {
            reason: format!("title '{cleaned}' is shorter than 10 characters"),
            example,
        });
    }

    if cleaned.chars().count() > 100 {
        let truncated: String = cleaned.chars().take(97).collect();
        return Ok(format!("{truncated}..."));
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent_on_already_clean_title() {
        let once = clean_title("DB connection pool exhausted");
        let twice = clean_title(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn strips_markdown_header_and_bold_wrapper() {
        assert_eq!(
            clean_title("# **DB connection pool exhausted**"),
            "DB connection pool exhausted"
        );
    }

    #[test]
    fn strips_leading_bold_wrapper_with_trailing_content() {
        assert_eq!(
            clean_title("**Fix the pool** please review soon"),
            "Fix the pool please review soon"
        );
    }

    #[test]
    fn strips_status_marker_anywhere() {
        assert_eq!(
            clean_title("DB pool exhausted **Status:** investigating."),
            "DB pool exhausted"
        );
    }

    #[test]
    fn strips_type_prefix() {
        assert_eq!(
            clean_title("tender: please review the merge preconditions"),
            "please review the merge preconditions"
        );
    }

    #[test]
    fn strips_shard_hex_prefix_then_uncovered_type_prefix() {
        assert_eq!(
            clean_title("a1b2c3d4-20260727-001: issue: pool exhausted under load"),
            "pool exhausted under load"
        );
    }

    #[test]
    fn strips_shard_word_prefix() {
        assert_eq!(
            clean_title("swift-fox-20260727-001: pool exhausted under load"),
            "pool exhausted under load"
        );
    }

    #[test]
    fn rejects_empty_title() {
        assert!(validate_title("   ", "issue").is_err());
    }

    #[test]
    fn rejects_generic_titles_including_bare_type_names() {
        assert!(validate_title("writ", "writ").is_err());
        assert!(validate_title("Untitled", "issue").is_err());
    }

    #[test]
    fn rejects_titles_under_ten_chars() {
        assert!(validate_title("short", "issue").is_err());
        assert!(validate_title("just right!", "issue").is_ok());
    }

    #[test]
    fn truncates_titles_over_hundred_chars() {
        let long = "x".repeat(150);
        let result = validate_title(&long, "issue").unwrap();
        assert_eq!(result.chars().count(), 100);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn boundary_nine_vs_ten_characters() {
        assert!(validate_title("123456789", "issue").is_err());
        assert!(validate_title("1234567890", "issue").is_ok());
    }
}
