// SPDX-License-Identifier: MIT
//! Shard name validation and worktree-name sequence bookkeeping.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ApiError;

const RESERVED: &[&str] = [
    "head", "master", "main", "refs", "objects", "hooks", "info", "logs", "worktrees",
]
.as_slice();

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap());
static WORKTREE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<name>.+)-(?P<date>\d{8})-(?P<seq>\d{3})$").unwrap());

/// Validates a proposed shard name against the reserved-name and pattern rules below.
pub fn validate_shard_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.trim().is_empty() {
        return Err(ApiError::ValidationError("shard name must not be empty".to_string()));
    }
    if name.chars().count() > 63 {
        return Err(ApiError::ValidationError("shard name must be 63 characters or fewer".to_string()));
    }
    if name.starts_with('.') || name.starts_with('-') {
        return Err(ApiError::ValidationError(
            "shard name must not start with '.' or '-'".to_string(),
        ));
    }
    if name.ends_with(".lock") {
        return Err(ApiError::ValidationError("shard name must not end with '.lock'".to_string()));
    }
    if name.contains("..") || name.contains("@{") {
        return Err(ApiError::ValidationError(
            "shard name must not contain '..' or '@{'".to_string(),
        ));
    }
    if RESERVED.contains(&name.to_lowercase().as_str()) {
        return Err(ApiError::ValidationError(format!(
            "'{name}' is reserved and cannot be used as a shard name"
        )));
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(ApiError::ValidationError(
            "shard name must match ^[A-Za-z0-9][A-Za-z0-9_-]*$".to_string(),
        ));
    }
    Ok(())
}

/// The branch a shard worktree is created on.
pub fn branch_name(worktree_name: &str) -> String {
    format!("shard-{worktree_name}")
}

/// The caller-facing shard identifier.
pub fn shard_id(worktree_name: &str) -> String {
    format!("shard-{worktree_name}")
}

#[derive(Debug, Clone)]
pub struct ParsedWorktreeName {
    pub base_name: String,
    pub date: NaiveDate,
    pub sequence: u32,
    pub is_graft: bool,
}

/// Parses `<name>-YYYYMMDD-NNN[-graft]`, tolerating a trailing graft suffix.
pub fn parse_worktree_name(worktree_name: &str) -> Option<ParsedWorktreeName> {
    let (stem, is_graft) = match worktree_name.strip_suffix("-graft") {
        Some(s) => (s, true),
        None => (worktree_name, false),
    };
    let caps = WORKTREE_NAME_PATTERN.captures(stem)?;
    let date = NaiveDate::parse_from_str(&caps["date"], "%Y%m%d").ok()?;
    let sequence: u32 = caps["seq"].parse().ok()?;
    Some(ParsedWorktreeName {
        base_name: caps["name"].to_string(),
        date,
        sequence,
        is_graft,
    })
}

/// Picks the next sequence number in [1, 999] for `name` on `date`, given the
/// sequence numbers already present among sibling worktree directory names.
/// Out-of-range directories (000, or > 999) are ignored.
pub fn next_sequence(existing_sequences: &[u32]) -> Result<u32, ApiError> {
    let max_in_range = existing_sequences
        .iter()
        .copied()
        .filter(|&s| (1..=999).contains(&s))
        .max()
        .unwrap_or(0);
    if max_in_range >= 999 {
        return Err(ApiError::Precondition {
            message: "shard sequence for today is exhausted (999 reached)".to_string(),
            conflicts: Vec::new(),
        });
    }
    Ok(max_in_range + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reserved_names_case_insensitively() {
        assert!(validate_shard_name("Main").is_err());
        assert!(validate_shard_name("WORKTREES").is_err());
    }

    #[test]
    fn rejects_dotfiles_and_dotdot() {
        assert!(validate_shard_name(".hidden").is_err());
        assert!(validate_shard_name("fix..bug").is_err());
        assert!(validate_shard_name("-leading-dash").is_err());
    }

    #[test]
    fn accepts_ordinary_names() {
        assert!(validate_shard_name("fix-bug").is_ok());
        assert!(validate_shard_name("feature_42").is_ok());
    }

    #[test]
    fn parses_worktree_name_and_strips_graft_suffix() {
        let parsed = parse_worktree_name("fix-bug-20260727-001").unwrap();
        assert_eq!(parsed.base_name, "fix-bug");
        assert_eq!(parsed.sequence, 1);
        assert!(!parsed.is_graft);

        let grafted = parse_worktree_name("fix-bug-20260727-001-graft").unwrap();
        assert_eq!(grafted.base_name, "fix-bug");
        assert!(grafted.is_graft);
    }

    #[test]
    fn sequence_boundary_998_then_999() {
        assert_eq!(next_sequence(&[998]).unwrap(), 999);
        assert!(next_sequence(&[999]).is_err());
    }

    #[test]
    fn sequence_ignores_out_of_range_stale_entries() {
        assert_eq!(next_sequence(&[0, 1000, 5]).unwrap(), 6);
    }
}
