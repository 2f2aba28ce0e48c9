use crate::constants::EXAMPLE_VALUE_MAX_CHARS;
use crate::types::{IssueKind, ValidationIssue};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// Base64 alphabet with up to two trailing padding characters.
static HASH_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").expect("hash format regex"));

/// Applies cardinality, format and duplicate checks to a candidate batch.
///
/// Issue ordering is fixed so callers can render consistently:
/// `Empty` (exclusive) → `TooMany` → `InvalidFormat` → `Duplicate`.
/// Findings of the same kind are merged into one issue with an aggregated
/// `affected_count` rather than repeated entries.
pub fn validate(identifiers: &[String], max_count: usize, min_length: usize) -> Vec<ValidationIssue> {
    if identifiers.is_empty() {
        return vec![ValidationIssue::new(
            IssueKind::Empty,
            "No hashes found. Please provide some hashes.",
        )];
    }

    let mut issues = Vec::new();

    if identifiers.len() > max_count {
        issues.push(
            ValidationIssue::new(
                IssueKind::TooMany,
                format!(
                    "Exceeded maximum of {max_count} hashes. Found {}.",
                    identifiers.len()
                ),
            )
            .with_count(identifiers.len()),
        );
    }

    let mut invalid_count = 0usize;
    let mut invalid_example: Option<&str> = None;
    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates: HashSet<&str> = HashSet::new();

    for hash in identifiers {
        if !is_well_formed(hash, min_length) {
            invalid_count += 1;
            invalid_example.get_or_insert(hash);
        }
        if !seen.insert(hash) {
            duplicates.insert(hash);
        }
    }

    if invalid_count > 0 {
        let example = clip(invalid_example.unwrap_or_default(), EXAMPLE_VALUE_MAX_CHARS);
        issues.push(
            ValidationIssue::new(
                IssueKind::InvalidFormat,
                format!(
                    "Hash \"{example}\" appears to have an invalid format. \
                     Hashes must be Base64 encoded and at least {min_length} characters long."
                ),
            )
            .with_count(invalid_count),
        );
    }

    if !duplicates.is_empty() {
        issues.push(
            ValidationIssue::new(
                IssueKind::Duplicate,
                format!("Found {} duplicate hash(es).", duplicates.len()),
            )
            .with_count(duplicates.len()),
        );
    }

    issues
}

fn is_well_formed(hash: &str, min_length: usize) -> bool {
    hash.len() >= min_length && HASH_FORMAT.is_match(hash)
}

fn clip(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let clipped: String = value.chars().take(max_chars).collect();
        format!("{clipped}...")
    }
}
