//! Hostname to pattern matching.
//!
//! Exact keys always win. Otherwise the wildcard/suffix pattern with the
//! longest suffix that ends on a label boundary is chosen, so `*.owndomain`
//! matches `a.owndomain` and `owndomain` but never `notowndomain`.

use crate::table::{DomainTable, is_pattern, wildcard_suffix};
use crate::util::normalize_name;

/// How a [`MatchResult`] was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The hostname is a key of the table.
    Exact,
    /// The hostname falls under a `*.suffix` or `.suffix` key.
    Wildcard,
}

/// The table entry selected for a hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// The matching table key.
    pub pattern: String,
    /// The key's target (gateway endpoint or address).
    pub target: String,
    /// Exact or wildcard.
    pub kind: MatchKind,
}

/// Returns the most specific entry of `table` matching `hostname`.
///
/// Hostnames containing `*` are patterns, not names, and never match.
///
/// Pure and deterministic: ties between equally long suffixes (`*.s` and
/// `.s`) resolve to the key that sorts first.
#[must_use]
pub fn find_match(hostname: &str, table: &DomainTable) -> Option<MatchResult> {
    let host = normalize_name(hostname);
    let host = host.as_ref();
    if host.is_empty() || host.contains('*') {
        return None;
    }

    if !is_pattern(host) {
        if let Some(target) = table.get(host) {
            return Some(MatchResult {
                pattern: host.to_string(),
                target: target.to_string(),
                kind: MatchKind::Exact,
            });
        }
    }

    let mut best: Option<(&str, &str, usize)> = None;
    for (pattern, target) in table {
        let Some(suffix) = wildcard_suffix(pattern) else {
            continue;
        };
        if !suffix_matches(host, suffix) {
            continue;
        }
        if best.is_none_or(|(_, _, len)| suffix.len() > len) {
            best = Some((pattern.as_str(), target.as_str(), suffix.len()));
        }
    }

    best.map(|(pattern, target, _)| MatchResult {
        pattern: pattern.to_string(),
        target: target.to_string(),
        kind: MatchKind::Wildcard,
    })
}

/// `host` equals `suffix` or ends with `.` followed by `suffix`.
fn suffix_matches(host: &str, suffix: &str) -> bool {
    if host == suffix {
        return true;
    }
    host.len() > suffix.len()
        && host.ends_with(suffix)
        && host.as_bytes()[host.len() - suffix.len() - 1] == b'.'
}
