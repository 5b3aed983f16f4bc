//! Domain pattern tables.
//!
//! A [`DomainTable`] maps domain patterns to a target string. The registry
//! uses it with gateway endpoints as targets (`"*.owndomain" -> "10.0.0.5:5353"`),
//! the authoritative server with addresses (`"home.server" -> "10.0.0.5"`).
//!
//! Keys are one of:
//!
//! - an exact hostname, `example.owndomain`
//! - a wildcard, `*.owndomain`
//! - a TLD-style suffix, `.owndomain`
//!
//! The last two are the same pattern space and match identically.

use crate::util::normalize_name;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Ordered mapping from domain pattern to target.
///
/// Keys are normalized (lowercase, no trailing root dot) on insertion.
/// Tables are treated as immutable snapshots once published; updates build
/// a new table and swap it in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DomainTable(BTreeMap<String, String>);

impl DomainTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builds a table from raw entries, normalizing every key.
    #[must_use]
    pub fn from_map(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }

    /// Inserts or overwrites one entry.
    pub fn insert(&mut self, pattern: impl AsRef<str>, target: impl Into<String>) {
        self.0
            .insert(normalize_name(pattern.as_ref()).into_owned(), target.into());
    }

    /// Exact-key lookup. `key` must already be normalized.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the pattern keys in order.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// Overwrites entries present in `other` and keeps the rest.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Checks that every entry is usable.
    ///
    /// # Errors
    ///
    /// Returns a description of the first offending entry: an empty key, a
    /// wildcard with nothing after it, a misplaced `*`, or an empty target.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (pattern, target) in &self.0 {
            if pattern.is_empty() {
                return Err("empty domain pattern".into());
            }
            if is_pattern(pattern) && wildcard_suffix(pattern).is_none() {
                return Err(format!("wildcard {pattern:?} has no suffix"));
            }
            if pattern.trim_start_matches("*.").contains('*') {
                return Err(format!("{pattern:?}: `*` is only allowed as a leading `*.` label"));
            }
            if target.trim().is_empty() {
                return Err(format!("empty target for {pattern:?}"));
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for DomainTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (pattern, target) in iter {
            table.insert(pattern, target);
        }
        table
    }
}

impl<'a> IntoIterator for &'a DomainTable {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'de> Deserialize<'de> for DomainTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<String, String>::deserialize(deserializer).map(Self::from_map)
    }
}

/// Returns `true` if `key` is written as a wildcard or suffix pattern.
#[must_use]
pub fn is_pattern(key: &str) -> bool {
    key.starts_with("*.") || key.starts_with('.')
}

/// Extracts the suffix of a wildcard (`*.s`) or TLD-style (`.s`) key.
///
/// Returns `None` for exact keys and for patterns with an empty suffix.
#[must_use]
pub fn wildcard_suffix(key: &str) -> Option<&str> {
    key.strip_prefix("*.")
        .or_else(|| key.strip_prefix('.'))
        .filter(|suffix| !suffix.is_empty())
}
