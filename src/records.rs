//! Authoritative record table with optional JSON file persistence.
//!
//! # Lifecycle
//!
//! 1. [`load`](RecordStore::load) reads the records file, or starts from
//!    the built-in records when the file is missing or unreadable.
//! 2. [`lookup`](RecordStore::lookup) answers queries from the in-memory
//!    snapshot.
//! 3. [`merge`](RecordStore::merge) applies administrative updates and
//!    rewrites the file.
//!
//! Readers never block on writers: each merge publishes a new snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use dns_gateway::RecordStore;
//!
//! let store = RecordStore::load("records.json");
//! store.merge(serde_json::from_str(r#"{"nas.home": "10.0.0.20"}"#)?)?;
//! assert_eq!(store.lookup("nas.home").unwrap().target, "10.0.0.20");
//! ```

use crate::error::{Error, Result};
use crate::matcher::{MatchResult, find_match};
use crate::table::DomainTable;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Record table served by the authoritative server.
pub struct RecordStore {
    path: Option<PathBuf>,
    records: ArcSwap<DomainTable>,
    write_lock: Mutex<()>,
}

impl RecordStore {
    /// Creates a store that keeps `records` in memory only.
    #[must_use]
    pub fn in_memory(records: DomainTable) -> Self {
        Self {
            path: None,
            records: ArcSwap::from_pointee(records),
            write_lock: Mutex::new(()),
        }
    }

    /// Loads `path`, falling back to [`default_records`] if the file is
    /// missing, unreadable or invalid. Merges are written back to `path`.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match read_records(&path) {
            Ok(records) => {
                tracing::info!(
                    path = %path.display(),
                    entries = records.len(),
                    "Loaded authoritative records"
                );
                records
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "No usable records file, using default records"
                );
                default_records()
            }
        };
        Self {
            path: Some(path),
            records: ArcSwap::from_pointee(records),
            write_lock: Mutex::new(()),
        }
    }

    /// The records file, if persistent.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The current table.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DomainTable> {
        self.records.load_full()
    }

    /// Finds the record for `hostname`, exact entries before wildcards.
    #[must_use]
    pub fn lookup(&self, hostname: &str) -> Option<MatchResult> {
        find_match(hostname, &self.records.load())
    }

    /// Merges `update` into the table and persists the result.
    ///
    /// Existing keys present in `update` are overwritten. The new table is
    /// published only after it has been written to disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTable`] if `update` fails validation, or
    /// [`Error::Io`] / [`Error::Json`] if the file cannot be written. The
    /// in-memory table is unchanged on error.
    pub fn merge(&self, update: DomainTable) -> Result<Arc<DomainTable>> {
        update.validate().map_err(Error::InvalidTable)?;

        let _guard = self.write_lock.lock();
        let mut merged = (*self.records.load_full()).clone();
        let added = update.len();
        merged.merge(update);

        if let Some(path) = &self.path {
            write_records(path, &merged)?;
        }

        let merged = Arc::new(merged);
        self.records.store(Arc::clone(&merged));
        tracing::info!(
            added,
            entries = merged.len(),
            persisted = self.path.is_some(),
            "Merged authoritative records"
        );
        Ok(merged)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("path", &self.path)
            .field("entries", &self.records.load().len())
            .finish_non_exhaustive()
    }
}

/// Records served when no records file is available.
#[must_use]
pub fn default_records() -> DomainTable {
    let mut table = DomainTable::new();
    table.insert("test.owndomain", "93.184.216.34");
    table.insert("api.owndomain", "142.251.36.206");
    table.insert("*.owndomain", "93.184.216.34");
    table
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn read_records(path: &Path) -> Result<DomainTable> {
    let raw = std::fs::read_to_string(path)?;
    let records: DomainTable = serde_json::from_str(&raw)?;
    records.validate().map_err(Error::InvalidTable)?;
    Ok(records)
}

/// Writes pretty-printed JSON through a sibling temp file and a rename, so
/// readers of the file never see a partial table.
fn write_records(path: &Path, records: &DomainTable) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut content = serde_json::to_string_pretty(records)?;
    content.push('\n');
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;

    tracing::debug!(path = %path.display(), entries = records.len(), "Wrote records file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchKind;

    fn table(entries: &[(&str, &str)]) -> DomainTable {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::load(dir.path().join("records.json"));
        assert_eq!(*store.snapshot(), default_records());
        assert!(!dir.path().join("records.json").exists());
    }

    #[test]
    fn corrupt_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(*RecordStore::load(&path).snapshot(), default_records());
    }

    #[test]
    fn merge_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"home.server": "10.0.0.5"}"#).unwrap();

        let store = RecordStore::load(&path);
        store
            .merge(table(&[("nas.home", "10.0.0.20"), ("home.server", "10.0.0.6")]))
            .unwrap();

        let reloaded = RecordStore::load(&path);
        assert_eq!(reloaded.snapshot().get("nas.home"), Some("10.0.0.20"));
        assert_eq!(reloaded.snapshot().get("home.server"), Some("10.0.0.6"));
        assert!(!dir.path().join("nested").join("records.json.tmp").exists());
    }

    #[test]
    fn merge_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("records.json");
        let store = RecordStore::load(&path);
        store.merge(table(&[("a.home", "10.0.0.1")])).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn invalid_merge_leaves_table_unchanged() {
        let store = RecordStore::in_memory(table(&[("a.home", "10.0.0.1")]));
        assert!(matches!(
            store.merge(table(&[("b.home", "")])),
            Err(Error::InvalidTable(_))
        ));
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn lookup_prefers_exact() {
        let store = RecordStore::in_memory(table(&[
            ("example.owndomain", "192.168.1.100"),
            ("*.wildcard.owndomain", "192.168.1.200"),
        ]));
        let exact = store.lookup("example.owndomain").unwrap();
        assert_eq!(exact.kind, MatchKind::Exact);

        let wild = store.lookup("x.wildcard.owndomain").unwrap();
        assert_eq!(wild.target, "192.168.1.200");
        assert!(store.lookup("xwildcard.owndomain").is_none());
    }

    #[test]
    fn in_memory_has_no_path() {
        let store = RecordStore::in_memory(DomainTable::new());
        assert!(store.path().is_none());
        store.merge(table(&[("a.home", "10.0.0.1")])).unwrap();
        assert_eq!(store.lookup("a.home").unwrap().target, "10.0.0.1");
    }
}
