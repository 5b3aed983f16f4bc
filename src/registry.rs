//! Registry of custom domain patterns.
//!
//! The store holds the current pattern → gateway table and replaces it as a
//! whole on every refresh. Readers call [`RegistryStore::current`], which
//! never blocks and always returns a complete snapshot.
//!
//! # Failure handling
//!
//! A failed fetch never empties the table:
//!
//! - with a previously loaded table, that table stays in service (`Stale`);
//! - on the first-ever failure, the built-in default is installed
//!   (`FallbackDefault`).
//!
//! Refreshes are single-flight. Overlapping triggers wait for the fetch in
//! progress and then reuse its result instead of fetching again.

use crate::config::EngineConfig;
use crate::error::FetchError;
use crate::table::DomainTable;
use arc_swap::ArcSwap;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Shortest period the background refresh timer runs at.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Where the current table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrySource {
    /// Nothing loaded yet (process start).
    Unloaded,
    /// The last fetch succeeded.
    Remote,
    /// Every fetch so far failed; serving the built-in default.
    FallbackDefault,
    /// The last fetch failed; serving the last successful table.
    Stale,
}

/// One committed registry snapshot.
#[derive(Debug, Clone)]
pub struct RegistryState {
    /// The pattern table.
    pub table: Arc<DomainTable>,
    /// Wall-clock time the table was fetched, `None` unless remote-sourced.
    pub fetched_at: Option<SystemTime>,
    /// Time of the last refresh attempt, successful or not.
    pub checked_at: Option<Instant>,
    /// Origin of `table`.
    pub source: RegistrySource,
}

impl RegistryState {
    /// The empty start-of-process state.
    #[must_use]
    pub fn unloaded() -> Self {
        Self {
            table: Arc::new(DomainTable::new()),
            fetched_at: None,
            checked_at: None,
            source: RegistrySource::Unloaded,
        }
    }

    /// Whether a refresh is due.
    #[must_use]
    pub fn is_stale(&self, interval: Duration) -> bool {
        self.checked_at
            .is_none_or(|checked| checked.elapsed() >= interval)
    }

    /// Whether any refresh has been attempted, so `table` is usable.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        !matches!(self.source, RegistrySource::Unloaded)
    }

    /// Whether a remote table has ever been loaded.
    #[must_use]
    pub const fn has_remote_table(&self) -> bool {
        matches!(self.source, RegistrySource::Remote | RegistrySource::Stale)
    }
}

/// Owner of the registry table.
///
/// Shared by handle (`Arc<RegistryStore>`) between the resolution engine and
/// the optional background refresh task.
pub struct RegistryStore {
    url: String,
    http: Client,
    refresh_interval: Duration,
    default_table: Arc<DomainTable>,
    state: ArcSwap<RegistryState>,
    refresh_guard: Mutex<()>,
}

impl RegistryStore {
    /// Creates an unloaded store fetching from `url`.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        http: Client,
        refresh_interval: Duration,
        default_table: DomainTable,
    ) -> Self {
        Self {
            url: url.into(),
            http,
            refresh_interval,
            default_table: Arc::new(default_table),
            state: ArcSwap::from_pointee(RegistryState::unloaded()),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Creates an unloaded store from engine settings.
    #[must_use]
    pub fn from_config(config: &EngineConfig, http: Client) -> Self {
        Self::new(
            config.registry_url.clone(),
            http,
            config.refresh_interval(),
            config.default_registry.clone(),
        )
    }

    /// Registry document URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The latest committed table. Never blocks.
    #[must_use]
    pub fn current(&self) -> Arc<DomainTable> {
        Arc::clone(&self.state.load().table)
    }

    /// The latest committed state. Never blocks.
    #[must_use]
    pub fn state(&self) -> Arc<RegistryState> {
        self.state.load_full()
    }

    /// Fetches the registry document and swaps it in.
    ///
    /// On failure the previous table is kept (or the default installed if
    /// there is none) and the error is returned for the caller's information.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] that prevented loading the document.
    pub async fn refresh(&self) -> Result<Arc<RegistryState>, FetchError> {
        let _guard = self.refresh_guard.lock().await;
        self.refresh_locked().await
    }

    /// Refreshes if the current state is older than the refresh interval.
    ///
    /// Concurrent callers share a single fetch. Failures are logged and
    /// absorbed; the returned table is always usable.
    pub async fn ensure_fresh(&self) -> Arc<DomainTable> {
        if !self.state.load().is_stale(self.refresh_interval) {
            return self.current();
        }

        let _guard = self.refresh_guard.lock().await;
        // Another caller may have refreshed while we waited.
        if self.state.load().is_stale(self.refresh_interval) {
            let _ = self.refresh_locked().await;
        }
        self.current()
    }

    /// Spawns a timer that calls [`ensure_fresh`](Self::ensure_fresh) once
    /// per refresh interval, starting immediately.
    ///
    /// Shares the single-flight guard with on-demand refreshes. Must be
    /// called from within a Tokio runtime. The period is never shorter than
    /// [`MIN_REFRESH_INTERVAL`].
    pub fn spawn_refresh_task(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let period = store.refresh_interval.max(MIN_REFRESH_INTERVAL);
        if period != store.refresh_interval {
            tracing::warn!(
                interval = ?store.refresh_interval,
                using = ?period,
                "Registry refresh interval too short"
            );
        }
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.ensure_fresh().await;
            }
        })
    }

    async fn refresh_locked(&self) -> Result<Arc<RegistryState>, FetchError> {
        let now = Instant::now();
        match self.fetch().await {
            Ok(table) => {
                tracing::info!(
                    url = %self.url,
                    entries = table.len(),
                    patterns = ?table.patterns(),
                    "Loaded domain registry"
                );
                let state = Arc::new(RegistryState {
                    table: Arc::new(table),
                    fetched_at: Some(SystemTime::now()),
                    checked_at: Some(now),
                    source: RegistrySource::Remote,
                });
                self.state.store(Arc::clone(&state));
                Ok(state)
            }
            Err(err) => {
                let previous = self.state.load_full();
                let state = if previous.has_remote_table() {
                    tracing::warn!(
                        url = %self.url,
                        error = %err,
                        "Registry refresh failed, keeping last known table"
                    );
                    RegistryState {
                        checked_at: Some(now),
                        source: RegistrySource::Stale,
                        ..(*previous).clone()
                    }
                } else {
                    tracing::warn!(
                        url = %self.url,
                        error = %err,
                        entries = self.default_table.len(),
                        "Registry unavailable, using built-in default table"
                    );
                    RegistryState {
                        table: Arc::clone(&self.default_table),
                        fetched_at: None,
                        checked_at: Some(now),
                        source: RegistrySource::FallbackDefault,
                    }
                };
                self.state.store(Arc::new(state));
                Err(err)
            }
        }
    }

    async fn fetch(&self) -> Result<DomainTable, FetchError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(FetchError::Transport)?;
        let table: DomainTable =
            serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;
        table.validate().map_err(FetchError::Invalid)?;
        Ok(table)
    }
}

impl std::fmt::Debug for RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.load();
        f.debug_struct("RegistryStore")
            .field("url", &self.url)
            .field("refresh_interval", &self.refresh_interval)
            .field("source", &state.source)
            .field("entries", &state.table.len())
            .finish_non_exhaustive()
    }
}
