//! Gateway configuration.
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration. Durations are integer milliseconds.
//!
//! ```toml
//! [engine]
//! registry_url = "https://example.org/registry.json"
//! refresh_interval_ms = 300000
//! refresh_mode = "both"
//! fallback_resolvers = ["https://dns.google/resolve"]
//!
//! [engine.default_registry]
//! ".owndomain" = "85.214.132.117:5353"
//!
//! [authoritative]
//! listen = "0.0.0.0:5353"
//! records_path = "records.json"
//! ```

use crate::error::{Error, Result};
use crate::table::DomainTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Registry document published by the community.
pub const DEFAULT_REGISTRY_URL: &str =
    "https://raw.githubusercontent.com/Technicusw/dns-gateway-extension/main/registry/registry.json";

/// TTL used when an answer carries none, and by the authoritative server.
pub const DEFAULT_TTL: u32 = 300;

/// When the registry is refreshed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshMode {
    /// `resolve` checks staleness and refreshes before matching.
    #[default]
    OnDemand,
    /// A background timer refreshes; `resolve` never waits on the registry.
    Background,
    /// Both triggers, sharing one single-flight guard.
    Both,
}

impl RefreshMode {
    /// Whether `resolve` performs the staleness check.
    #[must_use]
    pub const fn on_demand(self) -> bool {
        matches!(self, Self::OnDemand | Self::Both)
    }

    /// Whether a background refresh task should run.
    #[must_use]
    pub const fn background(self) -> bool {
        matches!(self, Self::Background | Self::Both)
    }
}

/// Resolution engine and registry settings.
///
/// # Example
///
/// ```
/// use dns_gateway::EngineConfig;
///
/// let config = EngineConfig::new("http://127.0.0.1:8080/registry.json")
///     .with_fallback_resolvers(Vec::<String>::new())
///     .with_query_timeout_ms(500);
///
/// assert!(config.fallback_resolvers.is_empty());
/// assert_eq!(config.query_timeout().as_millis(), 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// URL of the registry document.
    pub registry_url: String,

    /// Age after which the registry is considered stale.
    pub refresh_interval_ms: u64,

    /// Refresh triggers.
    pub refresh_mode: RefreshMode,

    /// Public resolvers tried in order after the gateway tier.
    pub fallback_resolvers: Vec<String>,

    /// Timeout for every registry fetch and upstream query.
    pub query_timeout_ms: u64,

    /// Cache TTL when an upstream answer carries none.
    pub default_ttl: u32,

    /// Table installed when the very first registry fetch fails.
    pub default_registry: DomainTable,
}

impl EngineConfig {
    /// Creates a config with defaults and the given registry URL.
    #[must_use]
    pub fn new(registry_url: impl Into<String>) -> Self {
        Self {
            registry_url: registry_url.into(),
            ..Self::default()
        }
    }

    /// Overrides the fallback resolver list.
    #[must_use]
    pub fn with_fallback_resolvers<I, S>(mut self, resolvers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_resolvers = resolvers.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the refresh interval.
    #[must_use]
    pub const fn with_refresh_interval_ms(mut self, ms: u64) -> Self {
        self.refresh_interval_ms = ms;
        self
    }

    /// Overrides the refresh mode.
    #[must_use]
    pub const fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    /// Overrides the upstream timeout.
    #[must_use]
    pub const fn with_query_timeout_ms(mut self, ms: u64) -> Self {
        self.query_timeout_ms = ms;
        self
    }

    /// Overrides the built-in default registry.
    #[must_use]
    pub fn with_default_registry(mut self, table: DomainTable) -> Self {
        self.default_registry = table;
        self
    }

    /// Refresh interval as a [`Duration`].
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Upstream timeout as a [`Duration`].
    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            refresh_interval_ms: 300_000,
            refresh_mode: RefreshMode::OnDemand,
            fallback_resolvers: vec![
                "https://dns.google/resolve".to_string(),
                "https://cloudflare-dns.com/dns-query".to_string(),
            ],
            query_timeout_ms: 5_000,
            default_ttl: DEFAULT_TTL,
            default_registry: default_registry(),
        }
    }
}

/// The built-in registry used when no registry has ever been loaded.
#[must_use]
pub fn default_registry() -> DomainTable {
    let mut table = DomainTable::new();
    table.insert(".owndomain", "85.214.132.117:5353");
    table
}

/// Authoritative server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthoritativeConfig {
    /// Listen address.
    pub listen: String,

    /// JSON file holding the record table. In-memory only when unset.
    pub records_path: Option<PathBuf>,

    /// TTL of every answer.
    pub ttl: u32,
}

impl Default for AuthoritativeConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5353".to_string(),
            records_path: None,
            ttl: DEFAULT_TTL,
        }
    }
}

/// Recursive server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecursiveConfig {
    /// Listen address.
    pub listen: String,

    /// Period of the expired-entry sweep. Zero disables it.
    pub cache_sweep_interval_ms: u64,
}

impl Default for RecursiveConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5354".to_string(),
            cache_sweep_interval_ms: 60_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolution engine.
    pub engine: EngineConfig,
    /// Authoritative server.
    pub authoritative: AuthoritativeConfig,
    /// Recursive server.
    pub recursive: RecursiveConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl Config {
    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or
    /// [`Error::InvalidConfig`] if it is not valid configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw).map_err(|e| match e {
            Error::InvalidConfig(msg) => Error::InvalidConfig(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Parses TOML configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] on syntax errors, unknown value types,
    /// zero timeouts or intervals, or an invalid default registry.
    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config
            .engine
            .default_registry
            .validate()
            .map_err(|e| Error::InvalidConfig(format!("engine.default_registry: {e}")))?;
        if config.engine.query_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "engine.query_timeout_ms must be positive".into(),
            ));
        }
        if config.engine.refresh_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "engine.refresh_interval_ms must be positive".into(),
            ));
        }
        Ok(config)
    }
}
