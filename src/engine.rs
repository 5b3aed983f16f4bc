//! Resolution engine.
//!
//! Resolves one hostname through the tiers below, stopping at the first
//! answer:
//!
//! 1. the resolution cache
//! 2. the gateway matched in the registry
//! 3. the fallback public resolvers, in order
//!
//! A tier that times out or errors is skipped, never fatal. When no tier
//! answers, the engine reports [`ResolutionError::NotFound`] if any tier
//! said "no record", and [`ResolutionError::UpstreamUnavailable`] if every
//! tier tried failed at the transport level.

use crate::cache::ResolutionCache;
use crate::client::{QueryClient, build_http_client};
use crate::config::EngineConfig;
use crate::error::{QueryError, ResolutionError, Result};
use crate::matcher::find_match;
use crate::protocol::QueryAnswer;
use crate::registry::RegistryStore;
use crate::util::{normalize_name, ttl_secs};
use async_trait::async_trait;
use std::sync::Arc;

/// The tier that produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Served from the resolution cache.
    Cache,
    /// Answered by the registry gateway.
    Gateway,
    /// Answered by a public fallback resolver.
    Fallback,
}

/// A resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The normalized hostname.
    pub hostname: String,
    /// The resolved address.
    pub address: String,
    /// Remaining lifetime in seconds.
    pub ttl: u32,
    /// Where the answer came from.
    pub tier: Tier,
}

/// Hostname resolution capability.
///
/// This is the contract offered to embedders (request interception layers,
/// the recursive server): given a hostname, an address or a typed failure.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves `hostname` to an address.
    async fn resolve(&self, hostname: &str) -> std::result::Result<Resolution, ResolutionError>;
}

/// Outcome of querying one upstream.
enum TierOutcome {
    Answered { address: String, ttl: u32 },
    NoRecord,
    Failed,
}

/// Cache → registry gateway → public fallback resolver.
#[derive(Debug)]
pub struct ResolutionEngine {
    config: EngineConfig,
    registry: Arc<RegistryStore>,
    cache: Arc<ResolutionCache>,
    client: QueryClient,
}

impl ResolutionEngine {
    /// Builds an engine with its own registry store, cache and HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if the HTTP client cannot
    /// be built.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let http = build_http_client(config.query_timeout())?;
        let registry = Arc::new(RegistryStore::from_config(&config, http.clone()));
        Ok(Self::with_parts(
            config,
            registry,
            Arc::new(ResolutionCache::new()),
            QueryClient::new(http),
        ))
    }

    /// Assembles an engine from existing parts.
    #[must_use]
    pub const fn with_parts(
        config: EngineConfig,
        registry: Arc<RegistryStore>,
        cache: Arc<ResolutionCache>,
        client: QueryClient,
    ) -> Self {
        Self {
            config,
            registry,
            cache,
            client,
        }
    }

    /// The registry store.
    #[must_use]
    pub const fn registry(&self) -> &Arc<RegistryStore> {
        &self.registry
    }

    /// The resolution cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    /// The engine settings.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolves `hostname`. See the [module docs](self) for the tier order.
    ///
    /// # Errors
    ///
    /// [`ResolutionError::NotFound`] when the name has no record (or is
    /// empty); [`ResolutionError::UpstreamUnavailable`] when nobody who
    /// might know could be reached.
    pub async fn resolve(&self, hostname: &str) -> std::result::Result<Resolution, ResolutionError> {
        let name = normalize_name(hostname).into_owned();
        if name.is_empty() {
            return Err(ResolutionError::NotFound {
                hostname: hostname.to_string(),
            });
        }

        if let Some((address, remaining)) = self.cache.lookup(&name) {
            tracing::debug!(hostname = %name, %address, "Cache hit");
            return Ok(Resolution {
                hostname: name,
                address,
                ttl: ttl_secs(remaining),
                tier: Tier::Cache,
            });
        }

        // Background mode still loads once; the timer may not have fired yet.
        let unloaded = !self.registry.state().is_loaded();
        let table = if self.config.refresh_mode.on_demand() || unloaded {
            self.registry.ensure_fresh().await
        } else {
            self.registry.current()
        };

        let mut saw_no_record = false;
        let mut saw_failure = false;

        if let Some(matched) = find_match(&name, &table) {
            tracing::debug!(
                hostname = %name,
                pattern = %matched.pattern,
                gateway = %matched.target,
                kind = ?matched.kind,
                "Registry match"
            );
            match self.query_tier(&matched.target, &name).await {
                TierOutcome::Answered { address, ttl } => {
                    return Ok(self.commit(name, address, ttl, Tier::Gateway));
                }
                TierOutcome::NoRecord => saw_no_record = true,
                TierOutcome::Failed => saw_failure = true,
            }
        } else {
            tracing::trace!(hostname = %name, "No registry match");
        }

        for resolver in &self.config.fallback_resolvers {
            match self.query_tier(resolver, &name).await {
                TierOutcome::Answered { address, ttl } => {
                    return Ok(self.commit(name, address, ttl, Tier::Fallback));
                }
                TierOutcome::NoRecord => saw_no_record = true,
                TierOutcome::Failed => saw_failure = true,
            }
        }

        if saw_failure && !saw_no_record {
            tracing::warn!(hostname = %name, "All resolution tiers unreachable");
            Err(ResolutionError::UpstreamUnavailable { hostname: name })
        } else {
            tracing::debug!(hostname = %name, "No record in any tier");
            Err(ResolutionError::NotFound { hostname: name })
        }
    }

    async fn query_tier(&self, endpoint: &str, hostname: &str) -> TierOutcome {
        match self.client.query(endpoint, hostname).await {
            Ok(answer) => self.classify(&answer, endpoint, hostname),
            Err(err) => {
                log_query_failure(&err, endpoint, hostname);
                TierOutcome::Failed
            }
        }
    }

    fn classify(&self, answer: &QueryAnswer, endpoint: &str, hostname: &str) -> TierOutcome {
        match answer.address() {
            Some(record) => TierOutcome::Answered {
                address: record.data.clone(),
                ttl: if record.ttl > 0 {
                    record.ttl
                } else {
                    self.config.default_ttl
                },
            },
            None => {
                tracing::debug!(%endpoint, %hostname, status = answer.status, "Upstream has no record");
                TierOutcome::NoRecord
            }
        }
    }

    fn commit(&self, hostname: String, address: String, ttl: u32, tier: Tier) -> Resolution {
        self.cache.put(&hostname, address.clone(), ttl);
        tracing::debug!(%hostname, %address, ttl, ?tier, "Resolved");
        Resolution {
            hostname,
            address,
            ttl,
            tier,
        }
    }
}

fn log_query_failure(err: &QueryError, endpoint: &str, hostname: &str) {
    if err.is_timeout() {
        tracing::warn!(%endpoint, %hostname, "Upstream query timed out");
    } else {
        tracing::warn!(%endpoint, %hostname, error = %err, "Upstream query failed");
    }
}

#[async_trait]
impl Resolver for ResolutionEngine {
    async fn resolve(&self, hostname: &str) -> std::result::Result<Resolution, ResolutionError> {
        Self::resolve(self, hostname).await
    }
}
