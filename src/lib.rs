//! # dns-gateway
//!
//! Resolve hostnames under custom, non-ICANN top-level domains
//! (`.owndomain`, `.priv`, ...) through a community-maintained registry of
//! gateway servers, falling back to public DNS-over-HTTP resolvers.
//!
//! The registry is a flat JSON object mapping domain patterns to gateway
//! endpoints:
//!
//! ```json
//! { "*.owndomain": "10.0.0.5:5353", ".priv": "203.0.113.7:5353" }
//! ```
//!
//! Gateways and clients talk a small JSON-over-HTTP query protocol
//! (`GET /dns-query?name=<host>`), not the DNS wire format.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use dns_gateway::{EngineConfig, ResolutionEngine, ResolutionError};
//!
//! let engine = ResolutionEngine::new(EngineConfig::default())?;
//!
//! match engine.resolve("example.owndomain").await {
//!     Ok(resolved) => println!("{} -> {}", resolved.hostname, resolved.address),
//!     Err(ResolutionError::NotFound { .. }) => { /* let normal DNS handle it */ }
//!     Err(ResolutionError::UpstreamUnavailable { .. }) => { /* transient, retry */ }
//! }
//! ```
//!
//! ## Resolution order
//!
//! 1. [`ResolutionCache`]: exact hostname, TTL-bounded.
//! 2. [`RegistryStore`] + [`find_match`]: the most specific registry pattern
//!    selects a gateway, which is queried over the protocol.
//! 3. The configured fallback resolvers, in order.
//!
//! Failed lookups are never cached.
//!
//! ## Servers
//!
//! - [`server::authoritative`] serves a static [`RecordStore`].
//! - [`server::recursive`] delegates each query to a [`Resolver`].

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod protocol;
pub mod records;
pub mod registry;
pub mod server;
pub mod table;
pub mod util;

#[cfg(test)]
mod test_support;

pub use cache::ResolutionCache;
pub use client::QueryClient;
pub use config::{Config, EngineConfig, RefreshMode};
pub use engine::{Resolution, ResolutionEngine, Resolver, Tier};
pub use error::{Error, FetchError, ProtocolError, QueryError, ResolutionError, Result};
pub use matcher::{MatchKind, MatchResult, find_match};
pub use protocol::{Answer, QueryAnswer, QueryRequest};
pub use records::RecordStore;
pub use registry::{RegistrySource, RegistryState, RegistryStore};
pub use table::DomainTable;
