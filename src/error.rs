//! Error types.

use thiserror::Error;

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by setup and administrative operations.
///
/// Resolution failures use [`ResolutionError`] instead; this type covers
/// everything around it (configuration, record persistence, HTTP client setup).
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem or socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A domain table failed validation.
    #[error("invalid domain table: {0}")]
    InvalidTable(String),

    /// A JSON document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure to load the registry document.
///
/// Never surfaced to resolution callers: the registry store recovers by
/// keeping its previous table or installing the built-in default.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("registry unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    /// The registry answered with a non-success HTTP status.
    #[error("registry returned HTTP {0}")]
    Status(u16),

    /// The body was not a flat JSON object of strings.
    #[error("malformed registry document: {0}")]
    Malformed(String),

    /// The document parsed but contains unusable entries.
    #[error("invalid registry entry: {0}")]
    Invalid(String),
}

/// Failure of a single gateway or fallback query.
///
/// Recovered locally by advancing to the next resolution tier.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The endpoint string could not be turned into a query URL.
    #[error("invalid endpoint {endpoint:?}")]
    InvalidEndpoint {
        /// The offending endpoint.
        endpoint: String,
    },

    /// Connect, timeout or body read failure.
    #[error("query transport failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The upstream answered with a non-success HTTP status.
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// The body was not a query answer.
    #[error("malformed query answer: {0}")]
    Malformed(String),

    /// The answer carried a status other than success or NXDOMAIN.
    #[error("upstream answered with DNS status {0}")]
    ServerFailure(u8),
}

impl QueryError {
    /// Returns `true` if the failure was a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

/// Outcome of a failed [`resolve`](crate::Resolver::resolve) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// At least one tier definitively reported that the name has no record.
    #[error("no record found for {hostname}")]
    NotFound {
        /// The queried hostname.
        hostname: String,
    },

    /// Every tier that was tried failed at the transport level.
    #[error("no upstream reachable for {hostname}")]
    UpstreamUnavailable {
        /// The queried hostname.
        hostname: String,
    },
}

impl ResolutionError {
    /// Returns `true` for [`ResolutionError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Malformed request at a server boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The `name` query parameter was absent or empty.
    #[error("Missing name parameter")]
    MissingName,
}
