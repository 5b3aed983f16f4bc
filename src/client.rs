//! Query protocol client used for gateway and fallback tiers.

use crate::error::QueryError;
use crate::protocol::{DNS_JSON_CONTENT_TYPE, QUERY_PATH, QueryAnswer, RecordType};
use reqwest::{Client, Url, header};
use std::time::Duration;

/// Sends query-protocol requests with a bounded timeout.
#[derive(Debug, Clone)]
pub struct QueryClient {
    http: Client,
}

impl QueryClient {
    /// Wraps an existing HTTP client. The client's timeout bounds every query.
    #[must_use]
    pub const fn new(http: Client) -> Self {
        Self { http }
    }

    /// Builds a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the TLS backend cannot be initialized.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        build_http_client(timeout).map(Self::new)
    }

    /// Asks `endpoint` for the address of `hostname`.
    ///
    /// Both success and NXDOMAIN answers are returned as `Ok`; only answers
    /// that could not be obtained or understood are errors.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] on transport failure, timeout, non-2xx HTTP
    /// status, an undecodable body, or a non-definitive DNS status.
    pub async fn query(&self, endpoint: &str, hostname: &str) -> Result<QueryAnswer, QueryError> {
        let mut url = query_url(endpoint)?;
        url.query_pairs_mut()
            .append_pair("name", hostname)
            .append_pair("type", RecordType::A.as_param());

        tracing::trace!(%url, "Sending query");
        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, DNS_JSON_CONTENT_TYPE)
            .send()
            .await
            .map_err(QueryError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(QueryError::Transport)?;
        let answer: QueryAnswer =
            serde_json::from_slice(&body).map_err(|e| QueryError::Malformed(e.to_string()))?;
        if !answer.is_definitive() {
            return Err(QueryError::ServerFailure(answer.status));
        }
        Ok(answer)
    }
}

/// Builds the shared HTTP client used for registry fetches and queries.
///
/// # Errors
///
/// Returns the underlying error if the TLS backend cannot be initialized.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("dns-gateway/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

/// Turns an endpoint string into the query URL.
///
/// `host:port` becomes `http://host:port/dns-query`. Full URLs are kept,
/// with the path defaulting to `/dns-query` when empty.
///
/// # Errors
///
/// Returns [`QueryError::InvalidEndpoint`] if the result is not a valid URL.
pub fn query_url(endpoint: &str) -> Result<Url, QueryError> {
    let invalid = || QueryError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
    };
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(invalid());
    }

    let mut url = if endpoint.contains("://") {
        Url::parse(endpoint).map_err(|_| invalid())?
    } else {
        Url::parse(&format!("http://{endpoint}")).map_err(|_| invalid())?
    };
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid());
    }
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(QUERY_PATH);
    }
    Ok(url)
}
