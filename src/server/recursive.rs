//! Recursive query server.
//!
//! Forwards every `GET /dns-query` to a [`Resolver`]. `NotFound` becomes
//! `Status: 3`; `UpstreamUnavailable` becomes HTTP 503 so callers can tell
//! "no record" from "could not determine".

use crate::engine::Resolver;
use crate::error::{ProtocolError, ResolutionError};
use crate::protocol::{QUERY_PATH, QueryAnswer, QueryParams, QueryRequest};
use crate::server::{cors_layer, dns_json};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

/// Builds the recursive router on top of `resolver`.
pub fn router(resolver: Arc<dyn Resolver>) -> Router {
    Router::new()
        .route(QUERY_PATH, get(handle_query))
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
        .layer(cors_layer())
        .with_state(resolver)
}

async fn handle_query(
    State(resolver): State<Arc<dyn Resolver>>,
    Query(params): Query<QueryParams>,
) -> Result<Response, ProtocolError> {
    let request = QueryRequest::try_from(params)?;
    tracing::debug!(
        name = %request.name,
        record_type = request.record_type.as_param(),
        "Recursive query"
    );

    let response = match resolver.resolve(&request.name).await {
        Ok(resolved) => dns_json(&QueryAnswer::found(
            request.name,
            resolved.ttl,
            resolved.address,
        )),
        Err(ResolutionError::NotFound { .. }) => dns_json(&QueryAnswer::nxdomain()),
        Err(e @ ResolutionError::UpstreamUnavailable { .. }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    };
    Ok(response)
}
