//! Authoritative query server.
//!
//! Answers `GET /dns-query` from a local [`RecordStore`], with no registry
//! and no fallback chain. Also exposes the record table for administration:
//!
//! - `GET /api/records` returns the full table as JSON;
//! - `POST /api/records` merges a JSON object into the table and persists it.

use crate::error::{Error, ProtocolError};
use crate::protocol::{QUERY_PATH, QueryAnswer, QueryParams, QueryRequest};
use crate::records::RecordStore;
use crate::server::{cors_layer, dns_json};
use crate::table::DomainTable;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

/// Path of the record administration resource.
pub const RECORDS_PATH: &str = "/api/records";

#[derive(Clone)]
struct AuthoritativeState {
    records: Arc<RecordStore>,
    ttl: u32,
}

/// Builds the authoritative router. Every answer carries `ttl`.
pub fn router(records: Arc<RecordStore>, ttl: u32) -> Router {
    Router::new()
        .route(QUERY_PATH, get(handle_query))
        .route(RECORDS_PATH, get(list_records).post(add_records))
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
        .layer(cors_layer())
        .with_state(AuthoritativeState { records, ttl })
}

async fn handle_query(
    State(state): State<AuthoritativeState>,
    Query(params): Query<QueryParams>,
) -> Result<Response, ProtocolError> {
    let request = QueryRequest::try_from(params)?;
    let answer = match state.records.lookup(&request.name) {
        Some(record) => {
            tracing::debug!(
                name = %request.name,
                record_type = request.record_type.as_param(),
                pattern = %record.pattern,
                "Authoritative answer"
            );
            QueryAnswer::found(request.name, state.ttl, record.target)
        }
        None => {
            tracing::debug!(name = %request.name, "Authoritative NXDOMAIN");
            QueryAnswer::nxdomain()
        }
    };
    Ok(dns_json(&answer))
}

async fn list_records(State(state): State<AuthoritativeState>) -> Json<DomainTable> {
    Json((*state.records.snapshot()).clone())
}

async fn add_records(State(state): State<AuthoritativeState>, body: Bytes) -> Response {
    let Ok(update) = serde_json::from_slice::<DomainTable>(&body) else {
        return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
    };

    let records = Arc::clone(&state.records);
    match tokio::task::spawn_blocking(move || records.merge(update)).await {
        Ok(Ok(_)) => (StatusCode::OK, "Record added").into_response(),
        Ok(Err(Error::InvalidTable(msg))) => (StatusCode::BAD_REQUEST, msg).into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to persist records");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save records").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Record merge task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
