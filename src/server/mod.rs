//! HTTP front ends for the query protocol.
//!
//! Both servers speak the same `GET /dns-query` contract. The
//! [`authoritative`] server answers from its own record table, the
//! [`recursive`] server delegates to a [`Resolver`](crate::Resolver).

pub mod authoritative;
pub mod recursive;

use crate::error::{ProtocolError, Result};
use crate::protocol::{DNS_JSON_CONTENT_TYPE, QueryAnswer};
use axum::Router;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Runs `router` on `listener` until Ctrl-C.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the server fails.
pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(listener = %addr, "Serving query protocol");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}

/// Encodes a query answer with the protocol content type.
pub(crate) fn dns_json(answer: &QueryAnswer) -> Response {
    let body = match serde_json::to_vec(answer) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode query answer");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    (
        [(header::CONTENT_TYPE, DNS_JSON_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// Cross-origin policy shared by both servers.
///
/// Every response allows any origin; `OPTIONS` preflights are answered by
/// the layer itself.
pub(crate) fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}
