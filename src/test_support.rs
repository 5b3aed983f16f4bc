//! Helpers for unit tests that need a live HTTP peer.

use axum::Router;
use axum::http::StatusCode;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

/// HTTP client with a short timeout.
pub fn http_client() -> reqwest::Client {
    crate::client::build_http_client(Duration::from_secs(2)).unwrap()
}

/// Serves `router` on an ephemeral port.
pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Answers every request with the next scripted response, repeating the last
/// one once the script runs out.
pub struct ScriptedServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl ScriptedServer {
    pub async fn start(script: Vec<(StatusCode, String)>) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let script = Arc::new(script);
        let counter = Arc::clone(&hits);
        let app = Router::new().fallback(move || {
            let counter = Arc::clone(&counter);
            let script = Arc::clone(&script);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                script
                    .get(n)
                    .or_else(|| script.last())
                    .cloned()
                    .unwrap_or((StatusCode::NOT_FOUND, String::new()))
            }
        });

        let addr = spawn_router(app).await;
        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}
