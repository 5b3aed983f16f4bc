//! End-to-end tests for `dns-gateway`.
//!
//! Every test runs real HTTP servers on ephemeral loopback ports: a registry
//! document server, authoritative gateways built from the crate's own
//! router, and scripted fallback resolvers. No external network is used.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::routing::get;
use axum::Router;
use dns_gateway::server::{authoritative, recursive};
use dns_gateway::{
    DomainTable, EngineConfig, QueryAnswer, RecordStore, RegistrySource, ResolutionEngine,
    ResolutionError, Resolver, Tier,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn table(entries: &[(&str, &str)]) -> DomainTable {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Counts requests reaching `router`.
fn counted(router: Router, hits: &Arc<AtomicUsize>) -> Router {
    let hits = Arc::clone(hits);
    router.layer(middleware::from_fn(move |req: Request, next: Next| {
        let hits = Arc::clone(&hits);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            next.run(req).await
        }
    }))
}

/// Authoritative gateway with a request counter.
async fn gateway(records: &[(&str, &str)], ttl: u32) -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(RecordStore::in_memory(table(records)));
    let addr = spawn(counted(authoritative::router(store, ttl), &hits)).await;
    (addr, hits)
}

/// Serves `body` with `status` at `/registry.json`.
async fn registry(status: StatusCode, body: String) -> SocketAddr {
    spawn(Router::new().route(
        "/registry.json",
        get(move || {
            let body = body.clone();
            async move { (status, body) }
        }),
    ))
    .await
}

/// Public-resolver stand-in that always gives `answer`.
async fn fallback(answer: QueryAnswer) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let body = serde_json::to_string(&answer).unwrap();
    let router = Router::new().route(
        "/resolve",
        get(move || {
            let body = body.clone();
            async move { ([("content-type", "application/dns-json")], body) }
        }),
    );
    let addr = spawn(counted(router, &hits)).await;
    (format!("http://{addr}/resolve"), hits)
}

fn engine(config: EngineConfig) -> ResolutionEngine {
    ResolutionEngine::new(config.with_query_timeout_ms(2_000)).unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wildcard_registry_routes_to_gateway_and_caches() {
    let (gw, gw_hits) = gateway(&[("example.owndomain", "192.168.1.100")], 300).await;
    let reg = registry(StatusCode::OK, format!(r#"{{"*.owndomain": "{gw}"}}"#)).await;
    let e = engine(
        EngineConfig::new(format!("http://{reg}/registry.json"))
            .with_fallback_resolvers(Vec::<String>::new()),
    );

    let first = e.resolve("example.owndomain").await.unwrap();
    assert_eq!(first.address, "192.168.1.100");
    assert_eq!(first.tier, Tier::Gateway);
    assert_eq!(first.ttl, 300);

    let second = e.resolve("example.owndomain").await.unwrap();
    assert_eq!(second.address, "192.168.1.100");
    assert_eq!(second.tier, Tier::Cache);
    assert_eq!(gw_hits.load(Ordering::SeqCst), 1);
    assert_eq!(e.registry().state().source, RegistrySource::Remote);
}

#[tokio::test]
async fn cached_answer_expires_after_ttl() {
    let (gw, gw_hits) = gateway(&[("*.owndomain", "10.9.9.9")], 1).await;
    let reg = registry(StatusCode::OK, format!(r#"{{".owndomain": "{gw}"}}"#)).await;
    let e = engine(
        EngineConfig::new(format!("http://{reg}/registry.json"))
            .with_fallback_resolvers(Vec::<String>::new()),
    );

    e.resolve("a.owndomain").await.unwrap();
    assert_eq!(e.resolve("a.owndomain").await.unwrap().tier, Tier::Cache);

    // Jump the clock past the TTL without sleeping; loopback I/O runs unpaused.
    tokio::time::pause();
    tokio::time::advance(Duration::from_secs(2)).await;
    tokio::time::resume();

    let again = e.resolve("a.owndomain").await.unwrap();
    assert_eq!(again.tier, Tier::Gateway);
    assert_eq!(gw_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unmatched_name_goes_to_fallback_and_nxdomain_is_not_found() {
    let (gw, gw_hits) = gateway(&[("*.owndomain", "10.0.0.1")], 300).await;
    let reg = registry(StatusCode::OK, format!(r#"{{"*.owndomain": "{gw}"}}"#)).await;
    let (fb, fb_hits) = fallback(QueryAnswer::nxdomain()).await;
    let e = engine(
        EngineConfig::new(format!("http://{reg}/registry.json")).with_fallback_resolvers([fb]),
    );

    let err = e.resolve("foo.com").await.unwrap_err();
    assert_eq!(
        err,
        ResolutionError::NotFound {
            hostname: "foo.com".into()
        }
    );
    assert_eq!(gw_hits.load(Ordering::SeqCst), 0);
    assert_eq!(fb_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_everything_is_upstream_unavailable() {
    let reg = registry(StatusCode::OK, r#"{"*.owndomain": "127.0.0.1:1"}"#.into()).await;
    let e = engine(
        EngineConfig::new(format!("http://{reg}/registry.json"))
            .with_fallback_resolvers(["http://127.0.0.1:1/resolve"]),
    );

    let err = e.resolve("x.owndomain").await.unwrap_err();
    assert!(matches!(err, ResolutionError::UpstreamUnavailable { .. }));
}

#[tokio::test]
async fn fallback_rescues_dead_gateway() {
    let reg = registry(StatusCode::OK, r#"{"*.owndomain": "127.0.0.1:1"}"#.into()).await;
    let (fb, _) = fallback(QueryAnswer::found("x.owndomain", 60, "203.0.113.9")).await;
    let e = engine(
        EngineConfig::new(format!("http://{reg}/registry.json")).with_fallback_resolvers([fb]),
    );

    let r = e.resolve("x.owndomain").await.unwrap();
    assert_eq!(r.address, "203.0.113.9");
    assert_eq!(r.tier, Tier::Fallback);
    assert_eq!(e.cache().get("x.owndomain").as_deref(), Some("203.0.113.9"));
}

#[tokio::test]
async fn authoritative_server_wire_format() {
    let (gw, _) = gateway(&[("home.server", "10.0.0.5")], 300).await;
    let client = reqwest::Client::new();

    let found = client
        .get(format!("http://{gw}/dns-query?name=home.server"))
        .send()
        .await
        .unwrap();
    assert_eq!(found.status(), 200);
    assert_eq!(
        found.text().await.unwrap(),
        r#"{"Status":0,"Answer":[{"name":"home.server","type":1,"TTL":300,"data":"10.0.0.5"}]}"#
    );

    let missing = client
        .get(format!("http://{gw}/dns-query?name=unknown.server"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.text().await.unwrap(), r#"{"Status":3,"Answer":[]}"#);
}

#[tokio::test]
async fn registry_500_on_first_load_installs_default_table() {
    let reg = registry(StatusCode::INTERNAL_SERVER_ERROR, "oops".into()).await;
    let (fb, _) = fallback(QueryAnswer::found("foo.com", 60, "198.51.100.1")).await;
    let default = table(&[(".owndomain", "127.0.0.1:1")]);
    let e = engine(
        EngineConfig::new(format!("http://{reg}/registry.json"))
            .with_fallback_resolvers([fb])
            .with_default_registry(default.clone()),
    );

    let r = e.resolve("foo.com").await.unwrap();
    assert_eq!(r.tier, Tier::Fallback);

    let state = e.registry().state();
    assert_eq!(state.source, RegistrySource::FallbackDefault);
    assert_eq!(*state.table, default);
}

#[tokio::test]
async fn recursive_server_over_engine() {
    let (gw, _) = gateway(&[("*.priv", "10.20.30.40")], 120).await;
    let reg = registry(StatusCode::OK, format!(r#"{{".priv": "{gw}"}}"#)).await;
    let (fb, _) = fallback(QueryAnswer::nxdomain()).await;
    let resolver: Arc<dyn Resolver> = Arc::new(engine(
        EngineConfig::new(format!("http://{reg}/registry.json")).with_fallback_resolvers([fb]),
    ));
    let addr = spawn(recursive::router(resolver)).await;
    let client = reqwest::Client::new();

    let answer: QueryAnswer = client
        .get(format!("http://{addr}/dns-query?name=site.priv"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let record = answer.address().unwrap();
    assert_eq!(record.data, "10.20.30.40");
    assert_eq!(record.ttl, 120);

    let nx: QueryAnswer = client
        .get(format!("http://{addr}/dns-query?name=nothing.example"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(nx, QueryAnswer::nxdomain());
}

#[tokio::test]
async fn recursive_server_reports_unreachable_upstreams() {
    let reg = registry(StatusCode::OK, "{}".into()).await;
    let resolver: Arc<dyn Resolver> = Arc::new(engine(
        EngineConfig::new(format!("http://{reg}/registry.json"))
            .with_fallback_resolvers(["127.0.0.1:1"]),
    ));
    let addr = spawn(recursive::router(resolver)).await;

    let resp = reqwest::get(format!("http://{addr}/dns-query?name=foo.com"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn records_file_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.json");
    std::fs::write(&path, r#"{"home.server": "10.0.0.5"}"#).unwrap();

    let addr = spawn(authoritative::router(Arc::new(RecordStore::load(&path)), 300)).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/records"))
        .body(r#"{"*.lab.home": "10.0.1.1"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let restarted = RecordStore::load(&path);
    assert_eq!(restarted.lookup("box.lab.home").unwrap().target, "10.0.1.1");
    assert_eq!(restarted.lookup("home.server").unwrap().target, "10.0.0.5");
}
