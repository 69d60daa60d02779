//! Router smoke tests against mock-backed state.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use mintpass_core::EventService;
use mintpass_core::mocks::{MemoryStore, MockClock, MockGateway, MockLedger, MockUploader};
use mintpass_core::providers::{NetworkConfig, Store};
use mintpass_core::types::{Drops, NetworkId, User, WalletAddress};
use mintpass_web::{AppState, build_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: MemoryStore,
    ledger: MockLedger,
}

async fn app() -> TestApp {
    let store = MemoryStore::new();
    let ledger = MockLedger::new();
    let vault = ledger.funded_wallet("rVaultCustody", Drops::new(1_000_000_000));
    let config = NetworkConfig::standard(NetworkId::new("testnet"), vault);
    let gateway = MockGateway::new().with_network(config, ledger.clone());

    let service = EventService::open(
        Arc::new(store.clone()),
        Arc::new(gateway),
        Arc::new(MockUploader::new()),
        Arc::new(MockClock::new()),
    )
    .await
    .unwrap();

    TestApp {
        router: build_router(AppState::new(Arc::new(service))),
        store,
        ledger,
    }
}

impl TestApp {
    async fn organizer(&self, address: &str) -> WalletAddress {
        let wallet = self.ledger.funded_wallet(address, Drops::new(200_000_000));
        let user = User {
            is_organizer: true,
            slots: 100,
            ..User::bare(wallet.clone())
        };
        self.store.insert_user(&user).await.unwrap();
        wallet
    }

    async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

fn post_json(uri: &str, wallet: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(wallet) = wallet {
        builder = builder.header("X-Wallet-Address", wallet);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, wallet: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(wallet) = wallet {
        builder = builder.header("X-Wallet-Address", wallet);
    }
    builder.body(Body::empty()).unwrap()
}

fn event_body() -> Value {
    json!({
        "network": "testnet",
        "title": "RustFest Ledger Track",
        "location": "Berlin",
        "tokenCount": 4,
        "startsAt": "2026-09-01T09:00:00Z",
        "endsAt": "2026-09-02T18:00:00Z",
    })
}

#[tokio::test]
async fn health_endpoints_answer() {
    let app = app().await;
    let (status, body) = app.request(get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = app.request(get("/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let app = app().await;
    let (status, body) = app
        .request(post_json("/api/events", None, &event_body()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn invalid_body_reports_field_errors() {
    let app = app().await;
    app.organizer("rOrganizer1").await;

    let (status, body) = app
        .request(post_json(
            "/api/events",
            Some("rOrganizer1"),
            &json!({ "title": "" }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["errors"].as_array().unwrap().len() >= 3);
}

#[tokio::test]
async fn create_and_fetch_an_event() {
    let app = app().await;
    app.organizer("rOrganizer2").await;

    let (status, body) = app
        .request(post_json("/api/events", Some("rOrganizer2"), &event_body()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["event"]["status"], "draft");
    assert_eq!(body["deposit"]["depositReserve"], "10000000");
    assert_eq!(body["deposit"]["depositFee"], "1000000");

    let id = body["event"]["id"].as_u64().unwrap();
    let (status, body) = app.request(get(&format!("/api/events/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokenCount"], 4);
}

#[tokio::test]
async fn non_organizer_cannot_create_events() {
    let app = app().await;
    let wallet = app.ledger.funded_wallet("rPlain", Drops::new(50_000_000));
    app.store.insert_user(&User::bare(wallet)).await.unwrap();

    let (status, body) = app
        .request(post_json("/api/events", Some("rPlain"), &event_body()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DOMAIN_ERROR");
}

#[tokio::test]
async fn only_the_owner_may_mint() {
    let app = app().await;
    app.organizer("rOrganizer3").await;
    app.organizer("rOrganizer4").await;

    let (_, body) = app
        .request(post_json("/api/events", Some("rOrganizer3"), &event_body()))
        .await;
    let id = body["event"]["id"].as_u64().unwrap();

    let (status, _) = app
        .request(post_json(
            &format!("/api/events/{id}/mint"),
            Some("rOrganizer4"),
            &json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let app = app().await;
    let (status, body) = app.request(get("/api/events/999", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
