//! Full HTTP flow with real signed bearer tokens.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use api_adapters::{build_router, AppState, ServiceSettings};
use auth_adapters::jwt::JwtAuthProvider;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use domains::{SystemClock, TagRepository};
use serde_json::{json, Value};
use services::{Ports, RetryPolicy};
use storage_adapters::MemoryStore;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &[u8] = b"integration-secret";

struct Harness {
    router: Router,
    store: Arc<MemoryStore>,
    issuer: JwtAuthProvider,
}

impl Harness {
    fn new(admin: Uuid) -> Self {
        let store = Arc::new(MemoryStore::new());
        let auth = JwtAuthProvider::new(SECRET, Some("authenticated".into()), HashSet::from([admin]));
        let state = AppState::new(
            Ports::from_store(store.clone()),
            Arc::new(auth),
            Arc::new(SystemClock),
            ServiceSettings {
                retry: RetryPolicy::none(),
                page_size: 6,
                reference_ttl: Duration::from_secs(300),
            },
        );
        Self {
            router: build_router(state),
            store,
            issuer: JwtAuthProvider::new(SECRET, Some("authenticated".into()), HashSet::new()),
        }
    }

    fn token(&self, user: Uuid) -> String {
        self.issuer.issue_token(user, chrono::Duration::minutes(10)).unwrap()
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = self.router.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }
}

#[tokio::test]
async fn test_submit_vote_browse_and_repair() {
    let admin = Uuid::now_v7();
    let alice = Uuid::now_v7();
    let bob = Uuid::now_v7();
    let h = Harness::new(admin);
    let web = h.store.insert_tag("Web", "#3b82f6").await.unwrap();
    h.store.insert_tag("API", "#f59e0b").await.unwrap();

    let (status, tags) = h.call(Method::GET, "/api/tags", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tags[0]["name"], "API");
    assert_eq!(tags[1]["name"], "Web");

    let alice_token = h.token(alice);
    let (status, created) = h
        .call(
            Method::POST,
            "/api/ideas",
            Some(&alice_token),
            Some(json!({
                "title": "  Trail Map  ",
                "short_description": "Offline hiking maps",
                "full_description": "Cache tiles, record tracks.",
                "difficulty": "Intermediate",
                "tag_ids": [web.id],
                "tech_stack": ["Rust", "Rust", " Leaflet "],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Trail Map");
    assert_eq!(created["tech_stack"], json!(["Leaflet", "Rust"]));
    let id = created["id"].as_str().unwrap().to_string();

    let bob_token = h.token(bob);
    let (status, vote) = h
        .call(Method::POST, &format!("/api/ideas/{id}/vote"), Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vote["upvotes"], 1);

    let (_, listing) = h
        .call(Method::GET, "/api/ideas?difficulty=Intermediate&tech_stack=Rust", Some(&bob_token), None)
        .await;
    assert_eq!(listing["total_count"], 1);
    assert_eq!(listing["items"][0]["is_upvoted"], true);
    assert_eq!(listing["pages"], json!([{"kind": "page", "number": 1}]));

    let (status, _) = h
        .call(Method::POST, "/api/admin/reconcile", Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, report) = h
        .call(Method::POST, "/api/admin/reconcile", Some(&h.token(admin)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["checked"], 1);
}

#[tokio::test]
async fn test_expired_and_foreign_tokens_are_401() {
    let h = Harness::new(Uuid::now_v7());

    let expired = h.issuer.issue_token(Uuid::now_v7(), chrono::Duration::hours(-1)).unwrap();
    let (status, body) = h.call(Method::GET, "/api/ideas", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthenticated");

    let foreign = JwtAuthProvider::new(b"someone-else", Some("authenticated".into()), HashSet::new())
        .issue_token(Uuid::now_v7(), chrono::Duration::minutes(5))
        .unwrap();
    let (status, _) = h.call(Method::GET, "/api/tags", Some(&foreign), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h.call(Method::GET, "/api/tags", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_editing_keeps_the_counter() {
    let alice = Uuid::now_v7();
    let h = Harness::new(Uuid::now_v7());
    let token = h.token(alice);
    let payload = json!({
        "title": "Recipe Box",
        "short_description": "Save recipes",
        "full_description": "Import from URLs.",
        "difficulty": "Beginner",
    });
    let (_, created) = h.call(Method::POST, "/api/ideas", Some(&token), Some(payload)).await;
    let id = created["id"].as_str().unwrap().to_string();
    h.call(Method::POST, &format!("/api/ideas/{id}/vote"), Some(&token), None).await;

    let (status, updated) = h
        .call(
            Method::PUT,
            &format!("/api/ideas/{id}"),
            Some(&token),
            Some(json!({
                "title": "Recipe Box 2",
                "short_description": "Save and share recipes",
                "full_description": "Import from URLs, share lists.",
                "difficulty": "Intermediate",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Recipe Box 2");
    assert_eq!(updated["upvotes"], 1);
    assert_eq!(updated["is_upvoted"], true);

    let (status, _) = h
        .call(
            Method::PUT,
            &format!("/api/ideas/{id}"),
            Some(&h.token(Uuid::now_v7())),
            Some(json!({
                "title": "Hijacked",
                "short_description": "x",
                "full_description": "x",
                "difficulty": "Beginner",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
