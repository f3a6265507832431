//! Shared helpers for lucid-journal integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use lucid_common::auth::{AuthError, AuthProvider, AuthUser};
use lucid_journal::{build_router, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

/// Auth provider accepting a fixed set of tokens
#[derive(Default)]
pub struct StubAuth {
    users: HashMap<String, AuthUser>,
}

impl StubAuth {
    pub fn with_user(mut self, token: &str, id: Uuid, email: Option<&str>) -> Self {
        self.users.insert(
            token.to_string(),
            AuthUser {
                id,
                email: email.map(str::to_string),
            },
        );
        self
    }
}

#[async_trait]
impl AuthProvider for StubAuth {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        self.users.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

pub const ALICE: &str = "alice-token";
pub const BOB: &str = "bob-token";
pub const CAROL: &str = "carol-token";

pub struct TestApp {
    pub router: axum::Router,
    pub db: SqlitePool,
    pub alice: Uuid,
    pub bob: Uuid,
    pub carol: Uuid,
}

/// Three users: alice and bob with emails, carol without
pub async fn test_app() -> TestApp {
    let db = lucid_common::db::init_memory_database()
        .await
        .expect("in-memory database");

    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let carol = Uuid::new_v4();
    let auth = StubAuth::default()
        .with_user(ALICE, alice, Some("alice@example.test"))
        .with_user(BOB, bob, Some("bob@example.test"))
        .with_user(CAROL, carol, None);

    TestApp {
        router: build_router(AppState::new(db.clone(), Arc::new(auth))),
        db,
        alice,
        bob,
        carol,
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

impl TestApp {
    /// Send a request and decode the JSON reply
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request(method, uri, Some(token), body.as_ref()))
            .await
            .unwrap();
        let status = response.status();
        (status, extract_json(response.into_body()).await)
    }
}
