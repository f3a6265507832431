//! Shared test doubles for lucid-ai integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use lucid_ai::gateway::{ChatRequest, ChatResponse, CompletionGateway, GatewayError};
use lucid_ai::{build_router, AppState};
use lucid_common::auth::{AuthError, AuthProvider, AuthUser};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Auth provider accepting a fixed set of tokens
#[derive(Default)]
pub struct StubAuth {
    users: HashMap<String, AuthUser>,
    pub calls: AtomicUsize,
}

impl StubAuth {
    pub fn with_user(mut self, token: &str, id: Uuid) -> Self {
        self.users.insert(
            token.to_string(),
            AuthUser {
                id,
                email: Some(format!("{}@example.test", token)),
            },
        );
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for StubAuth {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.users.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

type Reply = Box<dyn Fn(&ChatRequest) -> Result<ChatResponse, GatewayError> + Send + Sync>;

/// Gateway returning a canned reply and recording requests
pub struct StubGateway {
    reply: Reply,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<ChatRequest>>,
}

impl StubGateway {
    pub fn new(
        reply: impl Fn(&ChatRequest) -> Result<ChatResponse, GatewayError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            reply: Box::new(reply),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Answers every request with `arguments` as the forced tool call's output
    pub fn answering(arguments: Value) -> Self {
        Self::new(move |req| {
            Ok(ChatResponse::with_tool_call(
                &req.tool_choice.function.name,
                arguments.to_string(),
            ))
        })
    }

    pub fn failing_with_status(status: u16) -> Self {
        Self::new(move |_| {
            Err(GatewayError::Status {
                status,
                body: "stub failure".to_string(),
            })
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionGateway for StubGateway {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        (self.reply)(request)
    }
}

pub struct TestApp {
    pub router: axum::Router,
    pub db: SqlitePool,
    pub auth: Arc<StubAuth>,
    pub gateway: Arc<StubGateway>,
}

pub async fn test_app(auth: StubAuth, gateway: StubGateway) -> TestApp {
    let db = lucid_common::db::init_memory_database()
        .await
        .expect("in-memory database");
    let auth = Arc::new(auth);
    let gateway = Arc::new(gateway);

    let state = AppState::new(db.clone(), auth.clone(), gateway.clone(), "test-model");

    TestApp {
        router: build_router(state),
        db,
        auth,
        gateway,
    }
}

pub fn assist_request(token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/ai-assist")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
