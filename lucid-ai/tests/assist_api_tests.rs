//! Integration tests for the AI-assist endpoint
//!
//! Drive the router with `oneshot` against an in-memory database, a stub
//! auth provider and a stub gateway.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use helpers::{assist_request, extract_json, test_app, StubAuth, StubGateway, TestApp};
use lucid_ai::gateway::{ChatResponse, GatewayError};
use lucid_common::models::{Plan, SubscriptionStatus};
use lucid_common::usage;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

const FREE: &str = "free-token";
const PRO: &str = "pro-token";

fn clarify_output() -> Value {
    json!({
        "reformulation": "Partir ferme la porte au poste actuel.",
        "reversible_aspects": ["le lieu de vie"],
        "irreversible_aspects": ["la démission"],
        "questions": ["Qu'est-ce qui rendrait ce départ supportable ?"]
    })
}

fn body(module: &str, action: &str) -> Value {
    json!({
        "module": module,
        "action": action,
        "case_context": { "title": "Quitter Lyon", "entries": [] },
        "user_input": "Je pense démissionner.",
    })
}

async fn app_with(gateway: StubGateway) -> (TestApp, Uuid, Uuid) {
    let free_user = Uuid::new_v4();
    let pro_user = Uuid::new_v4();
    let auth = StubAuth::default()
        .with_user(FREE, free_user)
        .with_user(PRO, pro_user);
    let app = test_app(auth, gateway).await;

    usage::set_plan(
        &app.db,
        pro_user,
        Plan::Pro,
        SubscriptionStatus::Active,
        None,
        Utc::now(),
    )
    .await
    .unwrap();

    (app, free_user, pro_user)
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

async fn usage_count(app: &TestApp, user: Uuid) -> i64 {
    usage::get_subscription(&app.db, user)
        .await
        .unwrap()
        .map(|s| s.ai_usage_count)
        .unwrap_or(0)
}

async fn activity_rows(app: &TestApp, user: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM activity_log WHERE user_id = ?")
        .bind(user.to_string())
        .fetch_one(&app.db)
        .await
        .unwrap()
}

// =============================================================================
// Health and registry
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let (app, _, _) = app_with(StubGateway::answering(clarify_output())).await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "lucid-ai");
}

#[tokio::test]
async fn test_action_registry_listing() {
    let (app, _, _) = app_with(StubGateway::answering(clarify_output())).await;

    let request = Request::builder()
        .uri("/ai-assist/actions")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    let actions = body["actions"].as_array().unwrap();
    assert_eq!(actions.len(), lucid_ai::actions::all().len());
    let map = actions
        .iter()
        .find(|a| a["id"] == "map_consequences")
        .unwrap();
    assert_eq!(map["module"], "irreversa");
    assert_eq!(map["is_pro"], true);
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_missing_token_is_401() {
    let (app, _, _) = app_with(StubGateway::answering(clarify_output())).await;

    let (status, body) = send(&app, assist_request(None, &body("irreversa", "clarify_threshold"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
    assert_eq!(app.auth.call_count(), 0);
}

#[tokio::test]
async fn test_missing_token_wins_over_bad_body() {
    let (app, _, _) = app_with(StubGateway::answering(clarify_output())).await;

    let request = Request::builder()
        .method("POST")
        .uri("/ai-assist")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_is_401() {
    let (app, _, _) = app_with(StubGateway::answering(clarify_output())).await;

    let (status, _) = send(
        &app,
        assist_request(Some("forged"), &body("irreversa", "clarify_threshold")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.gateway.call_count(), 0);
}

// =============================================================================
// Request validation
// =============================================================================

#[tokio::test]
async fn test_unknown_action_is_400_before_any_call() {
    let (app, free_user, _) = app_with(StubGateway::answering(clarify_output())).await;

    let (status, body) = send(&app, assist_request(Some(FREE), &body("nulla", "predict_future"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["action"], "predict_future");
    assert_eq!(app.auth.call_count(), 0);
    assert_eq!(app.gateway.call_count(), 0);
    assert!(usage::get_subscription(&app.db, free_user).await.unwrap().is_none());
}

#[tokio::test]
async fn test_action_from_other_module_is_400() {
    let (app, _, _) = app_with(StubGateway::answering(clarify_output())).await;

    let (status, body) = send(&app, assist_request(Some(FREE), &body("silva", "clarify_threshold"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["module"], "silva");
    assert_eq!(app.gateway.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_body_with_token_is_400() {
    let (app, _, _) = app_with(StubGateway::answering(clarify_output())).await;

    let (status, body) = send(&app, assist_request(Some(FREE), &json!({ "module": "nulla" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// =============================================================================
// Plan gating and monthly allowance
// =============================================================================

#[tokio::test]
async fn test_free_user_pro_action_is_403() {
    let (app, free_user, _) = app_with(StubGateway::answering(json!({}))).await;

    let (status, body) = send(&app, assist_request(Some(FREE), &body("irreversa", "map_consequences"))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["requires_pro"], true);
    assert_eq!(app.gateway.call_count(), 0);
    assert_eq!(usage_count(&app, free_user).await, 0);
}

#[tokio::test]
async fn test_pro_gate_applies_even_when_allowance_is_spent() {
    let (app, free_user, _) = app_with(StubGateway::answering(json!({}))).await;
    usage::get_or_create_subscription(&app.db, free_user, Utc::now()).await.unwrap();
    sqlx::query("UPDATE subscriptions SET ai_usage_count = 5 WHERE user_id = ?")
        .bind(free_user.to_string())
        .execute(&app.db)
        .await
        .unwrap();

    let (status, _) = send(&app, assist_request(Some(FREE), &body("thresh", "threshold_timeline"))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_lapsed_pro_is_treated_as_free() {
    let (app, _, pro_user) = app_with(StubGateway::answering(json!({}))).await;
    usage::set_plan(
        &app.db,
        pro_user,
        Plan::Pro,
        SubscriptionStatus::Canceled,
        None,
        Utc::now(),
    )
    .await
    .unwrap();

    let (status, _) = send(&app, assist_request(Some(PRO), &body("irreversa", "map_consequences"))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_sixth_free_call_in_month_is_429() {
    let (app, free_user, _) = app_with(StubGateway::answering(clarify_output())).await;

    for expected_used in 1..=5 {
        let (status, body) =
            send(&app, assist_request(Some(FREE), &body("irreversa", "clarify_threshold"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["usage"]["plan"], "free");
        assert_eq!(body["usage"]["used"], expected_used);
        assert_eq!(body["usage"]["limit"], 5);
        assert_eq!(body["usage"]["remaining"], 5 - expected_used);
    }

    let (status, body) = send(&app, assist_request(Some(FREE), &body("nulla", "name_absence"))).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["used"], 5);
    assert_eq!(app.gateway.call_count(), 5);
    assert_eq!(usage_count(&app, free_user).await, 5);
}

#[tokio::test]
async fn test_counter_from_previous_month_is_reset() {
    let (app, free_user, _) = app_with(StubGateway::answering(clarify_output())).await;
    usage::get_or_create_subscription(&app.db, free_user, Utc::now()).await.unwrap();

    let last_month = Utc::now() - Duration::days(40);
    sqlx::query("UPDATE subscriptions SET ai_usage_count = 5, ai_usage_reset_at = ? WHERE user_id = ?")
        .bind(last_month)
        .bind(free_user.to_string())
        .execute(&app.db)
        .await
        .unwrap();

    let (status, body) = send(&app, assist_request(Some(FREE), &body("irreversa", "clarify_threshold"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["usage"]["used"], 1);

    let sub = usage::get_subscription(&app.db, free_user).await.unwrap().unwrap();
    assert_eq!(sub.ai_usage_count, 1);
    assert!(sub.ai_usage_reset_at > last_month);
}

#[tokio::test]
async fn test_pro_user_is_not_metered() {
    let (app, _, pro_user) = app_with(StubGateway::answering(json!({
        "consequences": [],
        "closed_options": [],
        "summary": "Rien d'irréversible."
    })))
    .await;

    for _ in 0..7 {
        let (status, body) =
            send(&app, assist_request(Some(PRO), &body("irreversa", "map_consequences"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usage"]["plan"], "pro");
        assert!(body["usage"]["limit"].is_null());
    }

    assert_eq!(usage_count(&app, pro_user).await, 0);
}

#[tokio::test]
async fn test_concurrent_free_requests_never_exceed_allowance() {
    let (app, free_user, _) = app_with(StubGateway::answering(clarify_output())).await;

    let mut handles = Vec::new();
    for _ in 0..12 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            router
                .oneshot(assist_request(Some(FREE), &body("irreversa", "clarify_threshold")))
                .await
                .unwrap()
                .status()
        }));
    }

    let mut ok = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(ok, 5);
    assert_eq!(limited, 7);
    assert_eq!(usage_count(&app, free_user).await, 5);
}

// =============================================================================
// Gateway failures
// =============================================================================

#[tokio::test]
async fn test_missing_tool_call_is_500_and_not_consumed() {
    let gateway = StubGateway::new(|_| {
        Ok(serde_json::from_value::<ChatResponse>(json!({
            "choices": [{ "message": { "content": "Voici ma réponse en prose." } }]
        }))
        .unwrap())
    });
    let (app, free_user, _) = app_with(gateway).await;

    let (status, body) = send(&app, assist_request(Some(FREE), &body("irreversa", "clarify_threshold"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert_eq!(usage_count(&app, free_user).await, 0);
    assert_eq!(activity_rows(&app, free_user).await, 0);
}

#[tokio::test]
async fn test_malformed_arguments_are_500_and_not_consumed() {
    let gateway = StubGateway::new(|req| {
        Ok(ChatResponse::with_tool_call(
            &req.tool_choice.function.name,
            "{\"reformulation\": ",
        ))
    });
    let (app, free_user, _) = app_with(gateway).await;

    let (status, _) = send(&app, assist_request(Some(FREE), &body("irreversa", "clarify_threshold"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(usage_count(&app, free_user).await, 0);
    assert_eq!(activity_rows(&app, free_user).await, 0);
}

#[tokio::test]
async fn test_gateway_status_codes_are_mapped() {
    for (upstream, expected) in [
        (429, StatusCode::TOO_MANY_REQUESTS),
        (402, StatusCode::PAYMENT_REQUIRED),
        (500, StatusCode::INTERNAL_SERVER_ERROR),
        (404, StatusCode::INTERNAL_SERVER_ERROR),
    ] {
        let (app, free_user, _) = app_with(StubGateway::failing_with_status(upstream)).await;

        let (status, body) =
            send(&app, assist_request(Some(FREE), &body("irreversa", "clarify_threshold"))).await;

        assert_eq!(status, expected, "upstream {}", upstream);
        assert!(body["error"].is_string());
        assert_eq!(usage_count(&app, free_user).await, 0, "upstream {}", upstream);
    }
}

#[tokio::test]
async fn test_network_failure_is_500() {
    let gateway = StubGateway::new(|_| Err(GatewayError::Network("connection reset".into())));
    let (app, _, _) = app_with(gateway).await;

    let (status, body) = send(&app, assist_request(Some(FREE), &body("nulla", "name_absence"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "AI gateway error");
}

// =============================================================================
// Success path details
// =============================================================================

#[tokio::test]
async fn test_success_returns_output_and_logs_activity() {
    let (app, free_user, _) = app_with(StubGateway::answering(clarify_output())).await;
    let case_id = Uuid::new_v4();

    let mut request_body = body("irreversa", "clarify_threshold");
    request_body["case_id"] = json!(case_id);
    let (status, body) = send(&app, assist_request(Some(FREE), &request_body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], clarify_output());

    let entries = lucid_common::activity::list_for_user(&app.db, free_user, 10)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "clarify_threshold");
    assert_eq!(entries[0].case_id, Some(case_id));
    assert_eq!(entries[0].metadata["model"], "test-model");
}

#[tokio::test]
async fn test_activity_write_failure_does_not_fail_request() {
    let (app, free_user, _) = app_with(StubGateway::answering(clarify_output())).await;
    sqlx::query("DROP TABLE activity_log")
        .execute(&app.db)
        .await
        .unwrap();

    let (status, body) = send(&app, assist_request(Some(FREE), &body("irreversa", "clarify_threshold"))).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["output"], clarify_output());
    assert_eq!(body["usage"]["used"], 1);
    assert_eq!(usage_count(&app, free_user).await, 1);
}

#[tokio::test]
async fn test_gateway_receives_forced_tool_and_context() {
    let (app, _, _) = app_with(StubGateway::answering(json!({
        "naming": "l'absence du père",
        "what_remains": [],
        "questions": []
    })))
    .await;

    let (status, _) = send(&app, assist_request(Some(FREE), &body("NULLA", "name_absence"))).await;
    assert_eq!(status, StatusCode::OK);

    let request = app.gateway.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.model, "test-model");
    assert_eq!(request.tools.len(), 1);
    assert_eq!(request.tools[0].function.name, "name_absence");
    assert_eq!(request.tool_choice.function.name, "name_absence");
    assert_eq!(request.messages[0].role, "system");

    let payload: Value = serde_json::from_str(&request.messages[1].content).unwrap();
    assert_eq!(payload["module"], "nulla");
    assert_eq!(payload["case_context"]["title"], "Quitter Lyon");
    assert_eq!(payload["user_input"], "Je pense démissionner.");
}
