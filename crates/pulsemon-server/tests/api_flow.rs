use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use pulsemon_notify::channels::slack::SlackChannel;
use pulsemon_notify::dispatcher::NotificationDispatcher;
use pulsemon_server::app::build_http_app;
use pulsemon_server::config::ServerConfig;
use pulsemon_server::state::AppState;
use pulsemon_storage::Store;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

async fn test_state() -> AppState {
    let mut config = ServerConfig::default();
    config.database.url = "sqlite::memory:".to_string();
    let store = Arc::new(Store::new(&config.database.url).await.expect("store"));

    // Slack only: a registered no-op, so dispatch has no network side effects.
    let mut dispatcher = NotificationDispatcher::new();
    dispatcher.register(Box::new(SlackChannel));

    AppState::build(Arc::new(config), store, Arc::new(dispatcher))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<(&str, bool)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((user_id, is_admin)) = user {
        builder = builder.header("x-user-id", user_id);
        if is_admin {
            builder = builder.header("x-user-role", "admin");
        }
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn rule_body() -> Value {
    json!({
        "name": "Failed payments spike",
        "description": "More than 5 failed payments in an hour",
        "metricType": "failed_payments",
        "condition": "GREATER_THAN",
        "threshold": 5.0,
        "timeWindow": 60,
        "aggregation": "COUNT",
        "severity": "CRITICAL",
        "channels": ["slack"]
    })
}

#[tokio::test]
async fn healthz_is_public() {
    let state = test_state().await;
    let app = build_http_app(state);
    let (status, body) = send(&app, "GET", "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_identity() {
    let state = test_state().await;
    let app = build_http_app(state);
    let (status, body) = send(&app, "GET", "/v1/rules", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["err_code"], 1002);
}

#[tokio::test]
async fn rule_crud_enforces_ownership_at_the_boundary() {
    let state = test_state().await;
    let app = build_http_app(state);
    let alice = Some(("alice", false));
    let bob = Some(("bob", false));
    let admin = Some(("root", true));

    let (status, body) = send(&app, "POST", "/v1/rules", alice, Some(rule_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    let rule_id = body["data"]["id"].as_str().unwrap().to_string();

    // List is scoped to the caller unless admin.
    let (_, body) = send(&app, "GET", "/v1/rules", alice, None).await;
    assert_eq!(body["data"]["total"], 1);
    let (_, body) = send(&app, "GET", "/v1/rules", bob, None).await;
    assert_eq!(body["data"]["total"], 0);
    let (_, body) = send(&app, "GET", "/v1/rules", admin, None).await;
    assert_eq!(body["data"]["total"], 1);

    // Non-owners cannot see or edit the rule.
    let uri = format!("/v1/rules/{rule_id}");
    let (status, _) = send(&app, "GET", &uri, bob, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(&app, "PUT", &uri, bob, Some(json!({"threshold": 1.0}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["err_code"], 1003);
    let (status, _) = send(&app, "DELETE", &uri, bob, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner can read and update.
    let (status, body) = send(&app, "GET", &uri, alice, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["metricType"], "failed_payments");
    assert_eq!(body["data"]["triggerCount"], 0);
    let (status, _) = send(&app, "PUT", &uri, alice, Some(json!({"threshold": 7.0}))).await;
    assert_eq!(status, StatusCode::OK);

    // Admins can delete someone else's rule.
    let (status, _) = send(&app, "DELETE", &uri, admin, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &uri, alice, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_rules_are_rejected() {
    let state = test_state().await;
    let app = build_http_app(state);
    let alice = Some(("alice", false));

    let mut bad = rule_body();
    bad["timeWindow"] = json!(0);
    let (status, _) = send(&app, "POST", "/v1/rules", alice, Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad = rule_body();
    bad["condition"] = json!("PERCENTAGE_INCREASE");
    let (status, _) = send(&app, "POST", "/v1/rules", alice, Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad = rule_body();
    bad["metricType"] = json!("no_such_metric");
    let (status, _) = send(&app, "POST", "/v1/rules", alice, Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metric_breach_flows_through_alert_lifecycle() {
    let state = test_state().await;
    let app = build_http_app(state.clone());
    let alice = Some(("alice", false));
    let ops = Some(("ops-1", false));

    let (status, _) = send(&app, "POST", "/v1/rules", alice, Some(rule_body())).await;
    assert_eq!(status, StatusCode::CREATED);

    // Seven failed payments in the window.
    let events: Vec<Value> = (0..7)
        .map(|i| json!({"metricType": "failed_payments", "entityId": format!("payment-{i}")}))
        .collect();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/metrics",
        alice,
        Some(json!({ "events": events })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["accepted"], 7);

    let summary = state.evaluator.run_batch(Utc::now()).await;
    assert_eq!(summary.triggered, 1);

    // The alert is visible with its trigger-time snapshot.
    let (status, body) = send(&app, "GET", "/v1/alerts?status=TRIGGERED", ops, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    let alert = &body["data"]["items"][0];
    assert_eq!(alert["metricValue"], 7.0);
    assert_eq!(alert["threshold"], 5.0);
    let alert_id = alert["id"].as_str().unwrap().to_string();

    // Acknowledge, then resolve.
    let ack_uri = format!("/v1/alerts/{alert_id}/acknowledge");
    let (status, body) = send(&app, "POST", &ack_uri, ops, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ACKNOWLEDGED");
    assert_eq!(body["data"]["acknowledgedById"], "ops-1");

    let resolve_uri = format!("/v1/alerts/{alert_id}/resolve");
    let (status, body) = send(
        &app,
        "POST",
        &resolve_uri,
        ops,
        Some(json!({"resolution": "card processor outage"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "RESOLVED");

    // Resolved alerts reject further transitions.
    let (status, body) = send(&app, "POST", &ack_uri, ops, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_code"], 1006);

    // Stats reflect the walk.
    let (status, body) = send(&app, "GET", "/v1/alerts/stats", ops, None).await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"];
    assert_eq!(stats["totalAlerts"], 1);
    assert_eq!(stats["triggeredAlerts"], 0);
    assert_eq!(stats["resolvedAlerts"], 1);
    assert_eq!(stats["alertsLast24Hours"], 1);
    assert_eq!(stats["alertsBySeverity"][0]["severity"], "CRITICAL");
    assert_eq!(stats["alertsBySeverity"][0]["count"], 1);
}

#[tokio::test]
async fn muted_rule_produces_no_alerts_until_unmuted() {
    let state = test_state().await;
    let app = build_http_app(state.clone());
    let alice = Some(("alice", false));

    let (_, body) = send(&app, "POST", "/v1/rules", alice, Some(rule_body())).await;
    let rule_id = body["data"]["id"].as_str().unwrap().to_string();

    let events: Vec<Value> = (0..7)
        .map(|_| json!({"metricType": "failed_payments"}))
        .collect();
    send(
        &app,
        "POST",
        "/v1/metrics",
        alice,
        Some(json!({ "events": events })),
    )
    .await;

    let mute_uri = format!("/v1/rules/{rule_id}/mute");
    let (status, _) = send(
        &app,
        "POST",
        &mute_uri,
        alice,
        Some(json!({"durationMinutes": 60})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let summary = state.evaluator.run_batch(Utc::now()).await;
    assert_eq!(summary.evaluated, 0);
    assert_eq!(summary.triggered, 0);

    let unmute_uri = format!("/v1/rules/{rule_id}/unmute");
    let (status, _) = send(&app, "POST", &unmute_uri, alice, None).await;
    assert_eq!(status, StatusCode::OK);

    let summary = state.evaluator.run_batch(Utc::now()).await;
    assert_eq!(summary.triggered, 1);

    // Quiet evaluation still stamps the check time.
    let rule_uri = format!("/v1/rules/{rule_id}");
    let (_, body) = send(&app, "GET", &rule_uri, alice, None).await;
    assert_eq!(body["data"]["triggerCount"], 1);
    assert!(!body["data"]["lastCheckedAt"].is_null());
}
