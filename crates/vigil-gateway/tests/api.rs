// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway API tests driving the router in-process via tower.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use vigil_config::model::{DispatchConfig, RuleConfig, StorageConfig};
use vigil_core::types::{DeliveryState, EventType, IncidentStatus, dedupe_key};
use vigil_core::IncidentStore;
use vigil_dispatch::Dispatcher;
use vigil_gateway::{AuthConfig, GatewayState, HealthState, build_router};
use vigil_storage::SqliteStore;

const TOKEN: &str = "test-token";

struct TestApp {
    router: Router,
    store: Arc<SqliteStore>,
    _dir: tempfile::TempDir,
}

async fn make_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(StorageConfig {
        database_path: dir.path().join("api.db").to_string_lossy().to_string(),
        wal_mode: true,
    });
    store.initialize().await.unwrap();
    let store = Arc::new(store);

    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        HashMap::new(),
        DispatchConfig::default(),
    ));

    let (rules, errors) = vigil_rules::compile_rules(&[RuleConfig {
        name: "page-on-high".to_string(),
        min_severity: Some("high".to_string()),
        event_types: vec![],
        keyword: None,
        channels: vec!["email".to_string()],
        recipients: vec!["ops@example.com".to_string()],
    }]);
    assert!(errors.is_empty());

    let state = GatewayState {
        store: store.clone(),
        dispatcher,
        rules: Arc::new(rules),
        auth: AuthConfig {
            bearer_token: Some(TOKEN.to_string()),
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
        },
    };

    TestApp {
        router: build_router(state),
        store,
        _dir: dir,
    }
}

fn authed(request: axum::http::request::Builder) -> axum::http::request::Builder {
    request.header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_incident(app: &TestApp, severity: &str) -> serde_json::Value {
    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::post("/v1/incidents"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(
                    r#"{{"title": "checkout failing", "description": "payment 500s", "severity": "{severity}"}}"#
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn health_is_public() {
    let app = make_app().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn v1_requires_bearer_token() {
    let app = make_app().await;

    let missing = app
        .router
        .clone()
        .oneshot(Request::get("/v1/incidents").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = app
        .router
        .clone()
        .oneshot(
            Request::get("/v1/incidents")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let valid = app
        .router
        .clone()
        .oneshot(
            authed(Request::get("/v1/incidents"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(valid.status(), StatusCode::OK);
}

#[tokio::test]
async fn unconfigured_auth_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(StorageConfig {
        database_path: dir.path().join("x.db").to_string_lossy().to_string(),
        wal_mode: true,
    });
    store.initialize().await.unwrap();
    let store = Arc::new(store);
    let state = GatewayState {
        store: store.clone(),
        dispatcher: Arc::new(Dispatcher::new(
            store,
            HashMap::new(),
            DispatchConfig::default(),
        )),
        rules: Arc::new(vec![]),
        auth: AuthConfig { bearer_token: None },
        health: HealthState {
            start_time: std::time::Instant::now(),
        },
    };
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get("/v1/incidents")
                .header(header::AUTHORIZATION, "Bearer anything")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let app = make_app().await;
    let created = create_incident(&app, "medium").await;

    assert_eq!(created["status"], "open");
    assert_eq!(created["severity"], "medium");
    assert_eq!(created["version"], 1);
    let id = created["id"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::get(format!("/v1/incidents/{id}")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = json_body(response).await;
    assert_eq!(fetched["id"], id);
}

#[tokio::test]
async fn create_with_empty_title_is_rejected() {
    let app = make_app().await;
    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::post("/v1/incidents"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"title": "  ", "severity": "low"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_incident_is_404() {
    let app = make_app().await;
    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::get("/v1/incidents/ghost"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_and_rejects_bad_values() {
    let app = make_app().await;
    create_incident(&app, "low").await;
    create_incident(&app, "critical").await;

    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::get("/v1/incidents?severity=critical"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let bad = app
        .router
        .clone()
        .oneshot(
            authed(Request::get("/v1/incidents?severity=catastrophic"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn valid_transition_records_audit() {
    let app = make_app().await;
    let created = create_incident(&app, "medium").await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::put(format!("/v1/incidents/{id}/status")))
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-actor", "user-7")
                .body(Body::from(r#"{"status": "in_progress", "expected_version": 1}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = json_body(response).await;
    assert_eq!(updated["status"], "in_progress");
    assert_eq!(updated["version"], 2);

    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::get(format!("/v1/incidents/{id}/audit")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let audit = json_body(response).await;
    let items = audit["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["from"], "open");
    assert_eq!(items[0]["to"], "in_progress");
    assert_eq!(items[0]["actor"], "user-7");
}

#[tokio::test]
async fn open_to_closed_is_rejected_and_state_unchanged() {
    let app = make_app().await;
    let created = create_incident(&app, "medium").await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::put(format!("/v1/incidents/{id}/status")))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"status": "closed", "expected_version": 1}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("invalid transition"));

    let incident = app.store.get(id).await.unwrap();
    assert_eq!(incident.status, IncidentStatus::Open);
    assert_eq!(incident.version, 1);
    assert!(app.store.list_audit(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn stale_update_conflicts() {
    let app = make_app().await;
    let created = create_incident(&app, "medium").await;
    let id = created["id"].as_str().unwrap();

    let first = app
        .router
        .clone()
        .oneshot(
            authed(Request::put(format!("/v1/incidents/{id}")))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"expected_version": 1, "title": "first"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .router
        .clone()
        .oneshot(
            authed(Request::put(format!("/v1/incidents/{id}")))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"expected_version": 1, "title": "second"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_with_matching_severity_enqueues_notification() {
    let app = make_app().await;
    let created = create_incident(&app, "critical").await;
    let id = created["id"].as_str().unwrap();

    // The "page-on-high" rule fired: a pending event exists under the
    // deterministic dedupe key for (id, created, critical).
    let key = dedupe_key(id, EventType::Created, "critical");
    let (event, state) = app.store.get_event(&key).await.unwrap().unwrap();
    assert_eq!(state, DeliveryState::Pending);
    assert_eq!(event.recipients, vec!["ops@example.com"]);
}

#[tokio::test]
async fn create_below_threshold_enqueues_nothing() {
    let app = make_app().await;
    let created = create_incident(&app, "low").await;
    let id = created["id"].as_str().unwrap();

    let key = dedupe_key(id, EventType::Created, "low");
    assert!(app.store.get_event(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn comments_round_trip_and_notify_rules() {
    let app = make_app().await;
    let created = create_incident(&app, "high").await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::post(format!("/v1/incidents/{id}/comments")))
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-actor", "alice")
                .body(Body::from(r#"{"text": "rolling back"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment = json_body(response).await;
    assert_eq!(comment["author"], "alice");

    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::get(format!("/v1/incidents/{id}/comments")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn notify_for_unknown_incident_is_404() {
    let app = make_app().await;
    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::post("/v1/notify"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"incident_id": "ghost", "channels": ["email"],
                        "recipients": ["ops@example.com"], "subject": "manual"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notify_requires_channels_and_recipients() {
    let app = make_app().await;
    let created = create_incident(&app, "low").await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::post("/v1/notify"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(
                    r#"{{"incident_id": "{id}", "channels": [],
                        "recipients": ["ops@example.com"], "subject": "manual"}}"#
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
