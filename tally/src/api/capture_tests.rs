use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use tally_core::settings::sampling::SamplingSettings;
use tally_core::tenants::Tenant;

use crate::api::handlers::capture::capture_event_handler;
use crate::app_state::{AppState, SharedAppState};
use crate::ingest::pipeline::CaptureRequest;
use crate::settings::config::Settings;

const TEST_USER_AGENT: &str = "Mozilla/5.0 Test Browser";

fn demo_tenant(quota: u64) -> Tenant {
    Tenant {
        slug: "demo".to_string(),
        name: "Demo App".to_string(),
        api_key: "tk_demo".to_string(),
        secret_key: "sk_demo".to_string(),
        allowed_sources: vec![],
        rate_limit_per_minute: quota,
        is_active: true,
    }
}

async fn create_test_app_state(settings: Settings) -> SharedAppState {
    AppState::from_settings(settings).await.unwrap()
}

/// Drive the capture handler the way the router would, with a fixed peer
/// address and user-agent header.
async fn post_capture(state: &SharedAppState, payload: Value) -> (StatusCode, Value) {
    let peer: SocketAddr = "192.0.2.10:54321".parse().unwrap();
    let mut headers = HeaderMap::new();
    headers.insert("user-agent", HeaderValue::from_static(TEST_USER_AGENT));

    let payload: CaptureRequest = serde_json::from_value(payload).unwrap();
    let result =
        capture_event_handler(State(state.clone()), ConnectInfo(peer), headers, Json(payload))
            .await;
    let response = match result {
        Ok(ok) => ok.into_response(),
        Err(err) => err.into_response(),
    };

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

#[tokio::test]
async fn capture_returns_the_resolved_event_envelope() {
    let state = create_test_app_state(Settings {
        tenants: vec![demo_tenant(10)],
        ..Default::default()
    })
    .await;

    let (status, body) = post_capture(
        &state,
        json!({
            "event_name": "api_test_event",
            "api_key": "tk_demo",
            "properties": {"plan": "free"}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_string());
    assert_eq!(body["event_name"], "api_test_event");
    assert_eq!(body["message"], "Event captured successfully");
    assert_eq!(body["ip_address"], "192.0.2.10");
    assert_eq!(body["user_agent"], TEST_USER_AGENT);
    assert!(body["user_id"].as_str().unwrap().starts_with("anon_"));
    assert!(!body["session_id"].as_str().unwrap().is_empty());
    assert_eq!(body["rate_limit_info"]["ip_usage"], "1/100");
    assert_eq!(body["rate_limit_info"]["tenant_usage"], "1/10");
}

#[tokio::test]
async fn tenant_quota_of_two_admits_two_of_three_requests() {
    let state = create_test_app_state(Settings {
        tenants: vec![demo_tenant(2)],
        ..Default::default()
    })
    .await;

    let payload = json!({"event_name": "quota_test", "api_key": "tk_demo"});

    let (first, _) = post_capture(&state, payload.clone()).await;
    let (second, _) = post_capture(&state, payload.clone()).await;
    let (third, body) = post_capture(&state, payload).await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CREATED);
    assert_eq!(third, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded for tenant 'demo'");
    assert_eq!(body["current_count"], 3);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["retry_after"], "60 seconds");
}

#[tokio::test]
async fn missing_event_name_yields_a_field_error() {
    let state = create_test_app_state(Settings {
        tenants: vec![demo_tenant(10)],
        ..Default::default()
    })
    .await;

    let (status, body) = post_capture(&state, json!({"api_key": "tk_demo"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["event_name"][0], "This field is required.");
}

#[tokio::test]
async fn unknown_api_key_is_rejected_distinctly_from_a_missing_one() {
    let state = create_test_app_state(Settings {
        tenants: vec![demo_tenant(10)],
        ..Default::default()
    })
    .await;

    let (status, body) = post_capture(&state, json!({"event_name": "test_event"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["api_key"][0], "This field is required.");

    let (status, body) = post_capture(
        &state,
        json!({"event_name": "test_event", "api_key": "invalid_key"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["api_key"][0], "Invalid or inactive API key");
}

#[tokio::test]
async fn disallowed_source_names_the_offender() {
    let mut tenant = demo_tenant(10);
    tenant.allowed_sources = vec!["web".to_string(), "mobile".to_string()];
    let state = create_test_app_state(Settings {
        tenants: vec![tenant],
        ..Default::default()
    })
    .await;

    let (status, body) = post_capture(
        &state,
        json!({"event_name": "test_event", "api_key": "tk_demo", "source": "desktop"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["source"][0],
        "Source 'desktop' is not allowed for this tenant"
    );
}

#[tokio::test]
async fn same_client_gets_a_consistent_user_id_across_requests() {
    let state = create_test_app_state(Settings {
        tenants: vec![demo_tenant(10)],
        ..Default::default()
    })
    .await;

    let (_, first) = post_capture(
        &state,
        json!({"event_name": "test_1", "api_key": "tk_demo"}),
    )
    .await;
    let (_, second) = post_capture(
        &state,
        json!({"event_name": "test_2", "api_key": "tk_demo"}),
    )
    .await;

    assert_eq!(first["user_id"], second["user_id"]);
    // Session ids embed a fresh random suffix per request.
    assert_ne!(first["session_id"], second["session_id"]);
}

#[tokio::test]
async fn long_user_agents_are_echoed_truncated() {
    let state = create_test_app_state(Settings {
        tenants: vec![demo_tenant(10)],
        ..Default::default()
    })
    .await;

    let peer: SocketAddr = "192.0.2.10:54321".parse().unwrap();
    let long_agent = "X".repeat(150);
    let mut headers = HeaderMap::new();
    headers.insert("user-agent", HeaderValue::from_str(&long_agent).unwrap());

    let payload: CaptureRequest =
        serde_json::from_value(json!({"event_name": "ua_test", "api_key": "tk_demo"})).unwrap();
    let response =
        capture_event_handler(State(state.clone()), ConnectInfo(peer), headers, Json(payload))
            .await
            .unwrap()
            .into_response();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    let echoed = body["user_agent"].as_str().unwrap();
    assert_eq!(echoed.len(), 103);
    assert!(echoed.ends_with("..."));
}

#[tokio::test]
async fn sampled_out_capture_reports_success_without_an_id() {
    let state = create_test_app_state(Settings {
        tenants: vec![demo_tenant(10)],
        sampling: SamplingSettings {
            sample_rate: 0.0,
            ..Default::default()
        },
        ..Default::default()
    })
    .await;

    let (status, body) = post_capture(
        &state,
        json!({"event_name": "mouse_move", "api_key": "tk_demo"}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_null());
    assert_eq!(body["message"], "Event sampled out");
}
