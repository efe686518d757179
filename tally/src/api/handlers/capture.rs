use std::net::SocketAddr;

use axum::{
    debug_handler,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use tally_core::utils::format::truncate_with_ellipsis;

use crate::api::error::ApiError;
use crate::app_state::SharedAppState;
use crate::ingest::pipeline::{self, CaptureRequest, RateLimitInfo, TransportMeta};

/// Maximum user-agent length echoed back in capture responses.
const USER_AGENT_ECHO_LIMIT: usize = 100;

#[derive(Debug, Serialize, ToSchema)]
pub struct CaptureResponse {
    /// Persisted event id; null when the event was sampled out.
    pub id: Option<Uuid>,
    pub event_name: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub session_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub rate_limit_info: RateLimitInfo,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/capture",
    request_body = CaptureRequest,
    responses(
    (status = 201, description = "Event captured (or sampled out)", body = CaptureResponse),
    (status = 400, description = "Validation or authentication error"),
    (status = 429, description = "IP or tenant quota exceeded"),
    )
)]
#[debug_handler]
pub async fn capture_event_handler(
    State(state): State<SharedAppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<CaptureRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let meta = TransportMeta {
        peer_ip: peer.ip().to_string(),
        forwarded_for: header_value(&headers, "x-forwarded-for"),
        user_agent: header_value(&headers, header::USER_AGENT.as_str()),
    };

    let outcome = pipeline::capture(&state, payload, &meta).await?;

    let message = if outcome.persisted.is_some() {
        "Event captured successfully"
    } else {
        "Event sampled out"
    };
    let response = CaptureResponse {
        id: outcome.persisted.as_ref().map(|stored| stored.id),
        event_name: outcome.event_name,
        timestamp: outcome.timestamp,
        user_id: outcome.user_id,
        session_id: outcome.session_id,
        ip_address: outcome.ip_address,
        user_agent: truncate_with_ellipsis(&outcome.user_agent, USER_AGENT_ECHO_LIMIT),
        rate_limit_info: outcome.rate_limits,
        message: message.to_string(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}
