//! The capture pipeline.
//!
//! Stages run in a fixed order and fail fast; only one rejection reason is
//! ever reported per request:
//!
//! 1. IP admission
//! 2. payload validation
//! 3. tenant authentication
//! 4. source authorization
//! 5. identity resolution
//! 6. server-side metadata override
//! 7. tenant admission
//! 8. sampling
//! 9. persistence

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use tally_core::counters::Scope;
use tally_core::events::{Event, StoredEvent};
use tally_core::identity::{self, RequestSignals};

use crate::api::error::ApiError;
use crate::app_state::SharedAppState;

/// Capture payload as sent by client applications.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CaptureRequest {
    #[serde(default)]
    pub event_name: String,
    pub source: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub properties: HashMap<String, Value>,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    /// Accepted for wire compatibility, always replaced with the
    /// transport-observed value.
    pub user_agent: Option<String>,
    /// Accepted for wire compatibility, always replaced with the
    /// transport-observed value.
    pub ip_address: Option<String>,
}

/// Network facts observed directly from the transport layer.
#[derive(Debug, Clone)]
pub struct TransportMeta {
    pub peer_ip: String,
    pub forwarded_for: Option<String>,
    pub user_agent: Option<String>,
}

impl TransportMeta {
    /// Client address: first entry of the forwarded-for chain when present,
    /// else the direct peer address.
    pub fn client_ip(&self) -> String {
        self.forwarded_for
            .as_deref()
            .and_then(|chain| chain.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .unwrap_or_else(|| self.peer_ip.clone())
    }
}

/// Rate-limit usage reported on successful captures.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RateLimitInfo {
    pub ip_usage: String,
    pub tenant_usage: String,
}

/// Outcome of a completed pipeline run. A sampled-out event is a success
/// that persisted nothing.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub persisted: Option<StoredEvent>,
    pub event_name: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub session_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub rate_limits: RateLimitInfo,
}

/// Run the admission pipeline for one capture request.
#[instrument(skip(state, payload, meta), fields(event_name = %payload.event_name))]
pub async fn capture(
    state: &SharedAppState,
    payload: CaptureRequest,
    meta: &TransportMeta,
) -> Result<CaptureOutcome, ApiError> {
    let received_at = Utc::now();
    let client_ip = meta.client_ip();

    // IP admission. The counter is incremented even when the request ends up
    // rejected, so abusive sources stay measurable.
    let ip_decision = state
        .rate_limiter
        .check(
            Scope::Ip,
            &client_ip,
            state.settings.ingest.ip_limit_per_minute,
        )
        .await?;
    if !ip_decision.allowed {
        return Err(ApiError::IpQuotaExceeded {
            current_count: ip_decision.current_count,
            limit: ip_decision.limit,
        });
    }

    // Payload validation.
    if payload.event_name.trim().is_empty() {
        return Err(ApiError::MissingEventName);
    }
    let source = payload
        .source
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| state.settings.ingest.default_source.clone());

    // Tenant authentication.
    let api_key = payload
        .api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or(ApiError::MissingApiKey)?;
    let tenant = state
        .tenants
        .find_by_api_key(api_key)
        .await
        .ok_or(ApiError::InvalidApiKey)?;

    // Source authorization.
    if !tenant.allows_source(&source) {
        return Err(ApiError::SourceNotAllowed(source));
    }

    // Identity resolution from the transport-observed signals.
    let user_agent = meta.user_agent.clone().unwrap_or_default();
    let signals = RequestSignals {
        ip_address: Some(client_ip.clone()).filter(|ip| !ip.is_empty()),
        user_agent: Some(user_agent.clone()).filter(|ua| !ua.is_empty()),
    };
    let resolved = identity::resolve(&signals, payload.user_id.clone(), payload.session_id.clone());

    // Server-side metadata override: client-asserted ip_address/user_agent
    // fields are never trusted.
    let ip_address = client_ip;

    // Tenant admission, against the tenant's own quota.
    let tenant_decision = state
        .rate_limiter
        .check(Scope::Tenant, &tenant.slug, tenant.rate_limit_per_minute)
        .await?;
    if !tenant_decision.allowed {
        return Err(ApiError::TenantQuotaExceeded {
            slug: tenant.slug.clone(),
            current_count: tenant_decision.current_count,
            limit: tenant_decision.limit,
        });
    }

    let rate_limits = RateLimitInfo {
        ip_usage: ip_decision.usage(),
        tenant_usage: tenant_decision.usage(),
    };
    let timestamp = payload.timestamp.unwrap_or(received_at);

    // Sampling: high-frequency noise is thinned. The drop is a success, not
    // an error.
    if !state.sampling.should_sample(&payload.event_name) {
        debug!(event_name = %payload.event_name, "event sampled out");
        return Ok(CaptureOutcome {
            persisted: None,
            event_name: payload.event_name,
            timestamp,
            user_id: resolved.user_id,
            session_id: resolved.session_id,
            ip_address,
            user_agent,
            rate_limits,
        });
    }

    // Persistence. Store failures are propagated unchanged.
    let event = Event {
        event_name: payload.event_name.clone(),
        source,
        tenant: tenant.slug,
        timestamp,
        properties: payload.properties,
        user_id: resolved.user_id.clone(),
        session_id: resolved.session_id.clone(),
        ip_address: ip_address.clone(),
        user_agent: user_agent.clone(),
    };
    let stored = state.events.persist(event).await?;

    Ok(CaptureOutcome {
        persisted: Some(stored),
        event_name: payload.event_name,
        timestamp,
        user_id: resolved.user_id,
        session_id: resolved.session_id,
        ip_address,
        user_agent,
        rate_limits,
    })
}
