use axum::http::StatusCode;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Rejection reasons of the capture pipeline, ordered by stage. Exactly one
/// is reported per rejected request.
#[derive(Clone, Error, Debug)]
pub enum ApiError {
    #[error("This field is required.")]
    MissingEventName,

    #[error("This field is required.")]
    MissingApiKey,

    #[error("Invalid or inactive API key")]
    InvalidApiKey,

    #[error("Source '{0}' is not allowed for this tenant")]
    SourceNotAllowed(String),

    #[error("Rate limit exceeded for IP address")]
    IpQuotaExceeded { current_count: u64, limit: u64 },

    #[error("Rate limit exceeded for tenant '{slug}'")]
    TenantQuotaExceeded {
        slug: String,
        current_count: u64,
        limit: u64,
    },

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl ApiError {
    /// Field the error is keyed under in validation responses.
    fn field(&self) -> Option<&'static str> {
        match self {
            ApiError::MissingEventName => Some("event_name"),
            ApiError::MissingApiKey | ApiError::InvalidApiKey => Some("api_key"),
            ApiError::SourceNotAllowed(_) => Some("source"),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        if let Some(api_error) = e.downcast_ref::<ApiError>() {
            return api_error.clone();
        }
        ApiError::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            // Quota rejections are expected admission-control outcomes and
            // always carry enough detail for callers to back off.
            ApiError::IpQuotaExceeded {
                current_count,
                limit,
            }
            | ApiError::TenantQuotaExceeded {
                current_count,
                limit,
                ..
            } => {
                let body = serde_json::json!({
                    "error": self.to_string(),
                    "current_count": current_count,
                    "limit": limit,
                    "retry_after": "60 seconds",
                });
                (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
            }
            ApiError::InternalServerError(_) => {
                let body = serde_json::json!({ "error": true, "message": self.to_string() });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            // Validation and authentication failures use the field-keyed
            // shape: {"field": ["message"]}.
            _ => {
                let field = self.field().unwrap_or("non_field_errors");
                let body = serde_json::json!({ field: [self.to_string()] });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
        }
    }
}
