use axum::routing::get;
use axum::routing::post;
use axum::Router;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers::capture::__path_capture_event_handler;
use crate::api::handlers::capture::capture_event_handler;
use crate::api::handlers::capture::CaptureResponse;
use crate::api::handlers::health::__path_health_checker_handler;
use crate::api::handlers::health::health_checker_handler;
use crate::app_state::SharedAppState;
use crate::ingest::pipeline::{CaptureRequest, RateLimitInfo};

#[derive(OpenApi)]
#[openapi(
    paths(capture_event_handler, health_checker_handler),
    components(schemas(CaptureRequest, CaptureResponse, RateLimitInfo)),
    tags(
        (name = "tally", description = "Analytics event ingestion API")
    )
)]
pub struct ApiDoc;

pub struct ApiRoutes;

impl ApiRoutes {
    pub fn create(app_state: SharedAppState) -> Router {
        Router::new()
            .route("/api/v1/capture", post(capture_event_handler))
            .route("/api/v1/health", get(health_checker_handler))
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .with_state(app_state)
    }
}
