use std::net::SocketAddr;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{api::router::ApiRoutes, app_state::SharedAppState};

pub async fn setup_http_server(
    app_state: SharedAppState,
    bind_address: &str,
) -> anyhow::Result<tokio::task::JoinHandle<anyhow::Result<()>>> {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    let app = ApiRoutes::create(app_state.clone()).layer(cors);

    info!("API server starting at {}", &bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    let stop_flag = app_state.stop_flag.clone();
    let handle = tokio::spawn({
        let stop_flag = stop_flag.clone();
        async move {
            info!("Starting HTTP server");
            // Connect info is required so the pipeline can see the peer
            // address when no forwarded-for header is present.
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown({
                let stop_flag = stop_flag.clone();
                async move {
                    stop_flag.wait().await;
                    info!("Stop flag was set, shutting down HTTP server gracefully");
                }
            })
            .await?;
            info!("HTTP server is down");
            Ok::<(), anyhow::Error>(())
        }
    });

    Ok(handle)
}
