mod handlers;
mod state;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use state::{AppState, SharedDataset, SharedGeocoder};

pub fn build_router(dataset: SharedDataset, online: SharedGeocoder) -> Router {
    let state = Arc::new(AppState::new(dataset, online));

    Router::new()
        .route("/api/place", get(handlers::place))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start(
    host: &str,
    port: u16,
    dataset: SharedDataset,
    online: SharedGeocoder,
) -> std::io::Result<()> {
    let app = build_router(dataset, online);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("geoplace server listening on http://{}", addr);

    axum::serve(listener, app).await
}
