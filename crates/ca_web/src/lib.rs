use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub async fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/sync", post(handlers::start_sync))
        .route("/api/sync/status", get(handlers::sync_status))
        .route("/api/sync/result", get(handlers::sync_result))
        .route("/api/sync/cancel", post(handlers::cancel_sync))
        .route("/api/articles/latest", get(handlers::latest_articles))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use crate::{create_app, AppState};
    pub use ca_service::{ServiceConfig, SyncService};
}
