use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use ca_service::{ServiceError, SyncOptions};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::AppState;

const DEFAULT_LATEST_LIMIT: usize = 10;
const MAX_LATEST_LIMIT: usize = 100;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.service.store().ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "error": e.to_string() })),
            )
        }
    }
}

pub async fn start_sync(
    State(state): State<Arc<AppState>>,
    body: Option<Json<SyncOptions>>,
) -> impl IntoResponse {
    let options = body.map(|Json(options)| options).unwrap_or_default();
    match state.service.start_with(options).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "status": "started" }))),
        Err(e @ ServiceError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": e.to_string() })),
        ),
        Err(e) => {
            error!(error = %e, "failed to start sync");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

pub async fn sync_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.progress().await)
}

pub async fn sync_result(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.service.result().await {
        Some(report) => Json(report).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no sync result available" })),
        )
            .into_response(),
    }
}

pub async fn cancel_sync(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cancelled = state.service.cancel().await;
    Json(json!({ "cancelled": cancelled }))
}

#[derive(Debug, Deserialize)]
pub struct LatestParams {
    pub limit: Option<usize>,
}

pub async fn latest_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LatestParams>,
) -> impl IntoResponse {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LATEST_LIMIT)
        .min(MAX_LATEST_LIMIT);
    match state.service.latest_articles(limit).await {
        Ok(articles) => Json(articles).into_response(),
        Err(e) => {
            error!(error = %e, "failed to load latest articles");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
