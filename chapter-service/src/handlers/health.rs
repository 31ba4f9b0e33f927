use crate::services::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub const WELCOME_MESSAGE: &str = "Welcome to Telangana Schools AI API";

pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": WELCOME_MESSAGE,
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "firestore_connected": state.chapters.is_connected()
    }))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let firestore = if state.chapters.is_connected() {
        "connected"
    } else {
        "disconnected"
    };

    Json(json!({
        "status": "healthy",
        "firestore": firestore
    }))
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
