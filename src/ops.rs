//! Ops endpoints: liveness and engine counters over HTTP.

use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::engine::Engine;

/// Build the Axum router for the ops listener.
pub fn ops_routes(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/stats", get(stats))
        .with_state(engine)
}

// ── Handlers ────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pairchat"
    }))
}

async fn stats(State(engine): State<Arc<Engine>>) -> impl IntoResponse {
    Json(engine.stats().await)
}

// ── Tests ───────────────────────────────────────────────────────────
