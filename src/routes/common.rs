//! Common routes: health, readiness, version, and the CORS policy applied to the whole app.

use crate::response::{success, Envelope, RetCode};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> Envelope {
    match state.gateway.ping().await {
        Ok(()) => success("ready", json!({ "database": "ok" })),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            Envelope::new(
                RetCode::ServiceUnavailable,
                "database unavailable",
                json!({ "database": "unavailable" }),
            )
        }
    }
}

async fn version() -> Json<serde_json::Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health, GET /ready (gateway ping), GET /version.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}

/// Any origin; the methods the resource routes use; Content-Type and Authorization headers.
/// Preflight requests are answered by the layer.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
