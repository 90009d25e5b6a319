//! API routes

use crate::api::handlers::{compile, compile_status, compiler_health, health_check, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the API routes
pub fn build_api_routes(state: AppState) -> Router {
    Router::new()
        // Probes
        .route("/health", get(health_check))
        .route("/health/compiler", get(compiler_health))
        // Compilation
        .route("/compile", post(compile))
        .route("/compile-status", post(compile_status))
        .with_state(state)
}
