use crate::api::models::{CompilerHealthResponse, HealthResponse};
use super::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// Handler for GET /health - Liveness probe
///
/// Fixed answer with no side effects, so earlier compile failures never affect it.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Handler for GET /health/compiler - Readiness of the LaTeX toolchain
pub async fn compiler_health(
    State(state): State<AppState>,
) -> (StatusCode, Json<CompilerHealthResponse>) {
    let available = state.compiler.check_available().await;

    let (status_code, status) = if available {
        (StatusCode::OK, "ok")
    } else {
        tracing::warn!(compiler = state.compiler.program(), "LaTeX compiler unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        status_code,
        Json(CompilerHealthResponse {
            status: status.to_string(),
            compiler: state.compiler.program().to_string(),
            available,
        }),
    )
}
