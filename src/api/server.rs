//! HTTP Server implementation
//!
//! This module provides the HTTP server using Axum framework with:
//! - Configurable host/port binding
//! - Graceful shutdown handling
//! - Request body limits
//! - CORS support

use crate::api::handlers::AppState;
use crate::api::middleware::trace_id_middleware;
use crate::api::routes::build_api_routes;
use crate::core::compiler::LatexCompiler;
use crate::core::config::ServerConfig;
use crate::core::Config;
use axum::{extract::DefaultBodyLimit, http::HeaderValue, middleware, Router};
use std::net::SocketAddr;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// HTTP API Server
pub struct ApiServer {
    router: Router,
    config: ServerConfig,
}

impl ApiServer {
    /// Create a new API server with the given configuration
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let router = Self::build_router(&config);

        Ok(Self {
            router,
            config: config.server,
        })
    }

    /// Build the Axum router with all routes and middleware
    pub fn build_router(config: &Config) -> Router {
        let state = AppState::new(LatexCompiler::new(config.compiler.clone()));

        build_api_routes(state).layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(trace_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(Self::build_cors_layer(&config.security.allowed_origins))
                .layer(DefaultBodyLimit::max(config.server.body_limit_bytes)),
        )
    }

    /// Build CORS layer from allowed origins configuration
    fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
        use tower_http::cors::Any;

        let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

        if allowed_origins.iter().any(|origin| origin == "*") {
            cors.allow_origin(Any)
        } else {
            let origins: Vec<HeaderValue> = allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            cors.allow_origin(origins)
        }
    }

    /// Start the HTTP server and listen for requests
    ///
    /// This method will block until the server is shut down gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr.parse()?;

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;

        info!(addr = %socket_addr, "HTTP server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server shut down gracefully");

        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Initiating graceful shutdown...");
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::api::models::{CompileStatusResponse, CompilerHealthResponse};
    use crate::api::TRACE_ID_HEADER;
    use crate::core::compiler::test_support::*;
    use crate::core::ErrorResponse;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::json;
    use std::path::Path;
    use tower::util::ServiceExt;

    const MINIMAL: &str = "\\documentclass{article}\\begin{document}Hello World!\\end{document}";
    const MALFORMED: &str = "\\documentclass{article}\\begin{document}\\begin{itemize}\\end{document}";

    fn app(scratch: &Path, script: &str) -> Router {
        let mut config = Config::defaults().unwrap();
        config.compiler = fake_config(scratch, script);
        ApiServer::build_router(&config)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(scratch.path(), SUCCESS_SCRIPT)
            .oneshot(get("/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(TRACE_ID_HEADER));
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_compile_returns_pdf() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(scratch.path(), SUCCESS_SCRIPT)
            .oneshot(post_json(
                "/compile",
                json!({"content": MINIMAL, "filename": "simple_test"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=simple_test.pdf"
        );
        let pdf = body_bytes(response).await;
        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(scratch_entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_compile_uses_default_filename() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(scratch.path(), SUCCESS_SCRIPT)
            .oneshot(post_json("/compile", json!({"content": MINIMAL})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=document.pdf"
        );
    }

    #[tokio::test]
    async fn test_compile_rejects_empty_content() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(scratch.path(), SUCCESS_SCRIPT)
            .oneshot(post_json("/compile", json!({"content": "", "filename": "doc"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.kind, "ValidationError");
        assert!(body.log.is_empty());
        assert_eq!(scratch_entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_compile_rejects_path_traversal() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(scratch.path(), SUCCESS_SCRIPT)
            .oneshot(post_json(
                "/compile",
                json!({"content": MINIMAL, "filename": "../../etc/evil"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.kind, "ValidationError");
    }

    #[tokio::test]
    async fn test_compile_rejects_malformed_json() {
        let scratch = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/compile")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app(scratch.path(), SUCCESS_SCRIPT)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.kind, "ValidationError");
    }

    #[tokio::test]
    async fn test_compile_failure_returns_log() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(scratch.path(), FAILURE_SCRIPT)
            .oneshot(post_json(
                "/compile",
                json!({"content": MALFORMED, "filename": "invalid"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.kind, "CompileError");
        assert!(body.log.contains("! LaTeX Error: Environment itemize undefined."));
        assert_eq!(scratch_entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_compile_status_reports_failure() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(scratch.path(), FAILURE_SCRIPT)
            .oneshot(post_json(
                "/compile-status",
                json!({"content": MALFORMED, "filename": "invalid"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: CompileStatusResponse = body_json(response).await;
        assert!(!body.success);
        assert_eq!(body.exit_code, 1);
        assert!(body.log.contains("! LaTeX Error: Environment itemize undefined."));
        assert_eq!(body.message, "Compilation failed");
    }

    #[tokio::test]
    async fn test_compile_status_reports_success() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(scratch.path(), SUCCESS_SCRIPT)
            .oneshot(post_json(
                "/compile-status",
                json!({"content": MINIMAL, "filename": "status"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: CompileStatusResponse = body_json(response).await;
        assert!(body.success);
        assert_eq!(body.exit_code, 0);
        assert!(body.log.contains("fake-latex pass 2 on status.tex"));
        assert_eq!(scratch_entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_compile_status_always_ok() {
        let scratch = tempfile::tempdir().unwrap();
        let app = app(scratch.path(), SUCCESS_SCRIPT);

        let response = app
            .clone()
            .oneshot(post_json("/compile-status", json!({"content": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: CompileStatusResponse = body_json(response).await;
        assert!(!body.success);
        assert_eq!(body.exit_code, -1);

        let request = Request::builder()
            .method("POST")
            .uri("/compile-status")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("[]"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: CompileStatusResponse = body_json(response).await;
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_compile_timeout_cleans_up() {
        let scratch = tempfile::tempdir().unwrap();
        let mut config = Config::defaults().unwrap();
        config.compiler = fake_config(scratch.path(), SLOW_SCRIPT);
        config.compiler.timeout_secs = 1;
        let app = ApiServer::build_router(&config);

        let response = app
            .oneshot(post_json("/compile", json!({"content": MINIMAL, "filename": "slow"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.kind, "TimeoutError");
        assert_eq!(scratch_entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_health_unaffected_by_failures() {
        let scratch = tempfile::tempdir().unwrap();
        let app = app(scratch.path(), FAILURE_SCRIPT);

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(post_json("/compile", json!({"content": MALFORMED})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_concurrent_requests_same_filename() {
        let scratch = tempfile::tempdir().unwrap();
        let app = app(scratch.path(), SUCCESS_SCRIPT);

        let (first, second) = tokio::join!(
            app.clone().oneshot(post_json(
                "/compile",
                json!({"content": "alpha content", "filename": "same"}),
            )),
            app.clone().oneshot(post_json(
                "/compile",
                json!({"content": "beta content", "filename": "same"}),
            )),
        );

        let first = String::from_utf8(body_bytes(first.unwrap()).await).unwrap();
        let second = String::from_utf8(body_bytes(second.unwrap()).await).unwrap();

        assert!(first.starts_with("%PDF-") && first.contains("alpha content"));
        assert!(!first.contains("beta content"));
        assert!(second.starts_with("%PDF-") && second.contains("beta content"));
        assert!(!second.contains("alpha content"));
        assert_eq!(scratch_entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_compiler_health() {
        let scratch = tempfile::tempdir().unwrap();

        let mut config = Config::defaults().unwrap();
        config.compiler = fake_config(scratch.path(), SUCCESS_SCRIPT);
        config.compiler.program = "true".to_string();
        let response = ApiServer::build_router(&config)
            .oneshot(get("/health/compiler"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: CompilerHealthResponse = body_json(response).await;
        assert!(body.available);
        assert_eq!(body.compiler, "true");

        config.compiler.program = "definitely-not-a-latex-binary".to_string();
        let response = ApiServer::build_router(&config)
            .oneshot(get("/health/compiler"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: CompilerHealthResponse = body_json(response).await;
        assert!(!body.available);
        assert_eq!(body.status, "unavailable");
    }

    #[test]
    fn test_api_server_creation() {
        let config = Config::defaults().unwrap();
        let server = ApiServer::new(config);
        assert!(server.is_ok());
    }
}
