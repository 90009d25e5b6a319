//! REST API module
//!
//! This module provides the HTTP server and endpoints including:
//! - Routing for compile, compile-status and health probes
//! - Trace ID middleware
//! - Request/response models

pub mod server;
pub mod routes;
pub mod middleware;
pub mod handlers;
pub mod models;

pub use server::ApiServer;
pub use handlers::AppState;
pub use models::{CompileRequest, CompileStatusResponse};
pub use middleware::{trace_id_middleware, TraceId, TRACE_ID_HEADER};
