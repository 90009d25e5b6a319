use serde::{Deserialize, Serialize};

/// Response for GET /health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Response for GET /health/compiler
#[derive(Debug, Serialize, Deserialize)]
pub struct CompilerHealthResponse {
    /// "ok" or "unavailable"
    pub status: String,
    /// Configured compiler binary
    pub compiler: String,
    pub available: bool,
}
