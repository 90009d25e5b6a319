//! LaTeX Compile Server Library
//!
//! Accepts LaTeX source over HTTP, compiles it with an installed TeX engine in
//! a per-request scratch workspace, and returns the PDF or the compiler log.

pub mod api;
pub mod core;

// Re-export commonly used types
pub use api::ApiServer;
pub use crate::core::{Config, LatexCompiler, LatexError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
