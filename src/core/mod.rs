//! Core application layer
//!
//! This module provides:
//! - Configuration management
//! - Structured logging system
//! - Error handling and type system
//! - Scratch workspaces and external compiler invocation

pub mod config;
pub mod logging;
pub mod error;
pub mod workspace;
pub mod compiler;

pub use config::Config;
pub use logging::Logger;
pub use error::{LatexError, ErrorResponse, Result};
pub use workspace::ScratchWorkspace;
pub use compiler::{CompileResult, CompileStage, LatexCompiler};
