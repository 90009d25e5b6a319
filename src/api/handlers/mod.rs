pub mod compile;
pub mod system;

pub use compile::*;
pub use system::*;

use crate::core::compiler::LatexCompiler;
use std::sync::Arc;

/// Shared application state for handlers
///
/// Immutable after startup; each request gets its own workspace and process.
#[derive(Clone)]
pub struct AppState {
    pub compiler: Arc<LatexCompiler>,
}

impl AppState {
    pub fn new(compiler: LatexCompiler) -> Self {
        Self {
            compiler: Arc::new(compiler),
        }
    }
}
