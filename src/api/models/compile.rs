use crate::core::error::LatexError;
use crate::core::CompileResult;
use serde::{Deserialize, Serialize};

fn default_filename() -> String {
    "document".to_string()
}

/// Request body for POST /compile and POST /compile-status
#[derive(Debug, Clone, Deserialize)]
pub struct CompileRequest {
    /// LaTeX source text
    pub content: String,
    /// Base name without extension, used for `<filename>.tex` and `<filename>.pdf`
    #[serde(default = "default_filename")]
    pub filename: String,
}

/// Response for POST /compile-status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileStatusResponse {
    pub success: bool,
    pub exit_code: i32,
    pub log: String,
    pub message: String,
}

impl From<CompileResult> for CompileStatusResponse {
    fn from(result: CompileResult) -> Self {
        let success = result.succeeded();
        let message = if success {
            "Compilation successful".to_string()
        } else if result.exit_code == 0 {
            "Compilation failed: PDF file was not created".to_string()
        } else {
            "Compilation failed".to_string()
        };

        Self {
            success,
            exit_code: result.exit_code,
            log: result.log,
            message,
        }
    }
}

impl From<LatexError> for CompileStatusResponse {
    fn from(error: LatexError) -> Self {
        Self {
            success: false,
            exit_code: error.exit_code(),
            log: error.log().to_string(),
            message: error.to_string(),
        }
    }
}
