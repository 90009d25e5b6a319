//! Per-request scratch workspace
//!
//! Every compile request gets its own uniquely named directory. The directory
//! is removed when the [`ScratchWorkspace`] is dropped, so success, failure,
//! timeout, panic and request cancellation all end with the directory gone.

use crate::core::error::{LatexError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const WORKSPACE_PREFIX: &str = "latex-";

/// Ephemeral directory owned by a single compile request
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: Option<TempDir>,
    stem: String,
}

impl ScratchWorkspace {
    /// Create a fresh workspace under `parent`, or the system temp dir when `None`
    ///
    /// `stem` must already be validated; it becomes `<stem>.tex` and `<stem>.pdf`.
    pub fn create(parent: Option<&Path>, stem: &str) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LatexError::Internal(format!("failed to prepare scratch root: {}", e))
                })?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| LatexError::Internal(format!("failed to create scratch workspace: {}", e)))?;

        debug!(workspace = %dir.path().display(), "Scratch workspace created");

        Ok(Self {
            dir: Some(dir),
            stem: stem.to_string(),
        })
    }

    /// Workspace directory, used as the compiler's working directory
    pub fn path(&self) -> &Path {
        // `dir` is only taken in `drop`
        self.dir
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Source file name relative to the workspace, passed to the compiler
    pub fn source_name(&self) -> String {
        format!("{}.tex", self.stem)
    }

    pub fn source_path(&self) -> PathBuf {
        self.path().join(self.source_name())
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.path().join(format!("{}.pdf", self.stem))
    }

    pub fn log_path(&self) -> PathBuf {
        self.path().join(format!("{}.log", self.stem))
    }

    /// Write the LaTeX source into the workspace
    pub async fn write_source(&self, content: &str) -> Result<()> {
        tokio::fs::write(self.source_path(), content)
            .await
            .map_err(|e| LatexError::Internal(format!("failed to write LaTeX source: {}", e)))
    }

    /// Read the produced PDF, `None` when it is missing or empty
    pub async fn read_pdf(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.pdf_path()).await {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LatexError::Internal(format!("failed to read generated PDF: {}", e))),
        }
    }

    /// Read the compiler's own `.log` file if it wrote one
    pub async fn read_compiler_log(&self) -> Option<String> {
        tokio::fs::read(self.log_path())
            .await
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!(
                    stage = "CLEANED_UP",
                    workspace = %path.display(),
                    "Scratch workspace cleaned up"
                ),
                Err(e) => warn!(
                    workspace = %path.display(),
                    error = %e,
                    "Failed to remove scratch workspace"
                ),
            }
        }
    }
}
