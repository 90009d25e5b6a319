//! External LaTeX compiler invocation
//!
//! A compile runs through these stages:
//! `RECEIVED -> WORKSPACE_CREATED -> COMPILING -> (SUCCEEDED | FAILED | TIMED_OUT) -> CLEANED_UP`.
//! The workspace is owned by the compile call, so `CLEANED_UP` is reached on
//! every path, including early returns and cancellation of the future.

use crate::core::config::CompilerConfig;
use crate::core::error::{LatexError, Result};
use crate::core::workspace::ScratchWorkspace;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

lazy_static! {
    static ref FILENAME_PATTERN: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").unwrap();
}

const TRUNCATION_MARKER: &str = "[... log truncated ...]\n";
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle stage of a single compile request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStage {
    Received,
    WorkspaceCreated,
    Compiling,
    Succeeded,
    Failed,
    TimedOut,
}

impl fmt::Display for CompileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompileStage::Received => "RECEIVED",
            CompileStage::WorkspaceCreated => "WORKSPACE_CREATED",
            CompileStage::Compiling => "COMPILING",
            CompileStage::Succeeded => "SUCCEEDED",
            CompileStage::Failed => "FAILED",
            CompileStage::TimedOut => "TIMED_OUT",
        };
        f.write_str(name)
    }
}

/// Outcome of a compile that ran to completion
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Exit code of the last compiler pass that ran, `-1` if it was killed by a signal
    pub exit_code: i32,
    /// Combined stdout and stderr of the last pass, bounded in length
    pub log: String,
    /// Produced PDF, only present when non-empty
    pub pdf: Option<Vec<u8>>,
    pub duration: Duration,
}

impl CompileResult {
    /// Exit code zero is not enough: some engines exit cleanly with no usable output
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && self.pdf.is_some()
    }

    /// Convert into the PDF bytes, or the compile error describing why there are none
    pub fn into_pdf(self) -> Result<Vec<u8>> {
        if self.exit_code != 0 {
            return Err(LatexError::CompilationFailed {
                exit_code: self.exit_code,
                log: self.log,
            });
        }

        self.pdf.ok_or(LatexError::MissingOutput { log: self.log })
    }
}

enum PassOutcome {
    Exited { exit_code: i32, log: String },
    TimedOut,
}

/// Runs the configured LaTeX compiler against request sources
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    config: CompilerConfig,
}

impl LatexCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn program(&self) -> &str {
        &self.config.program
    }

    /// Check whether the compiler binary can be started (`<program> --version`)
    pub async fn check_available(&self) -> bool {
        let status = Command::new(&self.config.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(AVAILABILITY_TIMEOUT, status).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!(program = %self.config.program, error = %e, "Compiler not startable");
                false
            }
            Err(_) => {
                warn!(program = %self.config.program, "Compiler version check timed out");
                false
            }
        }
    }

    /// Compile and return the PDF bytes, turning any unsuccessful run into an error
    pub async fn compile_pdf(&self, content: &str, filename: &str) -> Result<Vec<u8>> {
        self.compile(content, filename).await?.into_pdf()
    }

    /// Run the full compile pipeline
    ///
    /// Returns `Ok` whenever the compiler ran to completion, successful or not.
    /// Validation failures, timeouts and spawn/filesystem failures are errors.
    pub async fn compile(&self, content: &str, filename: &str) -> Result<CompileResult> {
        debug!(stage = %CompileStage::Received, filename, bytes = content.len());

        validate_content(content, self.config.max_content_bytes)?;
        validate_filename(filename)?;

        let started = Instant::now();
        let deadline = started + self.config.timeout();

        let workspace = ScratchWorkspace::create(self.config.scratch_dir.as_deref(), filename)?;
        debug!(stage = %CompileStage::WorkspaceCreated, filename);

        workspace.write_source(content).await?;

        let mut exit_code = 0;
        let mut log = String::new();

        for pass in 1..=self.config.passes {
            debug!(stage = %CompileStage::Compiling, pass, program = %self.config.program);

            match self.run_pass(&workspace, deadline).await? {
                PassOutcome::Exited {
                    exit_code: code,
                    log: pass_log,
                } => {
                    exit_code = code;
                    log = pass_log;
                    if code != 0 {
                        break;
                    }
                }
                PassOutcome::TimedOut => {
                    let partial = workspace.read_compiler_log().await.unwrap_or_default();
                    warn!(
                        stage = %CompileStage::TimedOut,
                        pass,
                        timeout_secs = self.config.timeout_secs,
                        "LaTeX compilation timed out"
                    );
                    return Err(LatexError::Timeout {
                        seconds: self.config.timeout_secs,
                        log: truncate_log(&partial, self.config.max_log_bytes),
                    });
                }
            }
        }

        let pdf = if exit_code == 0 {
            workspace.read_pdf().await?
        } else {
            None
        };

        let result = CompileResult {
            exit_code,
            log: truncate_log(&log, self.config.max_log_bytes),
            pdf,
            duration: started.elapsed(),
        };

        if result.succeeded() {
            info!(
                stage = %CompileStage::Succeeded,
                filename,
                pdf_bytes = result.pdf.as_ref().map_or(0, Vec::len),
                elapsed_ms = result.duration.as_millis() as u64,
                "LaTeX compilation succeeded"
            );
        } else {
            info!(
                stage = %CompileStage::Failed,
                filename,
                exit_code = result.exit_code,
                pdf_created = result.pdf.is_some(),
                elapsed_ms = result.duration.as_millis() as u64,
                "LaTeX compilation failed"
            );
        }

        Ok(result)
    }

    async fn run_pass(&self, workspace: &ScratchWorkspace, deadline: Instant) -> Result<PassOutcome> {
        let mut std_command = std::process::Command::new(&self.config.program);
        std_command
            .args(&self.config.args)
            .arg(workspace.source_name())
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group so a timeout can take down anything the engine spawned
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_command.process_group(0);
        }

        let mut command = Command::from(std_command);
        command.kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let waited = tokio::time::timeout_at(deadline, async {
            let (status, out, err) = tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
            Ok::<(ExitStatus, Vec<u8>, Vec<u8>), std::io::Error>((status?, out?, err?))
        })
        .await;

        match waited {
            Ok(Ok((status, out, err))) => {
                let exit_code = status.code().unwrap_or(-1);
                debug!(exit_code, "Compiler pass finished");
                Ok(PassOutcome::Exited {
                    exit_code,
                    log: combine_output(&out, &err),
                })
            }
            Ok(Err(e)) => {
                terminate(&mut child).await;
                Err(LatexError::Internal(format!("failed to collect compiler output: {}", e)))
            }
            Err(_) => {
                terminate(&mut child).await;
                Ok(PassOutcome::TimedOut)
            }
        }
    }

    fn spawn_error(&self, err: std::io::Error) -> LatexError {
        if err.kind() == std::io::ErrorKind::NotFound {
            LatexError::CompilerUnavailable(format!("{} not available", self.config.program))
        } else {
            LatexError::Internal(format!("failed to start {}: {}", self.config.program, err))
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

async fn terminate(child: &mut Child) {
    kill_process_group(child);

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Compiler process already gone");
    }
    if let Err(e) = child.wait().await {
        warn!(error = %e, "Failed to reap compiler process");
    }
}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    if let Some(pid) = child.id() {
        // SAFETY: kill(2) only signals the group created for this child; no memory is shared
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            debug!(pid, "Process group already exited");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    format!(
        "{}\n{}",
        String::from_utf8_lossy(stdout),
        String::from_utf8_lossy(stderr)
    )
}

/// Reject empty or oversized sources before any workspace is created
pub fn validate_content(content: &str, max_bytes: usize) -> Result<()> {
    if content.trim().is_empty() {
        return Err(LatexError::Validation("content cannot be empty".to_string()));
    }

    if content.len() > max_bytes {
        return Err(LatexError::Validation(format!(
            "content exceeds the maximum size of {} bytes",
            max_bytes
        )));
    }

    Ok(())
}

/// Accept only plain identifiers so the name can never escape the workspace
pub fn validate_filename(filename: &str) -> Result<()> {
    if FILENAME_PATTERN.is_match(filename) {
        Ok(())
    } else {
        Err(LatexError::Validation(
            "filename must be 1-64 letters, digits, '_' or '-', starting with a letter or digit"
                .to_string(),
        ))
    }
}

/// Keep the tail of the log, where LaTeX reports the fatal error
pub fn truncate_log(log: &str, max_bytes: usize) -> String {
    if log.len() <= max_bytes {
        return log.to_string();
    }

    let mut start = log.len() - max_bytes;
    while !log.is_char_boundary(start) {
        start += 1;
    }

    format!("{}{}", TRUNCATION_MARKER, &log[start..])
}
