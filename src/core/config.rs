//! Configuration management

use clap::Parser;
use config::{builder::DefaultState, Config as ConfigBuilder, ConfigBuilder as Builder};
use config::{ConfigError as BuilderError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server configuration: {0}")]
    InvalidServer(String),

    #[error("Invalid compiler configuration: {0}")]
    InvalidCompiler(String),

    #[error("Invalid logging configuration: {0}")]
    InvalidLogging(String),

    #[error("Invalid security configuration: {0}")]
    InvalidSecurity(String),

    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

impl From<BuilderError> for ConfigError {
    fn from(err: BuilderError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub compiler: CompilerConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
}

impl Config {
    /// Load configuration with precedence: CLI args > Environment variables > Config file > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_args(CliArgs::parse())
    }

    /// Load configuration from already-parsed command-line arguments
    pub fn load_with_args(cli_args: CliArgs) -> Result<Self, ConfigError> {
        let mut builder = with_defaults(ConfigBuilder::builder())?;

        if let Some(config_path) = &cli_args.config {
            if !config_path.exists() {
                return Err(ConfigError::FileNotFound(
                    config_path.display().to_string(),
                ));
            }
            builder = builder.add_source(File::from(config_path.as_path()));
        }

        // Example: LATEX_COMPILER__TIMEOUT_SECS=60
        builder = builder.add_source(
            Environment::with_prefix("LATEX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = &cli_args.host {
            builder = builder.set_override("server.host", host.clone())?;
        }
        if let Some(port) = cli_args.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(program) = &cli_args.compiler {
            builder = builder.set_override("compiler.program", program.clone())?;
        }
        if let Some(timeout) = cli_args.timeout {
            builder = builder.set_override("compiler.timeout_secs", timeout)?;
        }
        if let Some(log_level) = &cli_args.log_level {
            builder = builder.set_override("logging.level", log_level.clone())?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path, filling gaps with defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let config: Config = with_defaults(ConfigBuilder::builder())?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults only, no file, environment or CLI sources
    pub fn defaults() -> Result<Self, ConfigError> {
        let config: Config = with_defaults(ConfigBuilder::builder())?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.compiler.validate()?;
        self.logging.validate()?;
        self.security.validate()?;
        Ok(())
    }
}

fn with_defaults(
    builder: Builder<DefaultState>,
) -> Result<Builder<DefaultState>, ConfigError> {
    Ok(builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000)?
        .set_default("server.body_limit_bytes", 4 * 1024 * 1024)?
        .set_default("compiler.program", "pdflatex")?
        .set_default(
            "compiler.args",
            vec!["-interaction=nonstopmode", "-no-shell-escape"],
        )?
        .set_default("compiler.passes", 2)?
        .set_default("compiler.timeout_secs", 30)?
        .set_default("compiler.max_log_bytes", 64 * 1024)?
        .set_default("compiler.max_content_bytes", 2 * 1024 * 1024)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "json")?
        .set_default("logging.output", "stdout")?
        .set_default("logging.max_backups", 5)?
        .set_default("security.allowed_origins", vec!["*"])?)
}

/// Command-line arguments for configuration override
#[derive(Debug, Default, Parser)]
#[command(name = "latex-server")]
#[command(about = "LaTeX to PDF compilation server", long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server host address
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// LaTeX compiler binary
    #[arg(long, value_name = "PROGRAM")]
    pub compiler: Option<String>,

    /// Compilation timeout in seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::InvalidServer("host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidServer("port must be greater than 0".to_string()));
        }

        if self.body_limit_bytes == 0 {
            return Err(ConfigError::InvalidServer(
                "body_limit_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub passes: u32,
    pub timeout_secs: u64,
    pub max_log_bytes: usize,
    pub max_content_bytes: usize,
    /// Parent directory for scratch workspaces, system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
}

impl CompilerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.program.trim().is_empty() {
            return Err(ConfigError::InvalidCompiler("program cannot be empty".to_string()));
        }

        if self.passes == 0 {
            return Err(ConfigError::InvalidCompiler("passes must be greater than 0".to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidCompiler(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.max_log_bytes == 0 {
            return Err(ConfigError::InvalidCompiler(
                "max_log_bytes must be greater than 0".to_string(),
            ));
        }

        if self.max_content_bytes == 0 {
            return Err(ConfigError::InvalidCompiler(
                "max_content_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
    pub log_file: Option<PathBuf>,
    pub max_backups: usize,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "level must be one of: {:?}",
                valid_levels
            )));
        }

        let valid_formats = ["json", "text"];
        if !valid_formats.contains(&self.format.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "format must be one of: {:?}",
                valid_formats
            )));
        }

        let valid_outputs = ["stdout", "file"];
        if !valid_outputs.contains(&self.output.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "output must be one of: {:?}",
                valid_outputs
            )));
        }

        if self.output == "file" && self.log_file.is_none() {
            return Err(ConfigError::InvalidLogging(
                "log_file must be specified when output is 'file'".to_string(),
            ));
        }

        if self.max_backups == 0 {
            return Err(ConfigError::InvalidLogging(
                "max_backups must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl SecurityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_origins.is_empty() {
            return Err(ConfigError::InvalidSecurity(
                "allowed_origins cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
