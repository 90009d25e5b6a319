//! LaTeX Compile Server
//!
//! HTTP microservice that turns LaTeX source into PDF using an installed TeX distribution.

use latex_server::{api, core};

use anyhow::Result;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles CLI args, env vars, and config file)
    let config = match core::config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Print error to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Starting LaTeX Compile Server v{}", latex_server::VERSION);
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Server configuration"
    );
    info!(
        program = %config.compiler.program,
        passes = config.compiler.passes,
        timeout_secs = config.compiler.timeout_secs,
        scratch_dir = ?config.compiler.scratch_dir,
        "Compiler configuration"
    );

    // Requests still get a clear 503 when the compiler is missing, so this only warns
    let compiler = core::LatexCompiler::new(config.compiler.clone());
    if !compiler.check_available().await {
        warn!(program = %config.compiler.program, "LaTeX compiler not available at startup");
    }

    let server = api::ApiServer::new(config)?;
    info!("Server ready - starting to serve requests");

    server.serve().await?;

    Ok(())
}
