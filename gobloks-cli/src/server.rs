//! Server command - start the game server
//!
//! ## Architecture
//!
//! - Level 1: run() - orchestration
//! - Level 2: configure_server(), start_server()
//! - Level 3: validate_static_dir()
//!
//! Flags override the `GOBLOKS_*` environment, which overrides defaults.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use gobloks_server::{run_server, ServerConfig};

// ============================================================================
// COMMAND ARGUMENTS
// ============================================================================

#[derive(Args)]
pub struct ServerArgs {
    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port number to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding the built web client
    #[arg(long)]
    pub static_dir: Option<String>,

    /// Milliseconds a disconnected player may take to come back
    #[arg(long = "grace-ms")]
    pub disconnect_grace_ms: Option<u64>,

    /// Disable permissive CORS
    #[arg(long)]
    pub production: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

pub fn run(args: ServerArgs) -> Result<()> {
    let config = configure_server(args, ServerConfig::from_env())?;

    tracing::info!(
        host = %config.host,
        port = config.port,
        production = config.production,
        "starting gobloks server"
    );

    start_server(config)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn configure_server(args: ServerArgs, mut config: ServerConfig) -> Result<ServerConfig> {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = args.static_dir {
        config.static_dir = dir;
    }
    if let Some(ms) = args.disconnect_grace_ms {
        config.disconnect_grace_ms = ms;
    }
    config.production |= args.production;

    validate_static_dir(Path::new(&config.static_dir))?;
    Ok(config)
}

fn start_server(config: ServerConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_server(config))
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// A missing directory only warns; a file in its place is an error
fn validate_static_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "static directory does not exist, only the API will be served"
        );
    } else if !path.is_dir() {
        anyhow::bail!("static path is not a directory: {}", path.display());
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
