//! Gobloks CLI - Command-line interface
//!
//! Commands:
//! - serve: Start the game server
//! - pieces: Print the piece set for a block degree
//! - board: Print a fresh board and each player's opening mobility

mod board;
mod pieces;
mod server;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gobloks")]
#[command(version, about = "Gobloks polyomino territory game")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and websocket server
    Serve(server::ServerArgs),
    /// Enumerate every piece up to a block degree
    Pieces(pieces::PiecesArgs),
    /// Lay out a board for a player count
    Board(board::BoardArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => server::run(args),
        Commands::Pieces(args) => pieces::run(args),
        Commands::Board(args) => board::run(args),
    }
}
