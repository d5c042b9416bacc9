//! Example to run the Gobloks server standalone
//!
//! Run with: cargo run -p gobloks-server --example run_server

use gobloks_server::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();

    println!("Starting Gobloks server on {}:{}", config.host, config.port);
    println!("Static files from: {}", config.static_dir);
    println!("Create a game with: curl -XPOST localhost:{}/api/games -d '{{\"players\":2}}' -H 'content-type: application/json'", config.port);

    run_server(config).await
}
