// Symposium Server - HTTP Entry Point

mod app;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use symposium_core::{EngineConfig, init_model_layer};

/// Symposium - multi-provider AI chat server
#[derive(Parser, Debug)]
#[command(name = "symposium")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Port to listen on (overrides PORT / NODE_PORT)
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,

    /// Directory for persisted state such as the failed-model list
    #[arg(long = "data-dir")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string())
                .as_str(),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    let mut config = EngineConfig::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    info!("Symposium server starting...");

    let layer = init_model_layer(&config)?;
    let enabled = layer
        .registry
        .providers()
        .iter()
        .filter(|provider| provider.enabled())
        .count();
    info!(
        "{enabled} of {} providers configured",
        layer.registry.providers().len()
    );

    let router = app::router(app::AppState::new(layer));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {addr}");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
