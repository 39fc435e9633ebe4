use anyhow::{Context, Result};
use bridge_core::{KubeStore, RouteBridgeHandler};
use clap::Parser;
use tracing::info;

mod cli;
mod client;
mod service_controller;

use cli::{Cli, LogFormat};
use service_controller::ServiceBridgeController;

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    info!("Starting bridge-controller...");

    let config = cli.resolve_config().context("invalid configuration")?;
    let client = client::build(config.kubeconfig.as_deref()).await?;

    let store = KubeStore::new(client.clone(), config.call_timeout());
    let handler = RouteBridgeHandler::new(store, config.clone())?;
    let controller = ServiceBridgeController::new(client, handler, config.watch_namespace.clone());

    // Unreachable API server or bad credentials stop the process here
    controller
        .start()
        .await
        .context("failed to initialize route bridge handler")?;

    tokio::select! {
        result = controller.run() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received, exiting...");
        }
    }

    let stats = controller.stats();
    info!(dispatched = stats.dispatched, failed = stats.failed, "bridge-controller stopped");

    Ok(())
}
