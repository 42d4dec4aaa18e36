//! Surety protocol node binary

use anyhow::Result;
use surety_service::{spawn_protocol_actor, Metrics, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Surety protocol node");

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::from_env()?,
    };
    tracing::info!(
        service = %config.service_name,
        admin = %config.admin,
        genesis = %config.genesis_airline,
        "Configuration loaded"
    );

    let metrics = Metrics::new()?;
    let (handle, bus) = spawn_protocol_actor(&config, metrics)?;
    tracing::info!("Protocol actor started");

    // Log committed events as they are published
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(envelope) => {
                    tracing::info!(kind = %envelope.kind, id = %envelope.id, "Event committed");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down Surety protocol node");
    handle.shutdown().await?;
    Ok(())
}
