//! probebench - Concurrent Endpoint Test Harness
//!
//! Probes a catalog of backend services, one run at a time, and serves the
//! result log and summary statistics over HTTP.

mod catalog;
mod config;
mod probe;
mod scheduler;
mod web;

#[cfg(test)]
mod testutil;

use config::ServerConfig;
use probe::{build_client, AvailabilityChecker, Executor};
use scheduler::Scheduler;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("probebench=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load()?;
    tracing::info!("Starting probebench on port {}...", cfg.http_port);

    let registry = Arc::new(cfg.registry()?);
    for target in registry.targets() {
        tracing::info!(
            "Target {} ({}) with {} probes",
            target.id,
            target.base_url,
            registry.list_probes(Some(&target.id)).len()
        );
    }

    let client = build_client()?;
    let scheduler = Arc::new(Scheduler::new(
        registry,
        Executor::new(client.clone(), cfg.probe_timeout),
        AvailabilityChecker::new(client, cfg.health_timeout),
        cfg.probe_delay,
    ));

    // Initial availability check
    let status = scheduler.refresh_availability().await;
    for (id, available) in &status {
        tracing::info!("Target {} available: {}", id, available);
    }

    // Start web server
    let server = Server::new(cfg, scheduler);
    server.start().await?;

    Ok(())
}
