//! NetWatch - Network Reachability Dashboard
//!
//! Polls registered hosts with HTTP HEAD reachability probes on a fixed
//! cadence, tracks up/down transitions, and serves a small dashboard with
//! management controls and an AI troubleshooting helper.

mod assistant;
mod config;
mod probe;
mod registry;
mod scheduler;
mod web;

use assistant::Assistant;
use config::ServerConfig;
use probe::HttpProber;
use registry::{Classification, DeviceKind, Registry};
use scheduler::Scheduler;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("netwatch=info".parse()?),
        )
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting NetWatch on port {}...", cfg.http_port);

    let registry = Arc::new(Registry::new());
    seed_defaults(&registry);

    // Surface advisory mutation notifications in the log stream.
    let mut notifications = registry.subscribe();
    tokio::spawn(async move {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match notifications.recv().await {
                Ok(n) => tracing::debug!("notification [{:?}]: {}", n.tone, n.message),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let prober = HttpProber::new()?;
    let scheduler = Arc::new(Scheduler::new(
        registry.clone(),
        prober.clone(),
        cfg.probe_timeout(),
    ));
    scheduler.start(cfg.poll_interval_secs).await;

    let assistant = Arc::new(Assistant::new(&cfg));

    // Start web server
    let server = Server::new(cfg, registry, scheduler.clone(), assistant, prober);
    tokio::select! {
        res = server.start() => res?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            scheduler.stop().await;
        }
    }

    Ok(())
}

/// Seed the registry with the stock set of monitored addresses.
fn seed_defaults(registry: &Registry) {
    tracing::info!("Seeding default targets");

    let targets = [
        ("192.168.1.1", Classification::Internal, None),
        ("10.0.0.5", Classification::Internal, None),
        ("203.0.113.10", Classification::External, None),
        ("198.51.100.22", Classification::External, None),
        ("1.1.1.1", Classification::External, Some("Cloudflare DNS")),
        ("8.8.8.8", Classification::External, Some("Google DNS")),
        ("9.9.9.9", Classification::External, Some("Quad9 DNS")),
        ("208.67.222.222", Classification::External, Some("OpenDNS")),
    ];
    for (address, classification, label) in targets {
        if let Err(e) = registry.add_target(address, classification, label) {
            tracing::warn!("Failed to seed target {}: {}", address, e);
        }
    }

    let devices = [
        (
            "192.168.1.254",
            DeviceKind::Firewall,
            "Edge Firewall",
            Some("PA-220"),
        ),
        (
            "192.168.1.2",
            DeviceKind::Switch,
            "Core Switch",
            Some("Catalyst 2960"),
        ),
    ];
    for (address, kind, label, model) in devices {
        if let Err(e) = registry.add_device(address, kind, label, model) {
            tracing::warn!("Failed to seed device {}: {}", address, e);
        }
    }
}
