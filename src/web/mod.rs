//! Web server module.

mod handlers;

use crate::assistant::Assistant;
use crate::config::ServerConfig;
use crate::probe::HttpProber;
use crate::registry::Registry;
use crate::scheduler::Scheduler;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<Registry>,
    pub scheduler: Arc<Scheduler<HttpProber>>,
    pub assistant: Arc<Assistant>,
    pub prober: HttpProber,
    pub started_at: DateTime<Utc>,
}

/// Web server for the dashboard and JSON API.
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(
        config: ServerConfig,
        registry: Arc<Registry>,
        scheduler: Arc<Scheduler<HttpProber>>,
        assistant: Arc<Assistant>,
        prober: HttpProber,
    ) -> Self {
        Self {
            state: AppState {
                config,
                registry,
                scheduler,
                assistant,
                prober,
                started_at: Utc::now(),
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            // Pages
            .route("/", get(handlers::handle_dashboard))
            .route("/devices", get(handlers::handle_devices_page))
            .route("/troubleshoot", get(handlers::handle_troubleshoot_page))
            // Targets API
            .route("/api/targets", get(handlers::handle_list_targets))
            .route("/api/targets", post(handlers::handle_add_target))
            .route("/api/targets", delete(handlers::handle_remove_target))
            // Devices API
            .route("/api/devices", get(handlers::handle_list_devices))
            .route("/api/devices", post(handlers::handle_add_device))
            .route("/api/devices", delete(handlers::handle_remove_device))
            // Monitoring control and summary
            .route("/api/summary", get(handlers::handle_summary))
            .route("/api/interval", put(handlers::handle_set_interval))
            // Assistant and tools
            .route("/api/troubleshoot", post(handlers::handle_troubleshoot))
            .route("/api/device-info", get(handlers::handle_device_info))
            .route("/api/tools/ping", post(handlers::handle_tool_ping))
            .route("/api/tools/port-check", post(handlers::handle_tool_port_check))
            // Static assets
            .route("/favicon.ico", get(handlers::handle_favicon))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(64 * 1024))
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
