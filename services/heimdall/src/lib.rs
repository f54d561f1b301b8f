//! Heimdall - live-state synchronization for a site monitoring dashboard
//!
//! Reconciles paginated site snapshots with push updates into an in-memory
//! registry, keeps per-site message caches fresh, and mirrors the result
//! over a small JSON API.

pub mod channel;
pub mod config;
pub mod dashboard;
pub mod deploy;
pub mod engine;
pub mod error;
pub mod fmt;
pub mod io;
pub mod poller;
pub mod registry;
pub mod scheduler;
pub mod site;

pub use config::{load_config, Config};
pub use error::{HeimdallError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::channel::{PushChannel, WsPushChannel};
use crate::engine::Engine;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::poller::SiteApi;

/// Run the sync service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let channel: Arc<dyn PushChannel> = Arc::new(WsPushChannel::new(config.channel.url()));
    let state = registry::new_state_handle();
    let cancel = CancellationToken::new();
    let (focus_tx, focus_rx) = watch::channel(true);

    let api = SiteApi::new(Arc::clone(&http), config.api.base_url.clone());
    let mut engine = Engine::new(
        api,
        Arc::clone(&channel),
        Arc::clone(&state),
        &config.scheduler,
        focus_rx,
        cancel.clone(),
    );

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    // Start the dashboard mirror if enabled
    if config.dashboard.enabled {
        let dashboard_port = config.dashboard.port;
        let dashboard_state = Arc::clone(&state);
        let cancel_for_dashboard = cancel.clone();

        tokio::spawn(async move {
            let router = dashboard::build_router(dashboard_state, focus_tx);
            let addr = SocketAddr::from(([0, 0, 0, 0], dashboard_port));
            tracing::info!("Dashboard mirror listening on http://{}", addr);

            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(
                        "Failed to bind dashboard to port {}: {}. Continuing without dashboard.",
                        dashboard_port,
                        e
                    );
                    return;
                }
            };

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel_for_dashboard.cancelled().await;
                })
                .await
                .ok();

            tracing::debug!("Dashboard mirror stopped");
        });
    }

    engine.initial_sync().await;
    tracing::info!("Heimdall sync engine started");

    // Runs until cancelled, then closes the push channel
    engine.run().await;
    tracing::info!("Heimdall sync engine stopped");

    Ok(())
}
