//! Plex new-media digest server.
//!
//! Buffers `library.new` webhooks from a Plex server and emails one digest of
//! everything added at each configured time of day.

mod config;
mod delivery;
mod error;
mod images;
mod plex;
mod routes;
mod state;

use std::sync::Arc;

use digest_core::{BufferStore, CancellationToken, DigestDispatcher, DigestScheduler};
use mailer::{MailerClient, MailerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::delivery::EmailDelivery;
use crate::images::ImageStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, webhook = %config.webhook_path, "Starting digest server");

    // Buffer store, shared by ingestion and the scheduler
    let store = Arc::new(match &config.buffer_log_path {
        Some(path) => BufferStore::open_log(path)?,
        None => {
            info!("BUFFER_LOG_PATH not set, pending records are kept in memory only");
            BufferStore::in_memory()
        }
    });

    // Email delivery
    let mailer = MailerClient::new(MailerConfig::from_env()?)?;
    let delivery = Arc::new(EmailDelivery::new(
        mailer,
        config.recipients.clone(),
        config.subject.clone(),
    ));
    let dispatcher = DigestDispatcher::new(store.clone(), delivery).with_timeout(config.delivery_timeout);

    // Scheduler
    let shutdown = CancellationToken::new();
    let scheduler = DigestScheduler::starting_now(config.digest_times.clone())?;
    let scheduler_task = tokio::spawn(scheduler.run(dispatcher, shutdown.clone()));

    // Build router
    let state = AppState::new(store, ImageStore::new(&config.images_dir));
    let app = routes::router(&config.webhook_path).with_state(state);

    // Start server
    info!(addr = %config.addr, "Digest server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    scheduler_task.await?;

    info!("Digest server stopped");
    Ok(())
}

/// Resolve on Ctrl-C and cancel `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
