//! Crowdfunding backend: entry point.
//!
//! Loads configuration, opens the SQLite ledger (running migrations), seeds
//! the bootstrap admin if configured, and serves the Axum REST API.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod notify;
mod services;

#[cfg(test)]
mod test_lifecycle;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use notify::{Outbox, RelayNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load optional .env file (ignored if missing) so RUST_LOG may live there too.
    let _ = dotenvy::dotenv();

    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    info!("Transition policy: {:?}", config.transition_policy);

    let pool = db::init_pool(&config.database_url).await?;

    let notifier = RelayNotifier::new(config.mail_relay_url.clone(), config.push_relay_url.clone())?;

    let outbox = Outbox::new(Arc::new(notifier));

    let state = Arc::new(api::AppState {
        pool,
        config: config.clone(),
        outbox: outbox.clone(),
    });

    services::accounts::bootstrap_admin(&state).await?;

    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Waiting for {} pending notification(s)", outbox.in_flight());
    outbox.drain().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
