//! slack2irc - IRC to Slack channel relay
//!
//! Joins one IRC channel and one Slack channel and relays chat, joins and
//! leaves between them. `?listusers` on either side lists who is on the
//! other side.

mod bridge;
mod common;
mod config;
mod endpoint;
mod irc;
mod slack;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use bridge::{Bridge, BridgeTasks};
use config::env::{config_path_from_args, usage};
use config::load_and_validate;
use endpoint::Endpoint;
use irc::IrcEndpoint;
use slack::SlackEndpoint;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let Some(config_path) = config_path_from_args(std::env::args().skip(1)) else {
        for line in usage() {
            println!("{}", line);
        }
        return Ok(());
    };

    info!("slack2irc v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  IRC: {} on {}:{} as {}", config.irc_channel, config.irc_server, config.irc_port, config.irc_nick);
    info!("  Slack: {}", config.slack_channel);

    let irc: Arc<dyn Endpoint> = Arc::new(IrcEndpoint::new(config.irc()));
    let slack: Arc<dyn Endpoint> = Arc::new(SlackEndpoint::new(config.slack())?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let bridge = Arc::new(Bridge::new(irc, slack));
    let BridgeTasks {
        endpoints,
        dispatchers,
    } = bridge.start(shutdown_rx);
    let (networks, mut tasks): (Vec<_>, Vec<_>) = endpoints.into_iter().unzip();

    // ============================================================
    // Run until a signal arrives or both endpoints have stopped
    // ============================================================
    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - leaving both networks...");
            true
        }
        _ = futures::future::join_all(tasks.iter_mut()) => {
            warn!("Both endpoints have stopped");
            false
        }
    };

    if shutdown {
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (endpoints already exited): {}", e);
        }

        let timeout = Duration::from_secs(5);
        for (network, task) in networks.into_iter().zip(tasks) {
            if task.is_finished() {
                debug!("{} endpoint had already stopped", network);
                continue;
            }
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => info!("{} endpoint stopped gracefully", network),
                Ok(Err(e)) => warn!("{} endpoint task panicked: {}", network, e),
                Err(_) => warn!("{} endpoint shutdown timed out", network),
            }
        }
    }

    for dispatcher in dispatchers {
        dispatcher.abort();
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
