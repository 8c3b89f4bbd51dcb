//! Dicebot - Discord dice roller
//!
//! Watches chat for `!roll` commands, rolls the dice and answers in place,
//! removing the command from guild channels. `!rollhelp` explains the syntax
//! in a direct message.

mod common;
mod config;
mod dice;
mod discord;

use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use config::{env::get_config_path, load_and_validate};
use discord::DiceBotBuilder;

/// Extra time main waits beyond the handler grace period.
const SHUTDOWN_SLACK: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Dicebot v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Set DICEBOT_DISCORD_TOKEN or provide {}.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Roll command: {}", config.commands.roll);
    info!("  Help command: {}", config.commands.help);
    info!("  Engine timeout: {}s", config.engine.timeout_secs);
    info!("  Max dice: {}", config.engine.max_dice);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let bot = DiceBotBuilder::new(config.discord.token.clone(), config.clone())
        .build()
        .await
        .map_err(|e| {
            error!("Error creating Discord session: {}", e);
            e
        })?;

    let mut bot_task = tokio::spawn(bot.run(shutdown_rx));

    // Wait here until CTRL-C or other term signal is received.
    info!("Dicebot is now running. Press CTRL-C to exit.");
    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - closing Discord session...");
            true
        }
        _ = &mut bot_task => false,
    };

    if shutdown {
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (bot already exited): {}", e);
        }
        let timeout = config.runtime.shutdown_grace() + SHUTDOWN_SLACK;
        match tokio::time::timeout(timeout, bot_task).await {
            Ok(Ok(())) => info!("Discord session closed"),
            Ok(Err(e)) => warn!("Discord task panicked: {}", e),
            Err(_) => warn!("Discord shutdown timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
