//! Discord session and event dispatch.
//!
//! Serenity callbacks are turned into [`GatewayEvent`]s on a bounded channel
//! and consumed by a single dispatch loop.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use serenity::async_trait;
use serenity::gateway::ShardManager;
use serenity::http::HttpBuilder;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::guild::Guild;
use serenity::prelude::{Context, EventHandler, GatewayIntents};
use serenity::Client;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::common::error::AppError;
use crate::common::{GuildInfo, InboundMessage};
use crate::config::types::Config;
use crate::dice::StandardDiceEngine;
use crate::discord::commands::CommandTable;
use crate::discord::gateway::{guild_info, inbound_message, SerenityGateway};
use crate::discord::handler::DiceHandler;
use crate::discord::lifecycle::CommandPipeline;

/// Events delivered by the gateway session.
pub enum GatewayEvent {
    /// Session established.
    Ready { user_name: String },
    /// A message was posted somewhere the bot can see.
    MessageCreate {
        message: InboundMessage,
        gateway: Arc<SerenityGateway>,
    },
    /// Guild data received (join or startup).
    GuildCreate {
        guild: GuildInfo,
        gateway: Arc<SerenityGateway>,
    },
    /// The client stopped running.
    Disconnected,
}

struct DiceBotEvents {
    events_tx: mpsc::Sender<GatewayEvent>,
}

impl DiceBotEvents {
    fn new(events_tx: mpsc::Sender<GatewayEvent>) -> Self {
        Self { events_tx }
    }

    async fn forward(&self, event: GatewayEvent) {
        if let Err(error) = self.events_tx.send(event).await {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

#[async_trait]
impl EventHandler for DiceBotEvents {
    async fn ready(&self, _context: Context, ready: Ready) {
        self.forward(GatewayEvent::Ready {
            user_name: ready.user.name.clone(),
        })
        .await;
    }

    async fn guild_create(&self, context: Context, guild: Guild, _is_new: Option<bool>) {
        self.forward(GatewayEvent::GuildCreate {
            guild: guild_info(&guild),
            gateway: Arc::new(SerenityGateway::from_context(&context)),
        })
        .await;
    }

    async fn message(&self, context: Context, message: Message) {
        let bot_id = context.cache.current_user().id;
        self.forward(GatewayEvent::MessageCreate {
            message: inbound_message(&message, bot_id),
            gateway: Arc::new(SerenityGateway::from_context(&context)),
        })
        .await;
    }
}

/// Builder for creating the Discord bot.
pub struct DiceBotBuilder {
    token: String,
    config: Config,
}

impl DiceBotBuilder {
    /// Create a new Discord bot builder.
    pub fn new(token: String, config: Config) -> Self {
        Self { token, config }
    }

    /// Build the Discord bot.
    pub async fn build(self) -> Result<DiceBot, AppError> {
        let table = CommandTable::from_config(&self.config.commands);
        info!(
            "Listening for {:?} and {:?}",
            self.config.commands.roll, self.config.commands.help
        );

        let engine = Arc::new(StandardDiceEngine::new(self.config.engine.max_dice));
        let pipeline = CommandPipeline::new(table, engine, self.config.engine.timeout());

        let (events_tx, events_rx) = mpsc::channel(self.config.runtime.event_buffer);
        let client = build_client(&self.token, events_tx.clone()).await?;

        Ok(DiceBot {
            client: Some(client),
            token: self.token,
            handler: DiceHandler::new(pipeline),
            events_rx,
            events_tx,
            shard_manager: Arc::new(Mutex::new(None)),
            shutdown_grace: self.config.runtime.shutdown_grace(),
        })
    }
}

async fn build_client(token: &str, events_tx: mpsc::Sender<GatewayEvent>) -> Result<Client, AppError> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    // Build the Serenity HTTP client with our custom reqwest client
    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let events = DiceBotEvents::new(events_tx);
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(events)
        .await?;
    Ok(client)
}

/// Create an exponential backoff iterator for Discord reconnection.
/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn discord_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(MAX_RECONNECT_DELAY)
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

pub struct DiceBot {
    client: Option<Client>,
    token: String,
    handler: DiceHandler,
    events_rx: mpsc::Receiver<GatewayEvent>,
    events_tx: mpsc::Sender<GatewayEvent>,
    /// Shard manager of the client currently running.
    shard_manager: Arc<Mutex<Option<Arc<ShardManager>>>>,
    shutdown_grace: Duration,
}

impl DiceBot {
    /// Run until `shutdown_rx` turns true, then close the session.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        tokio::select! {
            _ = Self::run_connection(&mut self.client, &self.token, &self.events_tx, &self.shard_manager) => {},
            _ = Self::process_events(&mut self.events_rx, &mut self.handler, &mut shutdown_rx, self.shutdown_grace) => {},
        }

        // Gracefully shutdown Discord gateway
        let manager = self.shard_manager.lock().await.clone();
        if let Some(manager) = manager {
            info!("Initiating graceful Discord shutdown...");
            manager.shutdown_all().await;
            info!("Discord shutdown complete");
        }
        info!("Discord task ended");
    }

    async fn run_connection(
        client: &mut Option<Client>,
        token: &str,
        events_tx: &mpsc::Sender<GatewayEvent>,
        shard_manager: &Mutex<Option<Arc<ShardManager>>>,
    ) {
        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut client = match client.take() {
                Some(client) => client,
                None => {
                    // serenity mostly handles reconnections itself.
                    match build_client(token, events_tx.clone()).await {
                        Ok(client) => {
                            backoff = discord_backoff();
                            client
                        }
                        Err(e) => {
                            error!("Failed to rebuild Discord client: {}", e);
                            let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                            warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                            sleep(delay).await;
                            continue;
                        }
                    }
                }
            };

            *shard_manager.lock().await = Some(client.shard_manager.clone());

            // Run the client
            match client.start().await {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    notify_disconnected(events_tx);
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    notify_disconnected(events_tx);
                    sleep(delay).await;
                }
            }
        }
    }

    async fn process_events(
        events_rx: &mut mpsc::Receiver<GatewayEvent>,
        handler: &mut DiceHandler,
        shutdown_rx: &mut watch::Receiver<bool>,
        shutdown_grace: Duration,
    ) {
        loop {
            tokio::select! {
                // Discord events
                event = events_rx.recv() => {
                    match event {
                        Some(GatewayEvent::Ready { user_name }) => {
                            handler.handle_ready(&user_name);
                        }
                        Some(GatewayEvent::MessageCreate { message, gateway }) => {
                            handler.handle_message(message, gateway);
                        }
                        Some(GatewayEvent::GuildCreate { guild, gateway }) => {
                            handler.handle_guild_create(guild, gateway);
                        }
                        Some(GatewayEvent::Disconnected) => {
                            warn!("Discord session disconnected");
                        }
                        None => {
                            debug!("Discord events channel closed.");
                            break;
                        }
                    }
                }

                // Reap finished background tasks
                true = handler.reap(), if handler.in_flight() + handler.guild_joins() > 0 => {}

                // Shutdown signal
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping event processing");
                        break;
                    }
                }
            }
        }

        handler.shutdown(shutdown_grace).await;
    }
}

fn notify_disconnected(events_tx: &mpsc::Sender<GatewayEvent>) {
    if let Err(error) = events_tx.try_send(GatewayEvent::Disconnected) {
        warn!("Failed to process discord event: {}", error);
    }
}
