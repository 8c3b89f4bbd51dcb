//! Discord event handling.
//!
//! One handler per gateway event. Messages and guild-join observations run
//! concurrently, each in its own task; the steps for a single message stay sequential inside
//! [`CommandPipeline::handle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::common::{GuildInfo, InboundMessage};
use crate::discord::gateway::{Gateway, GatewayQuery};
use crate::discord::lifecycle::{CommandPipeline, Outcome};

/// Result of observing a guild-create event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildJoin {
    /// Outage signal, not a real join.
    Ignored,
    /// Joined; carries the owner's tag when it could be resolved.
    Joined { owner: Option<String> },
}

/// Log a guild join and, best effort, its owner.
pub async fn observe_guild_join<Q>(guild: &GuildInfo, query: &Q) -> GuildJoin
where
    Q: GatewayQuery + ?Sized,
{
    if guild.unavailable {
        debug!("Ignoring unavailable guild {}", guild.id);
        return GuildJoin::Ignored;
    }

    info!("Joined guild: {} ({})", guild.name, guild.id);

    let owner = match query.lookup_user(guild.owner_id).await {
        Ok(user) => {
            let tag = user.tag();
            info!("Guild {} is owned by {}", guild.name, tag);
            Some(tag)
        }
        Err(e) => {
            debug!("Could not resolve owner of guild {}: {}", guild.id, e);
            None
        }
    };

    GuildJoin::Joined { owner }
}

/// Discord event handler.
pub struct DiceHandler {
    pipeline: Arc<CommandPipeline>,
    in_flight: JoinSet<Outcome>,
    guild_joins: JoinSet<GuildJoin>,
}

impl DiceHandler {
    pub fn new(pipeline: CommandPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            in_flight: JoinSet::new(),
            guild_joins: JoinSet::new(),
        }
    }

    pub fn handle_ready(&self, user_name: &str) {
        info!("Discord session ready as {}", user_name);
    }

    /// Start handling a message in the background.
    pub fn handle_message<G>(&mut self, message: InboundMessage, gateway: Arc<G>)
    where
        G: Gateway + 'static,
    {
        let pipeline = Arc::clone(&self.pipeline);
        self.in_flight
            .spawn(async move { pipeline.handle(&message, gateway.as_ref()).await });
    }

    /// Observe a guild join in the background. The owner lookup may go
    /// over HTTP, so it must not hold up message dispatch.
    pub fn handle_guild_create<Q>(&mut self, guild: GuildInfo, query: Arc<Q>)
    where
        Q: GatewayQuery + 'static,
    {
        self.guild_joins
            .spawn(async move { observe_guild_join(&guild, query.as_ref()).await });
    }

    /// Number of messages still being handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Wait for the next background handler to finish.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn next_finished(&mut self) -> Option<Outcome> {
        self.in_flight.join_next().await.map(message_outcome)
    }

    /// Number of guild joins still being observed.
    pub fn guild_joins(&self) -> usize {
        self.guild_joins.len()
    }

    /// Wait for the next guild-join observation to finish.
    pub async fn next_guild_join(&mut self) -> Option<GuildJoin> {
        self.guild_joins.join_next().await.map(guild_join_outcome)
    }

    /// Reap whichever background task finishes first. Returns `false` when
    /// nothing is running.
    pub async fn reap(&mut self) -> bool {
        tokio::select! {
            Some(result) = self.in_flight.join_next() => {
                message_outcome(result);
                true
            }
            Some(result) = self.guild_joins.join_next() => {
                guild_join_outcome(result);
                true
            }
            else => false,
        }
    }

    /// Let in-flight handlers finish for up to `grace`, then abort the rest.
    /// Guild-join logging is abandoned right away.
    pub async fn shutdown(&mut self, grace: Duration) {
        self.guild_joins.abort_all();
        while self.next_guild_join().await.is_some() {}

        if self.in_flight.is_empty() {
            return;
        }

        info!("Waiting for {} in-flight commands...", self.in_flight.len());
        let drained = tokio::time::timeout(grace, async {
            while self.next_finished().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                "Abandoning {} commands still in flight after {:.1}s",
                self.in_flight.len(),
                grace.as_secs_f64()
            );
            self.in_flight.abort_all();
        }
    }
}

fn message_outcome(result: Result<Outcome, JoinError>) -> Outcome {
    result.unwrap_or_else(|e| {
        warn!("Message handler failed: {}", e);
        Outcome::Dropped
    })
}

fn guild_join_outcome(result: Result<GuildJoin, JoinError>) -> GuildJoin {
    result.unwrap_or_else(|e| {
        debug!("Guild join observer stopped: {}", e);
        GuildJoin::Ignored
    })
}
