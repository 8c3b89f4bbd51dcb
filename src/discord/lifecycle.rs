//! Command handling and message lifecycle.
//!
//! Deciding what to do with a command ([`plan_roll`], [`plan_help`]) is kept
//! apart from doing it ([`execute`]). Effects run strictly in order and the
//! first failure stops the rest; nothing already done is rolled back.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::common::{
    ChannelContext, ChannelId, EvaluationError, HandleError, InboundMessage, MessageId,
    OutboundMessage, TransportError, UserId,
};
use crate::dice::{DiceEngine, RollResult};
use crate::discord::commands::{CommandTable, RollCommand};
use crate::discord::formatter::format_roll;
use crate::discord::gateway::{Gateway, GatewayActions};

/// A side effect on the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Post into a channel.
    Send(OutboundMessage),
    /// Post into the private channel with a user, opening it if needed.
    SendDirect { user_id: UserId, content: String },
    /// Remove a message.
    Delete { channel_id: ChannelId, message_id: MessageId },
}

/// What happened to the triggering message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    Skipped,
}

/// Terminal state of one handled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was sent: not a command, or handling failed.
    Dropped,
    /// A response went out.
    Sent { deletion: Deletion },
}

/// Effects for a successful roll: reply in place, and tidy up the command in
/// guild text channels.
pub fn plan_roll(msg: &InboundMessage, channel: &ChannelContext, content: String) -> Vec<Effect> {
    let mut effects = vec![Effect::Send(OutboundMessage {
        channel_id: msg.channel_id,
        content,
    })];
    if channel.allows_trigger_deletion() {
        effects.push(Effect::Delete {
            channel_id: msg.channel_id,
            message_id: msg.id,
        });
    }
    effects
}

/// Effects for a help request. `channel` is `None` when the originating
/// channel could not be resolved; help is still delivered.
pub fn plan_help(
    msg: &InboundMessage,
    channel: Option<&ChannelContext>,
    help_text: String,
) -> Vec<Effect> {
    let mut effects = vec![Effect::SendDirect {
        user_id: msg.author_id,
        content: help_text,
    }];
    if channel.is_some_and(ChannelContext::allows_trigger_deletion) {
        effects.push(Effect::Delete {
            channel_id: msg.channel_id,
            message_id: msg.id,
        });
    }
    effects
}

/// Run effects in order, stopping at the first failure.
///
/// A failed deletion after a response went out is logged and leaves the
/// outcome at [`Deletion::Skipped`].
pub async fn execute<A>(effects: Vec<Effect>, gateway: &A) -> Result<Outcome, TransportError>
where
    A: GatewayActions + ?Sized,
{
    let mut outcome = Outcome::Dropped;

    for effect in effects {
        match effect {
            Effect::Send(message) => {
                gateway
                    .send_message(message.channel_id, &message.content)
                    .await?;
                outcome = Outcome::Sent {
                    deletion: Deletion::Skipped,
                };
            }
            Effect::SendDirect { user_id, content } => {
                let channel_id = gateway.open_direct_channel(user_id).await?;
                gateway.send_message(channel_id, &content).await?;
                outcome = Outcome::Sent {
                    deletion: Deletion::Skipped,
                };
            }
            Effect::Delete {
                channel_id,
                message_id,
            } => match gateway.delete_message(channel_id, message_id).await {
                Ok(()) => {
                    if let Outcome::Sent { deletion } = &mut outcome {
                        *deletion = Deletion::Deleted;
                    }
                }
                // The response is already out; a stale trigger is left behind.
                Err(e) if outcome != Outcome::Dropped => {
                    warn!("{}", e);
                    return Ok(outcome);
                }
                Err(e) => return Err(e),
            },
        }
    }

    Ok(outcome)
}

/// Routes messages, rolls dice and applies the resulting effects.
pub struct CommandPipeline {
    table: CommandTable,
    help_text: String,
    engine: Arc<dyn DiceEngine>,
    engine_timeout: Duration,
}

impl CommandPipeline {
    pub fn new(table: CommandTable, engine: Arc<dyn DiceEngine>, engine_timeout: Duration) -> Self {
        let help_text = table.help_text();
        Self {
            table,
            help_text,
            engine,
            engine_timeout,
        }
    }

    /// Handle one message. Failures are logged here and reported as
    /// [`Outcome::Dropped`].
    pub async fn handle<G>(&self, msg: &InboundMessage, gateway: &G) -> Outcome
    where
        G: Gateway + ?Sized,
    {
        match self.try_handle(msg, gateway).await {
            Ok(outcome) => outcome,
            Err(HandleError::Lookup(e)) => {
                warn!("Dropping command from {}: {}", msg.author_id, e);
                Outcome::Dropped
            }
            Err(HandleError::Evaluation(e)) => {
                warn!("Dice error: {}", e);
                Outcome::Dropped
            }
            Err(HandleError::Transport(e)) => {
                error!("{}", e);
                Outcome::Dropped
            }
        }
    }

    pub async fn try_handle<G>(&self, msg: &InboundMessage, gateway: &G) -> Result<Outcome, HandleError>
    where
        G: Gateway + ?Sized,
    {
        match self.table.route(msg) {
            RollCommand::Ignore => Ok(Outcome::Dropped),
            RollCommand::Roll(text) => self.handle_roll(msg, &text, gateway).await,
            RollCommand::Help => self.handle_help(msg, gateway).await,
        }
    }

    async fn handle_roll<G>(
        &self,
        msg: &InboundMessage,
        text: &str,
        gateway: &G,
    ) -> Result<Outcome, HandleError>
    where
        G: Gateway + ?Sized,
    {
        let channel = gateway.lookup_channel(msg.channel_id).await?;
        let result = self.evaluate(text).await?;

        info!(
            "{} rolled {} in {} channel {} (guild {:?})",
            msg.author_id, result.description, channel.kind, channel.id, channel.guild_id
        );

        let content = format_roll(msg.author_id, &result);
        Ok(execute(plan_roll(msg, &channel, content), gateway).await?)
    }

    async fn handle_help<G>(&self, msg: &InboundMessage, gateway: &G) -> Result<Outcome, HandleError>
    where
        G: Gateway + ?Sized,
    {
        info!("Help requested by {}", msg.author_id);

        let channel = match gateway.lookup_channel(msg.channel_id).await {
            Ok(channel) => Some(channel),
            Err(e) => {
                debug!("Not deleting help request: {}", e);
                None
            }
        };

        let effects = plan_help(msg, channel.as_ref(), self.help_text.clone());
        Ok(execute(effects, gateway).await?)
    }

    /// Evaluate with an upper bound on how long the engine may take.
    async fn evaluate(&self, text: &str) -> Result<RollResult, EvaluationError> {
        tokio::time::timeout(self.engine_timeout, self.engine.evaluate(text))
            .await
            .map_err(|_| EvaluationError::Timeout {
                secs: self.engine_timeout.as_secs(),
            })?
    }
}
