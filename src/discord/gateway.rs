//! Gateway interfaces used by the command pipeline.
//!
//! [`GatewayQuery`] is the read-only view of channels and users,
//! [`GatewayActions`] the outbound operations. [`SerenityGateway`] implements
//! both on top of a serenity cache and HTTP client.

use std::sync::Arc;

use serenity::async_trait;
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::channel::{Channel, ChannelType, GuildChannel, Message};
use serenity::model::guild::Guild;
use serenity::model::id::{
    ChannelId as DiscordChannelId, MessageId as DiscordMessageId, UserId as DiscordUserId,
};
use serenity::model::user::User;
use serenity::prelude::Context;
use tracing::debug;

use crate::common::error::{LookupResult, TransportResult};
use crate::common::{
    ChannelContext, ChannelId, ChannelKind, GuildInfo, InboundMessage, LookupError, MessageId,
    TransportError, UserId, UserInfo,
};

/// Read-only lookups against the gateway's state.
#[async_trait]
pub trait GatewayQuery: Send + Sync {
    async fn lookup_channel(&self, channel_id: ChannelId) -> LookupResult<ChannelContext>;

    async fn lookup_user(&self, user_id: UserId) -> LookupResult<UserInfo>;
}

/// Outbound gateway operations.
#[async_trait]
pub trait GatewayActions: Send + Sync {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> TransportResult<()>;

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId)
        -> TransportResult<()>;

    /// Open, or reuse, the private channel with a user.
    async fn open_direct_channel(&self, user_id: UserId) -> TransportResult<ChannelId>;
}

/// Everything the command pipeline needs from the gateway.
pub trait Gateway: GatewayQuery + GatewayActions {}

impl<T: GatewayQuery + GatewayActions> Gateway for T {}

/// Gateway backed by serenity.
///
/// Channels and users are read from the cache first. Private channels are
/// not cached, so misses fall back to the REST API.
#[derive(Clone)]
pub struct SerenityGateway {
    cache: Arc<Cache>,
    http: Arc<Http>,
}

impl SerenityGateway {
    pub fn new(cache: Arc<Cache>, http: Arc<Http>) -> Self {
        Self { cache, http }
    }

    pub fn from_context(ctx: &Context) -> Self {
        Self::new(ctx.cache.clone(), ctx.http.clone())
    }
}

#[async_trait]
impl GatewayQuery for SerenityGateway {
    async fn lookup_channel(&self, channel_id: ChannelId) -> LookupResult<ChannelContext> {
        let id = DiscordChannelId::new(channel_id);

        let cached = self.cache.channel(id).map(|channel| guild_channel_context(&channel));
        if let Some(context) = cached {
            return Ok(context);
        }

        match id.to_channel((&self.cache, self.http.as_ref())).await {
            Ok(Channel::Guild(channel)) => Ok(guild_channel_context(&channel)),
            Ok(Channel::Private(channel)) => Ok(ChannelContext {
                id: channel.id.get(),
                kind: ChannelKind::Direct,
                guild_id: None,
            }),
            Ok(_) => Err(LookupError::ChannelNotFound { channel_id }),
            Err(e) => {
                debug!("Channel {} lookup failed: {}", channel_id, e);
                Err(LookupError::ChannelNotFound { channel_id })
            }
        }
    }

    async fn lookup_user(&self, user_id: UserId) -> LookupResult<UserInfo> {
        let id = DiscordUserId::new(user_id);

        let cached = self.cache.user(id).map(|user| user_info(&user));
        if let Some(info) = cached {
            return Ok(info);
        }

        match id.to_user((&self.cache, self.http.as_ref())).await {
            Ok(user) => Ok(user_info(&user)),
            Err(e) => {
                debug!("User {} lookup failed: {}", user_id, e);
                Err(LookupError::UserNotFound { user_id })
            }
        }
    }
}

#[async_trait]
impl GatewayActions for SerenityGateway {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> TransportResult<()> {
        DiscordChannelId::new(channel_id)
            .say(&self.http, content)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Send {
                channel_id,
                message: e.to_string(),
            })
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> TransportResult<()> {
        DiscordChannelId::new(channel_id)
            .delete_message(&self.http, DiscordMessageId::new(message_id))
            .await
            .map_err(|e| TransportError::Delete {
                channel_id,
                message_id,
                message: e.to_string(),
            })
    }

    async fn open_direct_channel(&self, user_id: UserId) -> TransportResult<ChannelId> {
        DiscordUserId::new(user_id)
            .create_dm_channel((&self.cache, self.http.as_ref()))
            .await
            .map(|channel| channel.id.get())
            .map_err(|e| TransportError::OpenDirectChannel {
                user_id,
                message: e.to_string(),
            })
    }
}

fn guild_channel_context(channel: &GuildChannel) -> ChannelContext {
    let kind = match channel.kind {
        ChannelType::Text => ChannelKind::GuildText,
        ChannelType::Private => ChannelKind::Direct,
        _ => ChannelKind::GuildOther,
    };
    ChannelContext {
        id: channel.id.get(),
        kind,
        guild_id: Some(channel.guild_id.get()),
    }
}

fn user_info(user: &User) -> UserInfo {
    UserInfo {
        display_name: user.name.clone(),
        discriminator: user.discriminator.map(|d| d.get()),
    }
}

/// Convert a serenity message, flagging it if `bot_id` wrote it.
pub fn inbound_message(msg: &Message, bot_id: DiscordUserId) -> InboundMessage {
    InboundMessage {
        id: msg.id.get(),
        author_id: msg.author.id.get(),
        channel_id: msg.channel_id.get(),
        content: msg.content.clone(),
        is_self: msg.author.id == bot_id,
    }
}

/// Guilds delivered through `guild_create` are always available.
pub fn guild_info(guild: &Guild) -> GuildInfo {
    GuildInfo {
        id: guild.id.get(),
        name: guild.name.clone(),
        owner_id: guild.owner_id.get(),
        unavailable: false,
    }
}
