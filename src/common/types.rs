//! Shared types used across the application.

use std::fmt;

/// Discord snowflake identifying a user.
pub type UserId = u64;

/// Discord snowflake identifying a channel (guild or private).
pub type ChannelId = u64;

/// Discord snowflake identifying a message.
pub type MessageId = u64;

/// Discord snowflake identifying a guild.
pub type GuildId = u64;

/// One chat message as seen by the command pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: MessageId,
    pub author_id: UserId,
    pub channel_id: ChannelId,
    pub content: String,
    /// Whether the message was written by this bot.
    pub is_self: bool,
}

/// Kind of a channel, as far as message lifecycle is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Plain text channel inside a guild.
    GuildText,
    /// Any other guild channel (news, threads, voice text).
    GuildOther,
    /// Private direct-message channel.
    Direct,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::GuildText => write!(f, "guild-text"),
            ChannelKind::GuildOther => write!(f, "guild-other"),
            ChannelKind::Direct => write!(f, "direct"),
        }
    }
}

/// Resolved channel metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelContext {
    pub id: ChannelId,
    pub kind: ChannelKind,
    pub guild_id: Option<GuildId>,
}

impl ChannelContext {
    /// Triggering messages are only removed from plain guild text channels.
    pub fn allows_trigger_deletion(&self) -> bool {
        self.kind == ChannelKind::GuildText
    }
}

/// A guild announced by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    pub id: GuildId,
    pub name: String,
    pub owner_id: UserId,
    /// Set when the gateway reports an outage rather than a real join.
    pub unavailable: bool,
}

/// Display identity of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub display_name: String,
    pub discriminator: Option<u16>,
}

impl UserInfo {
    /// `name#1234` for legacy accounts, plain `name` otherwise.
    pub fn tag(&self) -> String {
        match self.discriminator {
            Some(discriminator) => format!("{}#{:04}", self.display_name, discriminator),
            None => self.display_name.clone(),
        }
    }
}

/// A message ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel_id: ChannelId,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_guild_text_allows_deletion() {
        let mut channel = ChannelContext {
            id: 1,
            kind: ChannelKind::GuildText,
            guild_id: Some(10),
        };
        assert!(channel.allows_trigger_deletion());

        channel.kind = ChannelKind::GuildOther;
        assert!(!channel.allows_trigger_deletion());

        channel.kind = ChannelKind::Direct;
        channel.guild_id = None;
        assert!(!channel.allows_trigger_deletion());
    }

    #[test]
    fn test_user_tag() {
        let legacy = UserInfo {
            display_name: "Gandalf".to_string(),
            discriminator: Some(7),
        };
        assert_eq!(legacy.tag(), "Gandalf#0007");

        let modern = UserInfo {
            display_name: "frodo".to_string(),
            discriminator: None,
        };
        assert_eq!(modern.tag(), "frodo");
    }
}
