//! Common utilities and types shared across the application.

pub mod error;
pub mod types;

pub use error::{EvaluationError, HandleError, LookupError, TransportError};
pub use types::{
    ChannelContext, ChannelId, ChannelKind, GuildId, GuildInfo, InboundMessage, MessageId,
    OutboundMessage, UserId, UserInfo,
};
