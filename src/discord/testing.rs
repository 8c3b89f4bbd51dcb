//! In-memory gateway for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serenity::async_trait;

use crate::common::error::{LookupResult, TransportResult};
use crate::common::{
    ChannelContext, ChannelId, ChannelKind, LookupError, MessageId, TransportError, UserId,
    UserInfo,
};
use crate::discord::gateway::{GatewayActions, GatewayQuery};

/// Offset added to a user id to form their direct channel id.
pub const DIRECT_CHANNEL_OFFSET: u64 = 1_000_000;

/// A recorded gateway operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send { channel_id: ChannelId, content: String },
    Delete { channel_id: ChannelId, message_id: MessageId },
    OpenDirect { user_id: UserId },
}

#[derive(Default)]
pub struct FakeGateway {
    channels: HashMap<ChannelId, ChannelContext>,
    users: HashMap<UserId, UserInfo>,
    failing_sends: HashSet<ChannelId>,
    fail_deletes: bool,
    fail_direct: bool,
    hang_user_lookups: bool,
    calls: Mutex<Vec<Call>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, id: ChannelId, kind: ChannelKind) -> Self {
        let guild_id = match kind {
            ChannelKind::Direct => None,
            _ => Some(1),
        };
        self.channels.insert(id, ChannelContext { id, kind, guild_id });
        self
    }

    pub fn with_user(mut self, id: UserId, name: &str, discriminator: Option<u16>) -> Self {
        self.users.insert(
            id,
            UserInfo {
                display_name: name.to_string(),
                discriminator,
            },
        );
        self
    }

    pub fn failing_send_to(mut self, channel_id: ChannelId) -> Self {
        self.failing_sends.insert(channel_id);
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn failing_direct(mut self) -> Self {
        self.fail_direct = true;
        self
    }

    /// User lookups never complete, like a stalled HTTP request.
    pub fn hanging_user_lookups(mut self) -> Self {
        self.hang_user_lookups = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GatewayQuery for FakeGateway {
    async fn lookup_channel(&self, channel_id: ChannelId) -> LookupResult<ChannelContext> {
        self.channels
            .get(&channel_id)
            .cloned()
            .ok_or(LookupError::ChannelNotFound { channel_id })
    }

    async fn lookup_user(&self, user_id: UserId) -> LookupResult<UserInfo> {
        if self.hang_user_lookups {
            std::future::pending::<()>().await;
        }
        self.users
            .get(&user_id)
            .cloned()
            .ok_or(LookupError::UserNotFound { user_id })
    }
}

#[async_trait]
impl GatewayActions for FakeGateway {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> TransportResult<()> {
        self.record(Call::Send {
            channel_id,
            content: content.to_string(),
        });
        if self.failing_sends.contains(&channel_id) {
            return Err(TransportError::Send {
                channel_id,
                message: "Missing Access".to_string(),
            });
        }
        Ok(())
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> TransportResult<()> {
        self.record(Call::Delete {
            channel_id,
            message_id,
        });
        if self.fail_deletes {
            return Err(TransportError::Delete {
                channel_id,
                message_id,
                message: "Missing Permissions".to_string(),
            });
        }
        Ok(())
    }

    async fn open_direct_channel(&self, user_id: UserId) -> TransportResult<ChannelId> {
        self.record(Call::OpenDirect { user_id });
        if self.fail_direct {
            return Err(TransportError::OpenDirectChannel {
                user_id,
                message: "Cannot send messages to this user".to_string(),
            });
        }
        Ok(DIRECT_CHANNEL_OFFSET + user_id)
    }
}
