//! Error types for the application.

use thiserror::Error;

use crate::common::types::{ChannelId, MessageId, UserId};

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    IoError { path: String, message: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Something the pipeline needed was not known to the gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Channel not found: {channel_id}")]
    ChannelNotFound { channel_id: ChannelId },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: UserId },
}

/// A gateway operation failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to send message to channel {channel_id}: {message}")]
    Send { channel_id: ChannelId, message: String },

    #[error("Failed to delete message {message_id} in channel {channel_id}: {message}")]
    Delete {
        channel_id: ChannelId,
        message_id: MessageId,
        message: String,
    },

    #[error("Failed to open direct channel with user {user_id}: {message}")]
    OpenDirectChannel { user_id: UserId, message: String },
}

/// The dice expression could not be evaluated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("No dice expression found in '{input}'")]
    NoExpression { input: String },

    #[error("Invalid dice expression '{expression}': {message}")]
    Syntax { expression: String, message: String },

    #[error("Too many dice: {requested} requested, limit is {limit}")]
    TooManyDice { requested: u64, limit: u32 },

    #[error("Invalid die size d{sides}: sides must be between 1 and {limit}")]
    InvalidSides { sides: u64, limit: u32 },

    #[error("Cannot {action} {amount} of {count} dice")]
    InvalidSelection {
        action: &'static str,
        amount: u32,
        count: u32,
    },

    #[error("Dice evaluation timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Dice evaluation aborted: {message}")]
    Aborted { message: String },
}

/// Why handling of a single message stopped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandleError {
    #[error("Lookup failed: {0}")]
    Lookup(#[from] LookupError),

    #[error("Dice error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type alias for gateway lookups.
pub type LookupResult<T> = std::result::Result<T, LookupError>;

/// Result type alias for gateway operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
