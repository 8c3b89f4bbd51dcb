//! Discord bot integration.
//!
//! This module provides the Discord side of the bot: command routing,
//! result formatting, message lifecycle and the serenity client.

pub mod client;
pub mod commands;
pub mod formatter;
pub mod gateway;
pub mod handler;
pub mod lifecycle;

#[cfg(test)]
pub mod testing;

// Re-export main types for external use
pub use client::DiceBotBuilder;
