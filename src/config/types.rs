//! Configuration type definitions.

use std::time::Duration;

use serde::Deserialize;

/// Default roll command token.
pub const DEFAULT_ROLL_TOKEN: &str = "!roll";

/// Default help command token.
pub const DEFAULT_HELP_TOKEN: &str = "!rollhelp";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub commands: CommandsConfig,
    pub engine: EngineConfig,
    pub runtime: RuntimeConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub token: String,
}

/// Command tokens recognized at the start of a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub roll: String,
    pub help: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            roll: DEFAULT_ROLL_TOKEN.to_string(),
            help: DEFAULT_HELP_TOKEN.to_string(),
        }
    }
}

/// Dice engine limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on a single evaluation.
    pub timeout_secs: u64,
    /// Maximum number of dice rolled by one expression.
    pub max_dice: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            max_dice: 1000,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Event processing settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of the gateway event queue.
    pub event_buffer: usize,
    /// How long shutdown waits for in-flight handlers.
    pub shutdown_grace_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer: 256,
            shutdown_grace_secs: 5,
        }
    }
}

impl RuntimeConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
