//! Startup checks on the merged configuration.
//!
//! All problems are collected and reported together.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Placeholder shipped in the sample configuration.
const TOKEN_PLACEHOLDER: &str = "YOUR_DISCORD_TOKEN_HERE";

/// Check a configuration, listing every problem found.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Validate Discord config
    if config.discord.token.is_empty() {
        errors.push("discord.token is required (set DICEBOT_DISCORD_TOKEN)".to_string());
    }
    if config.discord.token == TOKEN_PLACEHOLDER {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }

    // Validate command tokens
    for (field, token) in [
        ("commands.roll", &config.commands.roll),
        ("commands.help", &config.commands.help),
    ] {
        if token.is_empty() {
            errors.push(format!("{} must not be empty", field));
        } else if token.chars().any(char::is_whitespace) {
            errors.push(format!("{} '{}' must not contain whitespace", field, token));
        }
    }
    if !config.commands.roll.is_empty() && config.commands.roll == config.commands.help {
        errors.push(format!(
            "commands.roll and commands.help are both '{}'",
            config.commands.roll
        ));
    }

    // Validate engine limits
    if config.engine.timeout_secs == 0 {
        errors.push("engine.timeout_secs must be non-zero".to_string());
    }
    if config.engine.max_dice == 0 {
        errors.push("engine.max_dice must be non-zero".to_string());
    }

    // Validate runtime
    if config.runtime.event_buffer == 0 {
        errors.push("runtime.event_buffer must be non-zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
