//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `DICEBOT_DISCORD_TOKEN` - Discord bot token (`DISCORDICE_TOKEN` is accepted too)
//! - `DICEBOT_ROLL_TOKEN` - Roll command token
//! - `DICEBOT_HELP_TOKEN` - Help command token
//! - `DICEBOT_ENGINE_TIMEOUT_SECS` - Dice evaluation timeout
//! - `DICEBOT_MAX_DICE` - Maximum dice per expression

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "DICEBOT";

/// Token variable used by earlier deployments.
const LEGACY_TOKEN_VAR: &str = "DISCORDICE_TOKEN";

/// Default config file name.
const DEFAULT_CONFIG_PATH: &str = "dicebot.conf";

/// Apply environment variable overrides to a config.
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides_from(config, |name| env::var(name).ok())
}

/// Apply overrides using `lookup` to read variables.
fn apply_overrides_from(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    let var = |suffix: &str| lookup(&format!("{}_{}", ENV_PREFIX, suffix));

    // Discord token; the prefixed name wins over the legacy one
    if let Some(token) = var("DISCORD_TOKEN").or_else(|| lookup(LEGACY_TOKEN_VAR)) {
        config.discord.token = token;
    }

    // Command tokens
    if let Some(roll) = var("ROLL_TOKEN") {
        config.commands.roll = roll;
    }
    if let Some(help) = var("HELP_TOKEN") {
        config.commands.help = help;
    }

    // Engine limits
    if let Some(timeout) = var("ENGINE_TIMEOUT_SECS") {
        if let Ok(timeout) = timeout.parse() {
            config.engine.timeout_secs = timeout;
        }
    }
    if let Some(max_dice) = var("MAX_DICE") {
        if let Ok(max_dice) = max_dice.parse() {
            config.engine.max_dice = max_dice;
        }
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `DICEBOT_CONFIG` environment variable, otherwise returns "dicebot.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn apply(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        apply_overrides_from(Config::default(), |name| vars.get(name).cloned())
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "DICEBOT");
    }

    #[test]
    fn test_no_vars_leaves_config_unchanged() {
        let config = apply(&[]);
        assert!(config.discord.token.is_empty());
        assert_eq!(config.commands.roll, "!roll");
        assert_eq!(config.engine.max_dice, 1000);
    }

    #[test]
    fn test_token_override() {
        let config = apply(&[("DICEBOT_DISCORD_TOKEN", "secret")]);
        assert_eq!(config.discord.token, "secret");
    }

    #[test]
    fn test_legacy_token_is_fallback() {
        let config = apply(&[("DISCORDICE_TOKEN", "legacy")]);
        assert_eq!(config.discord.token, "legacy");

        let config = apply(&[("DISCORDICE_TOKEN", "legacy"), ("DICEBOT_DISCORD_TOKEN", "new")]);
        assert_eq!(config.discord.token, "new");
    }

    #[test]
    fn test_numeric_overrides_ignore_garbage() {
        let config = apply(&[
            ("DICEBOT_ENGINE_TIMEOUT_SECS", "9"),
            ("DICEBOT_MAX_DICE", "lots"),
        ]);
        assert_eq!(config.engine.timeout_secs, 9);
        assert_eq!(config.engine.max_dice, 1000);
    }

    #[test]
    fn test_command_token_overrides() {
        let config = apply(&[("DICEBOT_ROLL_TOKEN", "/r"), ("DICEBOT_HELP_TOKEN", "/rh")]);
        assert_eq!(config.commands.roll, "/r");
        assert_eq!(config.commands.help, "/rh");
    }
}
