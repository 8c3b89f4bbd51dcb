//! Configuration file parsing (HOCON format).

use std::fs;
use std::path::Path;

use hocon::HoconLoader;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    load_config_str(&content)
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_full_config() {
        let config = load_config_str(
            r#"
            discord { token = "abc" }
            commands { roll = "/r", help = "/rhelp" }
            engine { timeout_secs = 2, max_dice = 50 }
            runtime { event_buffer = 16, shutdown_grace_secs = 1 }
            "#,
        )
        .unwrap();

        assert_eq!(config.discord.token, "abc");
        assert_eq!(config.commands.roll, "/r");
        assert_eq!(config.commands.help, "/rhelp");
        assert_eq!(config.engine.timeout_secs, 2);
        assert_eq!(config.engine.max_dice, 50);
        assert_eq!(config.runtime.event_buffer, 16);
        assert_eq!(config.runtime.shutdown_grace_secs, 1);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = load_config_str(r#"discord { token = "abc" }"#).unwrap();

        assert_eq!(config.commands.roll, "!roll");
        assert_eq!(config.commands.help, "!rollhelp");
        assert_eq!(config.engine.timeout_secs, 5);
        assert_eq!(config.engine.max_dice, 1000);
        assert_eq!(config.runtime.event_buffer, 256);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_config("/nonexistent/dicebot.conf");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }

    #[test]
    fn test_malformed_config_is_parse_error() {
        let result = load_config_str("discord { token = ");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
