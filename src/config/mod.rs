//! Configuration parsing and types.

pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

use std::path::Path;

use tracing::info;

use crate::common::error::ConfigError;

pub use parser::load_config;
pub use types::*;

/// Load the config file (if present), apply environment overrides and validate.
///
/// A missing file is not an error: the defaults plus environment are enough
/// to run with only `DICEBOT_DISCORD_TOKEN` set.
pub fn load_and_validate(path: &str) -> Result<Config, ConfigError> {
    let config = if Path::new(path).exists() {
        load_config(path)?
    } else {
        info!("No config file at {}, using defaults", path);
        Config::default()
    };

    let config = env::apply_env_overrides(config);
    validate::validate_config(&config)?;
    Ok(config)
}
