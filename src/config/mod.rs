//! The `config` module loads the application settings.
//!
//! Sources, lowest to highest priority: built-in defaults, an optional
//! `config/default.{toml,yaml,json}` file, then `SUBMUX__*` environment
//! variables (`SUBMUX__SERVER__PORT=9001`). A `.env` file, if present, is
//! loaded into the environment first.

mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    HubSettings, LoggingSettings, MultiplexerSettings, ServerSettings, Settings,
};

const ENV_PREFIX: &str = "SUBMUX";
const ENV_SEPARATOR: &str = "__";

/// Loads the configuration from the default file and environment variables
/// and merges it over `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let _ = dotenvy::dotenv();
    load_config_from("config/default")
}

/// Same as [`load_config`] but reads the optional file from `path`
/// (without extension) and does not touch `.env`.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    let settings = partial.merge_over(Settings::default());
    if settings.server.max_connections == 0 {
        return Err(ConfigError::Message(
            "server.max_connections must be at least 1".to_string(),
        ));
    }
    Ok(settings)
}

#[cfg(test)]
mod tests;
