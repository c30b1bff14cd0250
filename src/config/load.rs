use super::{ConfigError, Settings};
use std::path::Path;

/// Loads settings from `config_path` when given, otherwise from the process
/// environment. This is the only place the environment is consulted.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, ConfigError> {
    let settings = match config_path {
        Some(path) => Settings::from_path(path)?,
        None => Settings::from_lookup(|key| std::env::var(key).ok())?,
    };
    settings.validate()?;
    Ok(settings)
}
