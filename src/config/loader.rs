//! Top-level config loading pipeline.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::env::apply_runtime_env_overrides;
use super::home::config_base_dir;
use super::sources::{read_config_text_with_sources, ConfigSource};
use super::Config;

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from --config flag).
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    Ok(load_config_with_source(path_override)?.0)
}

/// Load configuration and report which file it came from.
pub fn load_config_with_source(
    path_override: Option<&str>,
) -> Result<(Config, ConfigSource), ConfigError> {
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_base_dir,
    )
}

pub(super) fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<(Config, ConfigSource), ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (config_text, source) =
        read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let mut config: Config = toml::from_str(&config_text)?;
    apply_runtime_env_overrides(&mut config, &env_lookup)?;
    validate(&config)?;
    Ok((config, source))
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let server_url = config.gateway.server_url.trim();
    if server_url.is_empty() {
        return Err(ConfigError::Invalid(
            "gateway.server_url cannot be empty".to_string(),
        ));
    }
    if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
        return Err(ConfigError::Invalid(format!(
            "gateway.server_url must be an http(s) URL, got `{server_url}`"
        )));
    }
    let positive = [
        ("gateway.timeout_secs", config.gateway.timeout_secs as usize),
        (
            "execution.command_timeout_secs",
            config.execution.command_timeout_secs as usize,
        ),
        ("execution.max_buffer_bytes", config.execution.max_buffer_bytes),
        ("execution.output_char_limit", config.execution.output_char_limit),
        ("execution.read_char_limit", config.execution.read_char_limit),
        ("history.retention", config.history.retention),
        ("history.turn_char_cap", config.history.turn_char_cap),
    ];
    for (key, value) in positive {
        if value == 0 {
            return Err(ConfigError::Invalid(format!("{key} must be at least 1")));
        }
    }
    Ok(())
}
