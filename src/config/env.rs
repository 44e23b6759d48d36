//! Environment overrides.
//!
//! `CEPTRA_*` variables win over anything read from a config file.

use std::path::PathBuf;

use crate::error::ConfigError;

use super::Config;

pub(super) fn apply_runtime_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(url) = non_empty(env_lookup, "CEPTRA_SERVER_URL") {
        config.gateway.server_url = url;
    }
    if let Some(token) = non_empty(env_lookup, "CEPTRA_TOKEN") {
        config.gateway.token = Some(token);
    }
    if let Some(root) = non_empty(env_lookup, "CEPTRA_WORKSPACE") {
        config.workspace.root = Some(PathBuf::from(root));
    }
    if let Some(timeout) = non_empty(env_lookup, "CEPTRA_API_TIMEOUT_SECS") {
        // Clamp to at least 1 second to avoid "no-timeout" accidental behavior.
        let parsed = timeout.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid CEPTRA_API_TIMEOUT_SECS value `{timeout}`: expected positive integer seconds"
            ))
        })?;
        config.gateway.timeout_secs = parsed.max(1);
    }
    Ok(())
}

/// Look up `name`, treating blank values as unset.
fn non_empty<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
