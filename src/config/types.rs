//! Configuration data model.
//!
//! Every section deserializes with `#[serde(default)]`, so a config file only
//! needs the keys it wants to change.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::{
    DEFAULT_ANALYSIS_WINDOW, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_GATEWAY_TIMEOUT_SECS,
    DEFAULT_MAX_BUFFER_BYTES, DEFAULT_OUTPUT_CHAR_LIMIT, DEFAULT_PLANNING_WINDOW,
    DEFAULT_READ_CHAR_LIMIT, DEFAULT_RETENTION, DEFAULT_SERVER_URL, DEFAULT_TURN_CHAR_CAP,
};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub execution: ExecutionConfig,
    pub history: HistoryConfig,
    pub workspace: WorkspaceConfig,
    pub display: DisplayConfig,
}

/// Chat gateway endpoint and identity override.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    pub server_url: String,
    pub timeout_secs: u64,
    /// Bearer token used instead of the stored sign-in credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            timeout_secs: DEFAULT_GATEWAY_TIMEOUT_SECS,
            token: None,
        }
    }
}

/// Limits applied to approved actions and reads.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub command_timeout_secs: u64,
    pub max_buffer_bytes: usize,
    pub output_char_limit: usize,
    pub read_char_limit: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            output_char_limit: DEFAULT_OUTPUT_CHAR_LIMIT,
            read_char_limit: DEFAULT_READ_CHAR_LIMIT,
        }
    }
}

/// Conversation retention and context window sizes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HistoryConfig {
    pub retention: usize,
    pub planning_window: usize,
    pub analysis_window: usize,
    pub turn_char_cap: usize,
    /// Save the transcript between runs.
    pub persist: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            planning_window: DEFAULT_PLANNING_WINDOW,
            analysis_window: DEFAULT_ANALYSIS_WINDOW,
            turn_char_cap: DEFAULT_TURN_CHAR_CAP,
            persist: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Project root; the process working directory when unset.
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

/// Outcome of `ceptra init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Created { path: PathBuf },
    AlreadyInitialized { path: PathBuf },
    Overwritten { path: PathBuf, backup_path: PathBuf },
}
