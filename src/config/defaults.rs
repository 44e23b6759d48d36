//! Default configuration constants.
//!
//! Keeping defaults in one module lets the data model, the template, and the
//! tests share the same literals.

/// Embedded default `ceptra.toml` template written by `ceptra init`.
pub(super) const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../templates/ceptra.toml");
/// Hosted chat gateway.
pub(super) const DEFAULT_SERVER_URL: &str = "https://ceptra-ai.vercel.app";
/// Timeout for one gateway request.
pub(super) const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 120;
/// Wall-clock limit for one approved command.
pub(super) const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;
/// Per-stream capture limit for approved commands.
pub(super) const DEFAULT_MAX_BUFFER_BYTES: usize = 5 * 1024 * 1024;
pub(super) const DEFAULT_OUTPUT_CHAR_LIMIT: usize = 5000;
pub(super) const DEFAULT_READ_CHAR_LIMIT: usize = 3000;
pub(super) const DEFAULT_RETENTION: usize = 50;
/// Most recent turns, including the new user message, sent with a planning request.
pub(super) const DEFAULT_PLANNING_WINDOW: usize = 10;
/// Turns sent with the post-command analysis request.
pub(super) const DEFAULT_ANALYSIS_WINDOW: usize = 8;
pub(super) const DEFAULT_TURN_CHAR_CAP: usize = 1000;
/// Config file name searched locally and under the global config dir.
pub(super) const CONFIG_FILE_NAME: &str = "ceptra.toml";
/// Subdirectory under the config root holding config and session state.
pub(super) const APP_DIR_NAME: &str = "ceptra";
