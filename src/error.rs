//! Unified error types for the assistant.

use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// GatewayError
// ---------------------------------------------------------------------------

/// Errors from the model gateway HTTP layer.
#[derive(Debug)]
pub enum GatewayError {
    /// Network / reqwest-level error, including timeouts.
    Http(reqwest::Error),
    /// Non-2xx status from the gateway.
    Status { code: u16, message: String },
    /// 2xx response whose body did not carry a `content` string.
    InvalidResponse(String),
}

impl GatewayError {
    /// HTTP status code carried by this error, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|status| status.as_u16()),
            Self::Status { code, .. } => Some(*code),
            Self::InvalidResponse(_) => None,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) if e.is_timeout() => write!(f, "gateway request timed out: {e}"),
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Status { code, message } if message.is_empty() => {
                write!(f, "gateway error: {code}")
            }
            Self::Status { code, message } => write!(f, "gateway error: {code}: {message}"),
            Self::InvalidResponse(msg) => write!(f, "invalid gateway response: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

// ---------------------------------------------------------------------------
// HostError
// ---------------------------------------------------------------------------

/// Errors from the editor host's file and process primitives.
#[derive(Debug)]
pub enum HostError {
    /// Filesystem read/write failure on `path`.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The shell could not be started at all.
    Spawn(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Spawn(msg) => write!(f, "failed to start command: {msg}"),
        }
    }
}

impl std::error::Error for HostError {}

// ---------------------------------------------------------------------------
// AuthError
// ---------------------------------------------------------------------------

/// Errors from sign-in and credential persistence.
#[derive(Debug)]
pub enum AuthError {
    Http(reqwest::Error),
    /// The gateway refused the credentials.
    Rejected(String),
    /// Credential storage failed.
    Store(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Rejected(msg) => write!(f, "{msg}"),
            Self::Store(msg) => write!(f, "credential store: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

// ---------------------------------------------------------------------------
// AgentError: top-level
// ---------------------------------------------------------------------------

/// Top-level error type for the orchestration loop.
#[derive(Debug)]
pub enum AgentError {
    /// A cycle is already in flight for this session.
    CycleInFlight,
    /// No pending approval carries this id.
    UnknownApproval(String),
    Gateway(GatewayError),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycleInFlight => write!(f, "a cycle is already in flight for this session"),
            Self::UnknownApproval(id) => write!(f, "no pending action with id `{id}`"),
            Self::Gateway(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<GatewayError> for AgentError {
    fn from(e: GatewayError) -> Self {
        Self::Gateway(e)
    }
}
