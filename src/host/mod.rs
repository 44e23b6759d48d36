//! Editor host primitives: file I/O and shell execution.
//!
//! The orchestration loop never touches the filesystem or spawns processes
//! itself; everything goes through a [`Host`] so tests can substitute a
//! recording stub and embedders can route effects through their own editor.

mod process;

use crate::error::HostError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Default wall-clock limit for one shell command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);
/// Default per-stream capture limit (5 MiB).
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 5 * 1024 * 1024;

/// Resource limits applied to one command run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecLimits {
    pub timeout: Duration,
    pub max_buffer_bytes: usize,
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
        }
    }
}

/// Captured result of one command run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecOutput {
    /// Process exit code; `-1` when killed by signal or timeout.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    /// At least one stream exceeded the capture limit.
    pub truncated: bool,
}

/// File and process primitives supplied by the embedding editor.
#[async_trait]
pub trait Host: Send + Sync {
    async fn read_file(&self, path: &Path) -> Result<String, HostError>;

    /// Write `content` to `path`, creating parent directories as needed.
    async fn write_file(&self, path: &Path, content: &str) -> Result<(), HostError>;

    /// Run `command` through the shell in `cwd`.
    ///
    /// Non-zero exits and timeouts come back as `Ok` with the outcome flagged;
    /// `Err` is reserved for failing to start the shell at all.
    async fn run_command(
        &self,
        command: &str,
        cwd: &Path,
        limits: ExecLimits,
    ) -> Result<ExecOutput, HostError>;
}

/// Host backed by the local filesystem and a POSIX shell.
#[derive(Debug, Clone)]
pub struct LocalHost {
    shell: String,
}

impl Default for LocalHost {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

#[async_trait]
impl Host for LocalHost {
    async fn read_file(&self, path: &Path) -> Result<String, HostError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| HostError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<(), HostError> {
        let io_err = |source| HostError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(path, content).await.map_err(io_err)
    }

    async fn run_command(
        &self,
        command: &str,
        cwd: &Path,
        limits: ExecLimits,
    ) -> Result<ExecOutput, HostError> {
        process::run_sh_process(&self.shell, command, cwd, limits).await
    }
}
