//! Process and shell execution helpers for the local host.

use crate::error::HostError;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::{ExecLimits, ExecOutput};

/// Run a shell command in `cwd`, capping captured output and wall time.
///
/// Exceeding the timeout is not an error: the child is killed and the
/// returned output is flagged as timed out.
pub(super) async fn run_sh_process(
    shell: &str,
    command: &str,
    cwd: &Path,
    limits: ExecLimits,
) -> Result<ExecOutput, HostError> {
    let args = ["-c", command];
    let fut = run_process(shell, &args, cwd, limits.max_buffer_bytes);
    match timeout(limits.timeout, fut).await {
        Ok(out) => out,
        Err(_) => Ok(ExecOutput {
            exit_code: -1,
            stdout: String::new(),
            stderr: format!("command timed out after {}", format_duration(limits.timeout)),
            timed_out: true,
            truncated: false,
        }),
    }
}

/// Human-oriented duration formatting used in timeout messages.
pub(super) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();
    if secs == 0 {
        return format!("{millis}ms");
    }
    if millis == 0 {
        if secs % 3600 == 0 {
            return format!("{}h", secs / 3600);
        }
        if secs % 60 == 0 {
            return format!("{}m", secs / 60);
        }
        return format!("{secs}s");
    }
    format!("{secs}.{millis:03}s")
}

/// Spawn and wait for a process, reading at most `max_bytes` per stream.
async fn run_process(
    program: &str,
    args: &[&str],
    cwd: &Path,
    max_bytes: usize,
) -> Result<ExecOutput, HostError> {
    let mut cmd = Command::new(program);
    // A timed-out or cancelled cycle drops this future; make sure the child
    // goes with it.
    cmd.kill_on_drop(true);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| HostError::Spawn(format!("{program}: {e}")))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (stdout, stderr, status) = tokio::join!(
        read_capped(stdout, max_bytes),
        read_capped(stderr, max_bytes),
        child.wait()
    );
    let status = status.map_err(|e| HostError::Spawn(format!("{program}: {e}")))?;
    let (stdout, stdout_truncated) = stdout.map_err(|e| HostError::Spawn(format!("{program}: {e}")))?;
    let (stderr, stderr_truncated) = stderr.map_err(|e| HostError::Spawn(format!("{program}: {e}")))?;

    Ok(ExecOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&stdout).to_string(),
        stderr: String::from_utf8_lossy(&stderr).to_string(),
        timed_out: false,
        truncated: stdout_truncated || stderr_truncated,
    })
}

/// Read a stream to EOF, keeping only the first `cap` bytes.
///
/// The rest is drained and discarded so a chatty child never blocks on a
/// full pipe.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: Option<R>,
    cap: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let Some(mut reader) = reader else {
        return Ok((Vec::new(), false));
    };
    let mut kept = Vec::new();
    let mut exceeded = false;
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(kept.len());
        if n > room {
            exceeded = true;
        }
        kept.extend_from_slice(&chunk[..n.min(room)]);
    }
    Ok((kept, exceeded))
}
