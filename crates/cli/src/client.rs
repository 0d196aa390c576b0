// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP client and daemon process helpers for CLI commands

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use ringlog_core::SeekTo;
use ringlog_daemon::protocol::{seek_command, LINE_TERMINATOR};
use ringlog_daemon::STARTUP_MARKER_PREFIX;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for connecting to the server
pub fn timeout_connect() -> Duration {
    parse_duration_ms("RINGLOG_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for one request/response exchange
pub fn timeout_io() -> Duration {
    parse_duration_ms("RINGLOG_TIMEOUT_IO_MS").unwrap_or(Duration::from_secs(10))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    parse_duration_ms("RINGLOG_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(6))
}

/// Polling interval for retries
pub fn poll_interval() -> Duration {
    parse_duration_ms("RINGLOG_POLL_INTERVAL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to {0}: {1}")]
    Connect(SocketAddr, #[source] std::io::Error),

    #[error("Timed out talking to {0}")]
    Timeout(SocketAddr),

    #[error("Message must be a single line")]
    MultiLine,

    #[error("Unexpected response from server ({0} bytes)")]
    UnexpectedResponse(usize),

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append one line and return the server's playback of the full history
pub async fn send_line(addr: SocketAddr, text: &str) -> Result<Vec<u8>, ClientError> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    if text.contains('\n') {
        return Err(ClientError::MultiLine);
    }
    let mut message = Vec::with_capacity(text.len() + 1);
    message.extend_from_slice(text.as_bytes());
    message.push(LINE_TERMINATOR);

    let mut stream = connect(addr).await?;
    let exchange = async {
        stream.write_all(&message).await?;
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;
        Ok::<_, std::io::Error>(response)
    };
    let response = tokio::time::timeout(timeout_io(), exchange)
        .await
        .map_err(|_| ClientError::Timeout(addr))??;

    debug!(%addr, sent = message.len(), received = response.len(), "exchange complete");
    Ok(response)
}

/// Send a seek command and wait for the server to close the connection.
///
/// The server answers seeks with silence, so any bytes received are an error.
pub async fn seek(addr: SocketAddr, seek: SeekTo) -> Result<(), ClientError> {
    let mut stream = connect(addr).await?;
    let exchange = async {
        stream.write_all(&seek_command(seek)).await?;
        stream.shutdown().await?;
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;
        Ok::<_, std::io::Error>(response)
    };
    let response = tokio::time::timeout(timeout_io(), exchange)
        .await
        .map_err(|_| ClientError::Timeout(addr))??;

    if !response.is_empty() {
        return Err(ClientError::UnexpectedResponse(response.len()));
    }
    debug!(%addr, %seek, "seek sent");
    Ok(())
}

async fn connect(addr: SocketAddr) -> Result<TcpStream, ClientError> {
    tokio::time::timeout(timeout_connect(), TcpStream::connect(addr))
        .await
        .map_err(|_| ClientError::Timeout(addr))?
        .map_err(|e| ClientError::Connect(addr, e))
}

/// Find the ringlogd binary
pub fn find_ringlogd_binary() -> PathBuf {
    // Explicit override (used by tests to ensure correct binary)
    if let Ok(path) = std::env::var("RINGLOG_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    // Check current executable's directory
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("ringlogd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    // Fall back to PATH lookup
    PathBuf::from("ringlogd")
}

/// Start ringlogd in background mode, returning its launcher output
pub fn start_daemon(state_dir: Option<&Path>, log_path: &Path) -> Result<String, ClientError> {
    let mut cmd = Command::new(find_ringlogd_binary());
    cmd.arg("-d");
    if let Some(dir) = state_dir {
        cmd.arg("--state-dir").arg(dir);
    }

    let output = cmd
        .stdin(std::process::Stdio::null())
        .output()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }

    let detail = read_startup_error(log_path).unwrap_or_else(|| {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        }
    });
    Err(ClientError::DaemonStartFailed(detail))
}

/// Stop the daemon (graceful first, then forceful)
/// Returns true if daemon was stopped, false if it wasn't running
pub async fn daemon_stop(pid_path: &Path) -> bool {
    let Some(pid) = ringlog_daemon::read_pid(pid_path) else {
        return false;
    };
    if !process_exists(pid) {
        cleanup_stale_pid(pid_path);
        return false;
    }

    if terminate_daemon(pid) {
        wait_for_exit(pid, timeout_exit()).await;
    }

    // Force kill if still running
    if process_exists(pid) {
        force_kill_daemon(pid);
        wait_for_exit(pid, timeout_exit()).await;
    }

    cleanup_stale_pid(pid_path);
    true
}

/// Wait for a process to exit
async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    false
}

/// Remove a pid file left behind by a daemon that is gone
fn cleanup_stale_pid(pid_path: &Path) {
    if pid_path.exists() {
        let _ = std::fs::remove_file(pid_path);
    }
}

/// Check if a process with the given PID exists
pub fn process_exists(pid: u32) -> bool {
    // Use kill -0 to check if process exists without sending a signal
    kill(&["-0", &pid.to_string()])
}

/// Ask the daemon to shut down
fn terminate_daemon(pid: u32) -> bool {
    kill(&["-TERM", &pid.to_string()])
}

/// Force kill a daemon process
fn force_kill_daemon(pid: u32) -> bool {
    kill(&["-9", &pid.to_string()])
}

fn kill(args: &[&str]) -> bool {
    Command::new("kill")
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Read daemon log from the last startup marker, looking for errors.
/// Returns the error message if found, None otherwise.
pub fn read_startup_error(log_path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(log_path).ok()?;

    // Find the last startup marker
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let startup_log = &content[start_pos..];

    let errors: Vec<&str> = startup_log
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
        .collect();

    if errors.is_empty() {
        return None;
    }

    // Keep the message after the last "Failed to start daemon: " when present
    let mut messages: Vec<&str> = errors
        .iter()
        .map(|line| {
            line.rsplit_once("Failed to start daemon: ")
                .map_or(*line, |(_, msg)| msg)
        })
        .collect();
    messages.dedup();
    Some(messages.join("\n"))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
