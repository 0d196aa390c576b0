// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use ringlog_storage::{FileBackend, SharedHistory, StoreError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{BackendKind, Config, ConfigError};
use crate::server::{self, Server, ServerError, ServerReport};
use crate::timestamp;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to acquire lock {0}: daemon already running?")]
    LockFailed(PathBuf, #[source] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A started daemon, bound and ready to accept
pub struct Daemon {
    config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    lock_file: File,
    server: Server,
    history: SharedHistory,
    timestamps: Option<JoinHandle<()>>,
}

impl Daemon {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.server.local_addr()
    }

    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    /// Serve until the shutdown token is cancelled, then release
    /// everything startup acquired.
    pub async fn run(self) -> Result<ServerReport, LifecycleError> {
        let Daemon {
            config,
            lock_file,
            server,
            history,
            timestamps,
        } = self;

        let report = server.run().await;
        info!("Shutting down daemon...");

        // Already cancelled: the server only returns after shutdown
        if let Some(task) = timestamps {
            if let Err(e) = task.await {
                warn!(error = %e, "timestamp appender failed");
            }
        }

        if let Err(e) = history.close() {
            warn!(error = %e, "failed to close history");
        }

        let pid_path = config.pid_path();
        if let Err(e) = std::fs::remove_file(&pid_path) {
            warn!(path = %pid_path.display(), error = %e, "failed to remove PID file");
        }
        drop(lock_file);

        info!("Daemon shutdown complete");
        Ok(report)
    }
}

/// Acquire the pid lock, open the history and bind the listener.
///
/// Must be called from within a tokio runtime.
pub fn startup(config: &Config, shutdown: CancellationToken) -> Result<Daemon, LifecycleError> {
    config.validate()?;
    std::fs::create_dir_all(&config.state_dir)?;

    // Lock before touching anything else. On failure the files belong to
    // whoever holds the lock, so nothing is cleaned up.
    let lock_file = acquire_lock(&config.pid_path())?;

    match startup_locked(config, lock_file, shutdown) {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Startup steps that run while holding the pid lock
fn startup_locked(
    config: &Config,
    lock_file: File,
    shutdown: CancellationToken,
) -> Result<Daemon, LifecycleError> {
    let capacity = config.ring_capacity()?;
    let history = match config.backend {
        BackendKind::Memory => SharedHistory::in_memory(capacity),
        BackendKind::File => {
            SharedHistory::new(FileBackend::create(&config.data_path(), capacity)?)
        }
    };

    // Bind last, once everything else is in place
    let listener = server::bind(config.bind, config.backlog)?;
    let server = Server::new(
        listener,
        history.clone(),
        shutdown.clone(),
        config.server_settings(),
    );
    let addr = server.local_addr()?;

    let timestamps = config
        .timestamp_interval
        .map(|period| timestamp::spawn(history.clone(), period, shutdown));

    info!(
        %addr,
        backend = %config.backend,
        capacity = capacity.get(),
        "Daemon started"
    );

    Ok(Daemon {
        config: config.clone(),
        lock_file,
        server,
        history,
        timestamps,
    })
}

/// Open the pid file without truncating, lock it, then record our pid
fn acquire_lock(path: &Path) -> Result<File, LifecycleError> {
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    file.try_lock_exclusive()
        .map_err(|e| LifecycleError::LockFailed(path.to_path_buf(), e))?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()?;
    Ok(file)
}

/// Read the pid recorded in a pid file
pub fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.backend == BackendKind::File {
        let _ = std::fs::remove_file(config.data_path());
    }
    let _ = std::fs::remove_file(config.pid_path());
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
