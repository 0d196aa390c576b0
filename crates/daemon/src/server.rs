// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accept loop and session registry.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ringlog_storage::SharedHistory;
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::protocol::DEFAULT_CHUNK_SIZE;
use crate::session::{Session, SessionId, SessionOutcome};

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {0}: {1}")]
    Bind(SocketAddr, #[source] io::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Tunables for the accept loop
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Playback transfer chunk size
    pub chunk_size: usize,
    /// How often finished sessions are dropped from the registry
    pub reap_interval: Duration,
    /// How long shutdown waits for in-flight sessions before aborting them
    pub shutdown_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            reap_interval: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Summary returned once the server has stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerReport {
    /// Connections accepted over the server's lifetime
    pub accepted: u64,
    /// Sessions awaited at shutdown that completed within the timeout
    pub joined: usize,
    /// Sessions aborted because they outlived the shutdown timeout
    pub aborted: usize,
}

/// In-flight sessions keyed by id.
///
/// Guarded separately from the history so registration never contends with
/// store operations.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next session id (starting at 1)
    pub fn next_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn register(&self, id: SessionId, handle: JoinHandle<()>) {
        self.lock().insert(id, handle);
    }

    /// Drop handles of sessions that have already finished.
    ///
    /// Never waits on a running session. Returns the number removed.
    pub fn reap(&self) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, handle| !handle.is_finished());
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wait for every registered session, aborting any still running once
    /// `timeout` has elapsed. Returns `(joined, aborted)`.
    pub async fn join_all(&self, timeout: Duration) -> (usize, usize) {
        let drained: Vec<_> = {
            let mut sessions = self.lock();
            let mut drained: Vec<_> = sessions.drain().collect();
            drained.sort_by_key(|(id, _)| *id);
            drained
        };

        let deadline = Instant::now() + timeout;
        let mut joined = 0;
        let mut aborted = 0;
        for (id, mut handle) in drained {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => joined += 1,
                Ok(Err(e)) => {
                    warn!(session = %id, error = %e, "session task failed");
                    joined += 1;
                }
                Err(_) => {
                    warn!(session = %id, "session did not finish before shutdown timeout, aborting");
                    handle.abort();
                    aborted += 1;
                }
            }
        }
        (joined, aborted)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, JoinHandle<()>>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Bind a listening TCP socket with address reuse and an explicit backlog
pub fn bind(addr: SocketAddr, backlog: u32) -> Result<TcpListener, ServerError> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(|e| ServerError::Bind(addr, e))?;
    socket
        .set_reuseaddr(true)
        .map_err(|e| ServerError::Bind(addr, e))?;
    socket.bind(addr).map_err(|e| ServerError::Bind(addr, e))?;
    socket
        .listen(backlog)
        .map_err(|e| ServerError::Bind(addr, e))
}

/// Accepts connections and runs one task per session
pub struct Server {
    listener: TcpListener,
    history: SharedHistory,
    registry: SessionRegistry,
    shutdown: CancellationToken,
    settings: ServerSettings,
}

impl Server {
    pub fn new(
        listener: TcpListener,
        history: SharedHistory,
        shutdown: CancellationToken,
        settings: ServerSettings,
    ) -> Self {
        Self {
            listener,
            history,
            registry: SessionRegistry::new(),
            shutdown,
            settings,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until the shutdown token is cancelled, then wait for
    /// in-flight sessions.
    pub async fn run(self) -> ServerReport {
        let Server {
            listener,
            history,
            registry,
            shutdown,
            settings,
        } = self;

        let mut reap = tokio::time::interval(settings.reap_interval);
        reap.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut accepted = 0u64;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                result = listener.accept() => match result {
                    Ok((stream, peer)) => {
                        accepted += 1;
                        let id = registry.next_id();
                        let handle = dispatch(id, stream, peer, &history, &settings, &shutdown);
                        registry.register(id, handle);
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                    }
                },

                _ = reap.tick() => {
                    let reaped = registry.reap();
                    if reaped > 0 {
                        debug!(reaped, active = registry.len(), "reaped finished sessions");
                    }
                }
            }
        }

        drop(listener);
        let in_flight = registry.len();
        info!(in_flight, "stopped accepting connections, waiting for sessions");

        let (joined, aborted) = registry.join_all(settings.shutdown_timeout).await;
        info!(accepted, joined, aborted, "server stopped");

        ServerReport {
            accepted,
            joined,
            aborted,
        }
    }
}

/// Spawn the task that owns one connection
fn dispatch(
    id: SessionId,
    stream: TcpStream,
    peer: SocketAddr,
    history: &SharedHistory,
    settings: &ServerSettings,
    shutdown: &CancellationToken,
) -> JoinHandle<()> {
    info!(session = %id, %peer, "connection accepted");

    let (reader, writer) = stream.into_split();
    let mut session = Session::new(
        id,
        peer,
        reader,
        writer,
        history,
        settings.chunk_size,
        shutdown.clone(),
    );

    tokio::spawn(async move {
        match session.run().await {
            Ok(SessionOutcome::Responded { appended, sent }) => {
                info!(session = %id, %peer, appended, sent, "connection closed");
            }
            Ok(outcome) => {
                info!(session = %id, %peer, ?outcome, "connection closed");
            }
            Err(e) => {
                error!(session = %id, %peer, error = %e, "session failed");
            }
        }
    })
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
