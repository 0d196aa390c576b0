// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection protocol handling
//!
//! A session waits for one line, then either repositions its read cursor
//! (seek command) and waits for the next line, or appends the line to the
//! history, streams the full playback back and closes.

use std::fmt;
use std::net::SocketAddr;

use ringlog_core::{Entry, SeekTo};
use ringlog_storage::{HistoryHandle, SharedHistory, StoreError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::{self, Message, ProtocolError, INITIAL_BUFFER_LEN};

/// Identity of one accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// An entry was appended and the playback sent
    Responded { appended: usize, sent: usize },
    /// The peer closed before completing a data line
    PeerClosed,
    /// Shutdown was requested while waiting for a message
    Shutdown,
}

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of waiting for the next message
enum Next {
    Line(Vec<u8>),
    Closed,
    Shutdown,
}

/// One client connection
pub struct Session<R, W> {
    id: SessionId,
    peer: SocketAddr,
    reader: R,
    writer: W,
    buffer: Vec<u8>,
    history: SharedHistory,
    cursor: HistoryHandle,
    chunk_size: usize,
    shutdown: CancellationToken,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        id: SessionId,
        peer: SocketAddr,
        reader: R,
        writer: W,
        history: &SharedHistory,
        chunk_size: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            peer,
            reader,
            writer,
            buffer: Vec::with_capacity(INITIAL_BUFFER_LEN),
            history: history.clone(),
            cursor: history.open(),
            chunk_size,
            shutdown,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Global character offset of this session's read cursor
    pub fn cursor(&self) -> usize {
        self.cursor.position()
    }

    /// Drive the connection until it closes
    pub async fn run(&mut self) -> Result<SessionOutcome, SessionError> {
        loop {
            let line = match self.next_message().await? {
                Next::Line(line) => line,
                Next::Closed => {
                    if !self.buffer.is_empty() {
                        debug!(
                            session = %self.id,
                            pending = self.buffer.len(),
                            "peer closed mid-message, discarding"
                        );
                    }
                    return Ok(SessionOutcome::PeerClosed);
                }
                Next::Shutdown => return Ok(SessionOutcome::Shutdown),
            };

            match Message::parse(line) {
                Message::Seek(seek) => self.seek(seek),
                Message::MalformedSeek(args) => {
                    warn!(
                        session = %self.id,
                        peer = %self.peer,
                        args = %args,
                        "ignoring malformed seek command"
                    );
                }
                Message::Data(data) => {
                    let appended = self.append(data).await?;
                    let sent = self.respond().await?;
                    return Ok(SessionOutcome::Responded { appended, sent });
                }
            }
        }
    }

    /// Wait for a complete line.
    ///
    /// Shutdown only interrupts a session that has nothing buffered; a
    /// message already underway is read to its terminator.
    async fn next_message(&mut self) -> Result<Next, SessionError> {
        if !self.shutdown.is_cancelled() {
            tokio::select! {
                line = protocol::read_message(&mut self.reader, &mut self.buffer) => {
                    return Ok(line?.map_or(Next::Closed, Next::Line));
                }
                _ = self.shutdown.cancelled() => {}
            }
        }

        if self.buffer.is_empty() {
            debug!(session = %self.id, "shutdown while idle");
            return Ok(Next::Shutdown);
        }

        debug!(
            session = %self.id,
            pending = self.buffer.len(),
            "shutdown requested mid-message, finishing"
        );
        let line = protocol::read_message(&mut self.reader, &mut self.buffer).await?;
        Ok(line.map_or(Next::Closed, Next::Line))
    }

    fn seek(&mut self, seek: SeekTo) {
        match self.cursor.seek_to(seek) {
            Ok(offset) => {
                let entry = self.history.locate(offset).map(|p| p.index);
                info!(session = %self.id, %seek, offset, ?entry, "seek applied");
            }
            Err(e) => {
                warn!(session = %self.id, %seek, error = %e, "seek rejected");
            }
        }
    }

    /// Move the line into the history, returning its length
    async fn append(&mut self, data: Vec<u8>) -> Result<usize, SessionError> {
        let len = data.len();
        if let Some(evicted) = append_entry(&self.history, Entry::new(data)).await? {
            debug!(session = %self.id, evicted_len = evicted.len(), "evicted oldest entry");
        }
        info!(session = %self.id, len, "appended entry");
        Ok(len)
    }

    /// Stream the history from offset 0 back to the client
    async fn respond(&mut self) -> Result<usize, SessionError> {
        let mut sent = 0;
        for chunk in self.cursor.playback(self.chunk_size) {
            let chunk = chunk?;
            self.writer.write_all(&chunk).await?;
            sent += chunk.len();
        }
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        debug!(session = %self.id, sent, "playback sent");
        Ok(sent)
    }
}

/// Append on the blocking pool; a file-backed history syncs to disk
/// while holding the lock.
pub(crate) async fn append_entry(
    history: &SharedHistory,
    entry: Entry,
) -> Result<Option<Entry>, StoreError> {
    let history = history.clone();
    tokio::task::spawn_blocking(move || history.append(entry))
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
