// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-open reader over the shared history
//!
//! A handle behaves like an open character device: it carries its own file
//! position, reads return at most the remainder of one entry, and the
//! position can be moved with [`Seek`] or with a write-command seek.
//! Writes are accumulated until a `\n` arrives, and each completed line
//! becomes one entry.

use std::io::{self, Read, Seek, SeekFrom, Write};

use ringlog_core::{Entry, HistoryError, SeekTo};
use tracing::debug;

use crate::history::SharedHistory;
use crate::StoreError;

/// Reader with a private position into a [`SharedHistory`]
#[derive(Debug)]
pub struct HistoryHandle {
    history: SharedHistory,
    pos: usize,
    // Bytes written since the last terminator
    pending: Vec<u8>,
}

impl HistoryHandle {
    pub(crate) fn new(history: SharedHistory) -> Self {
        Self {
            history,
            pos: 0,
            pending: Vec::new(),
        }
    }

    /// Bytes written that are still waiting for a terminator
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Current global character offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move to byte `write_cmd_offset` of the `write_cmd`-th oldest entry.
    ///
    /// The position is left untouched on failure.
    pub fn seek_to(&mut self, seek: SeekTo) -> Result<usize, HistoryError> {
        self.pos = self.history.offset_for(seek)?;
        Ok(self.pos)
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Stream the whole history from offset 0 in chunks of at most
    /// `chunk_size` bytes. The lock is taken once per chunk.
    pub fn playback(&mut self, chunk_size: usize) -> Playback<'_> {
        self.rewind();
        Playback {
            handle: self,
            chunk_size: chunk_size.max(1),
            done: false,
        }
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        let n = self.history.read_at(self.pos, buf)?;
        self.pos += n;
        Ok(n)
    }
}

impl Read for HistoryHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_chunk(buf)?)
    }
}

/// A write consumes up to and including the first `\n` in `buf` and
/// commits the pending bytes as one entry, so `write_all` stores one entry
/// per line. Without a terminator the whole buffer is held back.
impl Write for HistoryHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(end) = buf.iter().position(|b| *b == b'\n') else {
            self.pending.extend_from_slice(buf);
            return Ok(buf.len());
        };

        let mut line = Vec::with_capacity(self.pending.len() + end + 1);
        line.extend_from_slice(&self.pending);
        line.extend_from_slice(&buf[..=end]);
        let evicted = self.history.append(Entry::new(line))?;
        self.pending.clear();

        if let Some(old) = evicted {
            debug!(evicted_len = old.len(), "write evicted oldest entry");
        }
        Ok(end + 1)
    }

    /// Nothing is buffered below the history; partial lines stay pending
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for HistoryHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let end = self.history.total_len() as i128;
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(delta) => self.pos as i128 + delta as i128,
            SeekFrom::End(delta) => end + delta as i128,
        };
        if target < 0 || target > end {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("seek to {} outside 0..={}", target, end),
            ));
        }
        self.pos = target as usize;
        Ok(self.pos as u64)
    }
}

/// Chunked playback of the history; see [`HistoryHandle::playback`]
#[derive(Debug)]
pub struct Playback<'a> {
    handle: &'a mut HistoryHandle,
    chunk_size: usize,
    done: bool,
}

impl Iterator for Playback<'_> {
    type Item = Result<Vec<u8>, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut chunk = vec![0; self.chunk_size];
        match self.handle.read_chunk(&mut chunk) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(n) => {
                chunk.truncate(n);
                Some(Ok(chunk))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
