// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backing store contract and the in-memory ring

use std::num::NonZeroUsize;

use ringlog_core::{CircularBuffer, Entry, HistoryError, SeekTo};

use crate::StoreError;

/// Where a global character offset lands: the `index`-th oldest live entry,
/// `offset` bytes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub index: usize,
    pub offset: usize,
}

/// A bounded history of entries addressable by character offset.
///
/// Implementations are not synchronized; [`crate::SharedHistory`] takes a
/// single lock around every call.
pub trait HistoryBackend: Send {
    /// Append `entry`, returning the evicted oldest entry when at capacity
    fn append(&mut self, entry: Entry) -> Result<Option<Entry>, StoreError>;

    /// Translate a global character offset, `None` past the live data
    fn locate(&self, char_offset: usize) -> Option<Position>;

    /// Absolute character offset for a (write command, offset) request
    fn offset_for(&self, seek: SeekTo) -> Result<usize, HistoryError>;

    /// Copy bytes starting at `char_offset` into `buf`, stopping at the end
    /// of the entry that holds `char_offset`. Returns 0 past the live data.
    fn read_at(&self, char_offset: usize, buf: &mut [u8]) -> Result<usize, StoreError>;

    /// Number of live entries
    fn len(&self) -> usize;

    /// Total bytes across live entries
    fn total_len(&self) -> usize;

    fn capacity(&self) -> usize;

    /// Release anything held outside the process (files, device handles)
    fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// History kept entirely in memory
#[derive(Debug)]
pub struct MemoryBackend {
    ring: CircularBuffer,
}

impl MemoryBackend {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            ring: CircularBuffer::new(capacity),
        }
    }
}

impl HistoryBackend for MemoryBackend {
    fn append(&mut self, entry: Entry) -> Result<Option<Entry>, StoreError> {
        Ok(self.ring.add_entry(entry))
    }

    fn locate(&self, char_offset: usize) -> Option<Position> {
        locate(&self.ring, char_offset)
    }

    fn offset_for(&self, seek: SeekTo) -> Result<usize, HistoryError> {
        self.ring.offset_for(seek)
    }

    fn read_at(&self, char_offset: usize, buf: &mut [u8]) -> Result<usize, StoreError> {
        let Some(found) = self.ring.find_entry_offset(char_offset) else {
            return Ok(0);
        };
        let tail = found.entry.tail(found.offset);
        let n = tail.len().min(buf.len());
        buf[..n].copy_from_slice(&tail[..n]);
        Ok(n)
    }

    fn len(&self) -> usize {
        self.ring.len()
    }

    fn total_len(&self) -> usize {
        self.ring.total_len()
    }

    fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

pub(crate) fn locate(ring: &CircularBuffer, char_offset: usize) -> Option<Position> {
    ring.find_entry_offset(char_offset).map(|found| Position {
        index: found.index,
        offset: found.offset,
    })
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
