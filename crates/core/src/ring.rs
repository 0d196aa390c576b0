// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-capacity ring of write commands
//!
//! The ring keeps the last N entries in insertion order. Entries are
//! addressed either by a global character offset (the position in the
//! oldest-to-newest concatenation of every live entry) or by a
//! [`SeekTo`] naming the n-th oldest entry and a byte within it.
//!
//! Any necessary locking is the caller's responsibility.

use std::num::NonZeroUsize;

use crate::entry::Entry;
use crate::error::HistoryError;
use crate::seek::SeekTo;

/// Number of write commands kept when no capacity is configured
pub const DEFAULT_CAPACITY: usize = 10;

/// Result of translating a global character offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOffset<'a> {
    /// Position of the entry among live entries, oldest first
    pub index: usize,
    pub entry: &'a Entry,
    /// Byte within `entry` corresponding to the requested offset
    pub offset: usize,
}

/// Bounded history with an insert cursor, an eviction cursor and a full flag.
///
/// `in_offs == out_offs` means empty when `full` is false and at capacity
/// when `full` is true.
#[derive(Debug)]
pub struct CircularBuffer {
    slots: Vec<Option<Entry>>,
    in_offs: usize,
    out_offs: usize,
    full: bool,
}

impl CircularBuffer {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let mut slots = Vec::with_capacity(capacity.get());
        slots.resize_with(capacity.get(), || None);
        Self {
            slots,
            in_offs: 0,
            out_offs: 0,
            full: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            (self.in_offs + self.capacity() - self.out_offs) % self.capacity()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.in_offs == self.out_offs
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Total bytes across all live entries
    pub fn total_len(&self) -> usize {
        self.iter().map(Entry::len).sum()
    }

    /// Insert `entry` at the insert cursor.
    ///
    /// When the ring is already full the oldest entry is handed back to the
    /// caller and the eviction cursor advances past it.
    pub fn add_entry(&mut self, entry: Entry) -> Option<Entry> {
        let capacity = self.capacity();
        let evicted = if self.full {
            let oldest = self.slots[self.out_offs].take();
            self.out_offs = (self.out_offs + 1) % capacity;
            oldest
        } else {
            None
        };

        self.slots[self.in_offs] = Some(entry);
        self.in_offs = (self.in_offs + 1) % capacity;
        self.full = self.in_offs == self.out_offs;

        evicted
    }

    /// The `index`-th oldest live entry
    pub fn get(&self, index: usize) -> Option<&Entry> {
        if index >= self.len() {
            return None;
        }
        self.slots[(self.out_offs + index) % self.capacity()].as_ref()
    }

    /// Live entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }

    /// Find the entry holding global character offset `char_offset`.
    ///
    /// Returns `None` when fewer than `char_offset + 1` bytes are live.
    pub fn find_entry_offset(&self, char_offset: usize) -> Option<EntryOffset<'_>> {
        if self.is_empty() {
            return None;
        }

        let mut remaining = char_offset;
        for (index, entry) in self.iter().enumerate() {
            if entry.len() > remaining {
                return Some(EntryOffset {
                    index,
                    entry,
                    offset: remaining,
                });
            }
            remaining -= entry.len();
        }
        None
    }

    /// Translate a seek request into an absolute character offset.
    ///
    /// Valid offsets within an entry are `0..len`.
    pub fn offset_for(&self, seek: SeekTo) -> Result<usize, HistoryError> {
        let index = seek.index();
        let offset = seek.offset();

        let entry = self.get(index).ok_or(HistoryError::IndexOutOfRange {
            index,
            live: self.len(),
        })?;
        if offset >= entry.len() {
            return Err(HistoryError::OffsetOutOfRange {
                index,
                offset,
                len: entry.len(),
            });
        }

        let preceding: usize = self.iter().take(index).map(Entry::len).sum();
        Ok(preceding + offset)
    }

    /// Live entries as byte slices, oldest first
    pub fn playback(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.iter().map(Entry::as_bytes)
    }

    /// Concatenation of every live entry
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len());
        for chunk in self.playback() {
            out.extend_from_slice(chunk);
        }
        out
    }
}

impl Default for CircularBuffer {
    fn default() -> Self {
        Self::new(NonZeroUsize::MIN.saturating_add(DEFAULT_CAPACITY - 1))
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
