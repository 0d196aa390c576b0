// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared history guarded by a single lock
//!
//! Every backing store call happens inside one critical section. The lock is
//! never held across network I/O: callers copy what they need and release.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use ringlog_core::{Entry, HistoryError, SeekTo};
use tracing::debug;

use crate::backend::{HistoryBackend, MemoryBackend, Position};
use crate::handle::HistoryHandle;
use crate::StoreError;

/// Cloneable handle to the one history shared by every session
#[derive(Clone)]
pub struct SharedHistory {
    inner: Arc<Mutex<Box<dyn HistoryBackend>>>,
}

impl SharedHistory {
    pub fn new(backend: impl HistoryBackend + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(backend))),
        }
    }

    pub fn in_memory(capacity: NonZeroUsize) -> Self {
        Self::new(MemoryBackend::new(capacity))
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn HistoryBackend>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an entry, handing any evicted entry back to the caller
    pub fn append(&self, entry: Entry) -> Result<Option<Entry>, StoreError> {
        let len = entry.len();
        let evicted = self.lock().append(entry)?;
        debug!(
            len,
            evicted_len = evicted.as_ref().map(Entry::len),
            "history append"
        );
        Ok(evicted)
    }

    /// Translate a global character offset
    pub fn locate(&self, char_offset: usize) -> Option<Position> {
        self.lock().locate(char_offset)
    }

    /// Translate a (write command, offset) request to an absolute offset
    pub fn offset_for(&self, seek: SeekTo) -> Result<usize, HistoryError> {
        self.lock().offset_for(seek)
    }

    /// Read from `char_offset` to the end of its entry, at most `buf.len()` bytes
    pub fn read_at(&self, char_offset: usize, buf: &mut [u8]) -> Result<usize, StoreError> {
        self.lock().read_at(char_offset, buf)
    }

    /// Full playback taken under a single acquisition of the lock
    pub fn snapshot(&self) -> Result<Vec<u8>, StoreError> {
        let backend = self.lock();
        let mut out = vec![0; backend.total_len()];
        let mut filled = 0;
        while filled < out.len() {
            let n = backend.read_at(filled, &mut out[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        out.truncate(filled);
        Ok(out)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_len(&self) -> usize {
        self.lock().total_len()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Open a reader with its own position, starting at offset 0
    pub fn open(&self) -> HistoryHandle {
        HistoryHandle::new(self.clone())
    }

    /// Release the backing store
    pub fn close(&self) -> Result<(), StoreError> {
        self.lock().close()
    }
}

impl std::fmt::Debug for SharedHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedHistory").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
