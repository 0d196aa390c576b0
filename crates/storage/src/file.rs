// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History mirrored to a data file
//!
//! Entries are indexed in memory and every live byte is also written to the
//! data file, synced before the append returns. Reads are served from the
//! file. An eviction rewrites the file from the remaining entries so its
//! contents always equal the current playback. A failed write leaves the
//! ring untouched.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::num::NonZeroUsize;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use ringlog_core::{CircularBuffer, Entry, HistoryError, SeekTo};
use tracing::{debug, warn};

use crate::backend::{locate, HistoryBackend, Position};
use crate::StoreError;

/// File-mirrored history
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: File,
    ring: CircularBuffer,
    // Set when a failed write could not be rolled back on disk
    stale: bool,
    removed: bool,
}

impl FileBackend {
    /// Create the data file at `path`, truncating anything already there
    pub fn create(path: &Path, capacity: NonZeroUsize) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            ring: CircularBuffer::new(capacity),
            stale: false,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Put the data file back in line with the ring after a failed write
    fn restore(&mut self) {
        match rewrite(&mut self.file, self.ring.playback()) {
            Ok(()) => self.stale = false,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "data file out of sync, serving reads from memory"
                );
                self.stale = true;
            }
        }
    }
}

/// Replace the file contents with `chunks`, then sync
fn rewrite<'a>(file: &mut File, chunks: impl IntoIterator<Item = &'a [u8]>) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    for chunk in chunks {
        file.write_all(chunk)?;
    }
    file.sync_data()
}

fn append_synced(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::End(0))?;
    file.write_all(bytes)?;
    file.sync_data()
}

impl HistoryBackend for FileBackend {
    /// The file is written and synced first; the ring only changes once
    /// that succeeded.
    fn append(&mut self, entry: Entry) -> Result<Option<Entry>, StoreError> {
        let len = entry.len();

        let written = if self.ring.is_full() || self.stale {
            debug!(path = %self.path.display(), "rewriting data file");
            let skip = usize::from(self.ring.is_full());
            let live = self.ring.iter().skip(skip).map(Entry::as_bytes);
            rewrite(&mut self.file, live.chain(std::iter::once(entry.as_bytes())))
        } else {
            append_synced(&mut self.file, entry.as_bytes())
        };
        if let Err(e) = written {
            self.restore();
            return Err(e.into());
        }
        self.stale = false;

        let evicted = self.ring.add_entry(entry);
        debug!(len, live = self.ring.len(), "appended to data file");
        Ok(evicted)
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
        let n = (found.entry.len() - found.offset).min(buf.len());
        if self.stale {
            buf[..n].copy_from_slice(&found.entry.as_bytes()[found.offset..found.offset + n]);
            return Ok(n);
        }
        self.file.read_exact_at(&mut buf[..n], char_offset as u64)?;
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

    /// Remove the data file
    fn close(&mut self) -> Result<(), StoreError> {
        if self.removed {
            return Ok(());
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "data file already removed");
            }
            Err(e) => return Err(e.into()),
        }
        self.removed = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
