// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single write command held in the history

use std::fmt;

/// How many bytes of an entry `Debug` shows before truncating
const DEBUG_PREVIEW: usize = 32;

/// One immutable, length-delimited byte sequence.
///
/// An entry is moved into the ring on append and moved back out when it is
/// evicted. It is never shared between owners.
#[derive(PartialEq, Eq)]
pub struct Entry {
    data: Box<[u8]>,
}

impl Entry {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into().into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes from `offset` to the end of the entry (empty if past the end)
    pub fn tail(&self, offset: usize) -> &[u8] {
        self.data.get(offset..).unwrap_or_default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data.into_vec()
    }
}

impl AsRef<[u8]> for Entry {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for Entry {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for Entry {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl From<&str> for Entry {
    fn from(data: &str) -> Self {
        Self::new(data.as_bytes().to_vec())
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = &self.data[..self.data.len().min(DEBUG_PREVIEW)];
        f.debug_struct("Entry")
            .field("len", &self.data.len())
            .field("data", &String::from_utf8_lossy(shown))
            .finish()
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
