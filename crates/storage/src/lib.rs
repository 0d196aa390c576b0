// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Backing stores for the bounded history and the lock that guards them

mod backend;
mod file;
mod handle;
mod history;

pub use backend::{HistoryBackend, MemoryBackend, Position};
pub use file::FileBackend;
pub use handle::{HistoryHandle, Playback};
pub use history::SharedHistory;

use thiserror::Error;

/// Errors that can occur in backing store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for std::io::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => e,
        }
    }
}
