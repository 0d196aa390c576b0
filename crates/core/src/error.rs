// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for history addressing

use thiserror::Error;

/// Errors from translating a seek request against the live history
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("write command {index} out of range ({live} live entries)")]
    IndexOutOfRange { index: usize, live: usize },

    #[error("offset {offset} out of range for write command {index} (length {len})")]
    OffsetOutOfRange {
        index: usize,
        offset: usize,
        len: usize,
    },
}
