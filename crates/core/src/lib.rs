// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ringlog-core: bounded history of write commands
//!
//! This crate provides:
//! - [`Entry`], one immutable write command
//! - [`CircularBuffer`], the fixed-capacity ring with offset translation
//! - [`SeekTo`], the (write command, offset) reposition request
//!
//! Nothing here locks or performs I/O. Callers own synchronization.

pub mod entry;
pub mod error;
pub mod ring;
pub mod seek;

pub use entry::Entry;
pub use error::HistoryError;
pub use ring::{CircularBuffer, EntryOffset, DEFAULT_CAPACITY};
pub use seek::SeekTo;
