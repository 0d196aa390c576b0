// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ringlog daemon: TCP line protocol over a bounded shared history

pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod server;
pub mod session;
pub mod timestamp;

pub use config::{BackendKind, Config, ConfigError};
pub use lifecycle::{read_pid, startup, Daemon, LifecycleError};
pub use server::{Server, ServerError, ServerReport, ServerSettings, SessionRegistry};
pub use session::{Session, SessionError, SessionId, SessionOutcome};

/// Startup marker prefix written to log before anything else.
/// The CLI uses this to find where the current startup attempt begins.
/// Full format: "--- ringlogd: starting (pid: 12345)"
pub const STARTUP_MARKER_PREFIX: &str = "--- ringlogd: starting (pid: ";

/// Line printed on stdout once the listener is bound
pub const READY_LINE: &str = "READY";
