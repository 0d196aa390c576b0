// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic wall-clock entries.

use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use ringlog_core::Entry;
use ringlog_storage::SharedHistory;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::session;

pub const TIMESTAMP_FORMAT: &str = "timestamp:%Y-%m-%d %H:%M:%S\n";

/// Render one timestamp entry
pub fn timestamp_line<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Append a local-time timestamp every `period` until `shutdown` is cancelled.
///
/// The first entry is written one full period after start.
pub fn spawn(
    history: SharedHistory,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = ticker.tick() => {
                    let line = timestamp_line(&Local::now());
                    match session::append_entry(&history, Entry::new(line)).await {
                        Ok(_) => debug!(len = history.len(), "appended timestamp"),
                        Err(e) => warn!(error = %e, "failed to append timestamp"),
                    }
                }
            }
        }

        debug!("timestamp appender stopped");
    })
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
