// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{FixedOffset, NaiveDate, Utc};
use std::num::NonZeroUsize;

#[test]
fn line_format() {
    let at = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(7, 5, 1)
        .unwrap()
        .and_utc();

    assert_eq!(timestamp_line(&at), "timestamp:2024-03-09 07:05:01\n");
}

#[test]
fn line_uses_the_given_zone() {
    let utc = Utc.with_ymd_and_hms(2024, 12, 31, 23, 30, 0).unwrap();
    let plus_two = utc.with_timezone(&FixedOffset::east_opt(2 * 3600).unwrap());

    assert_eq!(timestamp_line(&plus_two), "timestamp:2025-01-01 01:30:00\n");
}

#[tokio::test]
async fn appends_each_period_until_cancelled() {
    let history = SharedHistory::in_memory(NonZeroUsize::new(100).unwrap());
    let shutdown = CancellationToken::new();
    let task = spawn(history.clone(), Duration::from_millis(40), shutdown.clone());

    assert!(history.is_empty());
    tokio::time::sleep(Duration::from_millis(250)).await;

    shutdown.cancel();
    task.await.unwrap();
    let appended = history.len();
    assert!(appended >= 2, "only {appended} timestamps");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(history.len(), appended);

    let snapshot = String::from_utf8(history.snapshot().unwrap()).unwrap();
    for line in snapshot.lines() {
        assert!(line.starts_with("timestamp:"), "unexpected line {line:?}");
        assert_eq!(line.len(), "timestamp:2024-01-01 00:00:00".len());
    }
}

#[tokio::test]
async fn cancelled_before_first_tick_appends_nothing() {
    let history = SharedHistory::in_memory(NonZeroUsize::new(10).unwrap());
    let shutdown = CancellationToken::new();
    let task = spawn(history.clone(), Duration::from_secs(1), shutdown.clone());

    shutdown.cancel();
    task.await.unwrap();

    assert!(history.is_empty());
}
