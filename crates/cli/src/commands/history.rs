// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commands that talk to a running server

use std::io::Write;
use std::net::SocketAddr;

use anyhow::Result;
use ringlog_core::SeekTo;

use crate::client;

#[derive(clap::Args)]
pub struct SendArgs {
    /// Line to append (a trailing newline is added)
    pub text: String,
}

#[derive(clap::Args)]
pub struct SeekArgs {
    /// Index of the entry, oldest live entry is 0
    pub index: u32,
    /// Byte offset within that entry
    pub offset: u32,
}

/// Append a line and write the returned history to stdout as-is
pub async fn send(addr: SocketAddr, args: SendArgs) -> Result<()> {
    let playback = client::send_line(addr, &args.text).await?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&playback)?;
    stdout.flush()?;
    Ok(())
}

pub async fn seek(addr: SocketAddr, args: SeekArgs) -> Result<()> {
    client::seek(addr, SeekTo::new(args.index, args.offset)).await?;
    Ok(())
}
