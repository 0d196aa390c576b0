// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ringlog - client for the ringlogd history server

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{daemon, history};
use ringlog_daemon::protocol::DEFAULT_PORT;

#[derive(Parser)]
#[command(
    name = "ringlog",
    version,
    about = "Append to and play back a ringlogd history"
)]
struct Cli {
    /// Server address (defaults to $RINGLOG_ADDR, then 127.0.0.1:9000)
    #[arg(long, global = true)]
    addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a line and print the full history
    Send(history::SendArgs),
    /// Reposition the server-side read cursor of a connection
    Seek(history::SeekArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Send(args) => history::send(server_addr(cli.addr)?, args).await,
        Commands::Seek(args) => history::seek(server_addr(cli.addr)?, args).await,
        Commands::Daemon(args) => daemon::daemon(args).await,
    }
}

fn server_addr(flag: Option<SocketAddr>) -> Result<SocketAddr> {
    if let Some(addr) = flag {
        return Ok(addr);
    }
    match std::env::var("RINGLOG_ADDR") {
        Ok(value) => value
            .parse()
            .with_context(|| format!("invalid RINGLOG_ADDR: {value}")),
        Err(_) => Ok(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))),
    }
}

/// Diagnostics go to stderr so stdout carries only command output
fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env("RINGLOG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
