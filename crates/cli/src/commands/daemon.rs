// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon management commands

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use ringlog_daemon::Config;

use crate::client;

#[derive(Args)]
pub struct DaemonArgs {
    /// State directory of the daemon (pid and log files)
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start ringlogd in the background
    Start,
    /// Stop a running ringlogd
    Stop,
    /// Show whether ringlogd is running
    Status,
}

pub async fn daemon(args: DaemonArgs) -> Result<()> {
    let mut config = Config::load(None)?;
    if let Some(dir) = &args.state_dir {
        config.state_dir = dir.clone();
    }
    config.validate()?;
    let pid_path = config.pid_path();

    match args.command {
        DaemonCommand::Start => {
            if let Some(pid) = running_pid(&config) {
                println!("ringlogd already running (pid: {})", pid);
                return Ok(());
            }
            let started = client::start_daemon(args.state_dir.as_deref(), &config.log_path())?;
            println!("{}", started);
        }
        DaemonCommand::Stop => {
            if client::daemon_stop(&pid_path).await {
                println!("ringlogd stopped");
            } else {
                println!("ringlogd not running");
            }
        }
        DaemonCommand::Status => match running_pid(&config) {
            Some(pid) => println!("ringlogd running (pid: {})", pid),
            None if pid_path.exists() => println!("ringlogd not running (stale pid file)"),
            None => println!("ringlogd not running"),
        },
    }

    Ok(())
}

fn running_pid(config: &Config) -> Option<u32> {
    ringlog_daemon::read_pid(&config.pid_path()).filter(|pid| client::process_exists(*pid))
}
