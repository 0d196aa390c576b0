// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ringlog daemon (ringlogd)
//!
//! Serves the bounded line history over TCP until SIGTERM or SIGINT.

use std::io::{BufRead, BufReader, Write};
use std::net::SocketAddr;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use clap::Parser;
use ringlog_daemon::{
    lifecycle, BackendKind, Config, ConfigError, LifecycleError, READY_LINE,
    STARTUP_MARKER_PREFIX,
};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ringlogd", version, about = "Bounded line history server")]
struct Args {
    /// Detach and run in the background
    #[arg(short = 'd', long = "daemon")]
    daemon: bool,

    /// Config file (defaults to $RINGLOG_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    bind: Option<SocketAddr>,

    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Maximum number of stored entries
    #[arg(long)]
    capacity: Option<usize>,

    #[arg(long, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    /// Set on the re-executed background child
    #[arg(long, hide = true)]
    detached: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.daemon && !args.detached {
        return launch_background(&config);
    }

    let log_to_file = args.detached || config.log_file.is_some();
    if log_to_file {
        // Before tracing setup, so the CLI can find it
        write_startup_marker(&config)?;
    }
    let log_guard = setup_logging(&config, log_to_file)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve(&config, log_to_file));

    drop(log_guard);
    result.map_err(Into::into)
}

/// Layer command-line flags over file and environment configuration
fn load_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(capacity) = args.capacity {
        config.capacity = capacity;
    }
    if let Some(state_dir) = &args.state_dir {
        config.state_dir = state_dir.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn serve(config: &Config, log_to_file: bool) -> Result<(), LifecycleError> {
    info!(bind = %config.bind, backend = %config.backend, "Starting ringlogd");

    let shutdown = CancellationToken::new();
    let daemon = match lifecycle::startup(config, shutdown.clone()) {
        Ok(d) => d,
        Err(e) => {
            if log_to_file {
                // Write error synchronously (tracing is non-blocking and may not flush in time)
                write_startup_error(config, &e);
            }
            error!("Failed to start daemon: {}", e);
            return Err(e);
        }
    };

    spawn_signal_handler(shutdown)?;

    info!("Daemon ready, listening on {}", daemon.local_addr()?);

    // Signal ready for parent process (e.g., systemd, the -d launcher)
    println!("{READY_LINE}");

    let report = daemon.run().await?;
    info!(
        accepted = report.accepted,
        joined = report.joined,
        aborted = report.aborted,
        "Daemon stopped"
    );
    Ok(())
}

/// Translate SIGTERM and SIGINT into cancellation of `shutdown`
fn spawn_signal_handler(shutdown: CancellationToken) -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
        shutdown.cancel();
    });
    Ok(())
}

/// Re-run this binary detached from the terminal and wait until it is ready
fn launch_background(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let exe = std::env::current_exe()?;
    let args = std::env::args_os()
        .skip(1)
        .filter(|a| !matches!(a.to_str(), Some("-d" | "--daemon")));

    let mut child = Command::new(exe)
        .args(args)
        .arg("--detached")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()?;

    let stdout = child.stdout.take().ok_or("background daemon has no stdout")?;
    for line in BufReader::new(stdout).lines() {
        if line?.trim() == READY_LINE {
            println!("ringlogd started (pid: {})", child.id());
            return Ok(());
        }
    }

    let status = child.wait()?;
    Err(format!(
        "ringlogd exited during startup ({status}), see {}",
        config.log_path().display()
    )
    .into())
}

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    writeln!(file, "{}{})", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
/// This ensures the error is visible to the CLI even if the process exits quickly.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
    log_to_file: bool,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if !log_to_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    }

    let log_path = config.log_path();
    let (Some(dir), Some(file_name)) = (log_path.parent(), log_path.file_name()) else {
        return Err(LifecycleError::Config(ConfigError::Invalid(format!(
            "log file path has no file name: {}",
            log_path.display()
        ))));
    };
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}
