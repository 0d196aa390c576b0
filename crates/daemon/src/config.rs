// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `RINGLOG_*` environment variables. Command-line flags are applied by the
//! binary on top, after which [`Config::validate`] must be called.

use std::fmt;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ringlog_core::DEFAULT_CAPACITY;
use serde::Deserialize;
use thiserror::Error;

use crate::protocol::{DEFAULT_CHUNK_SIZE, DEFAULT_PORT};
use crate::server::ServerSettings;

pub const PID_FILE_NAME: &str = "ringlogd.pid";
pub const LOG_FILE_NAME: &str = "ringlogd.log";
pub const DATA_FILE_NAME: &str = "ringlog.data";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },

    #[error("Could not determine state directory (set RINGLOG_STATE_DIR or HOME)")]
    NoStateDir,

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Where history entries are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    File,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::File => f.write_str("file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listen address
    pub bind: SocketAddr,
    /// Listen backlog
    pub backlog: u32,
    /// Maximum number of live entries
    pub capacity: usize,
    pub backend: BackendKind,
    /// Directory for the pid file and default log/data locations.
    /// Empty until resolved by [`Config::load`].
    pub state_dir: PathBuf,
    /// File backend location (defaults to `<state_dir>/ringlog.data`)
    pub data_path: Option<PathBuf>,
    /// Log destination (defaults to `<state_dir>/ringlogd.log` when detached)
    pub log_file: Option<PathBuf>,
    /// Playback transfer chunk size in bytes
    pub chunk_size: usize,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub reap_interval: Duration,
    /// Period of the timestamp appender; disabled when unset
    #[serde(with = "humantime_serde::option")]
    pub timestamp_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            backlog: 20,
            capacity: DEFAULT_CAPACITY,
            backend: BackendKind::Memory,
            state_dir: PathBuf::new(),
            data_path: None,
            log_file: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            shutdown_timeout: Duration::from_secs(5),
            reap_interval: Duration::from_secs(1),
            timestamp_interval: None,
        }
    }
}

impl Config {
    /// Load defaults, the config file (explicit path or `$RINGLOG_CONFIG`)
    /// and environment overrides, and resolve the state directory.
    ///
    /// The result is not validated yet.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`Config::load`] with an explicit environment lookup
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env("RINGLOG_CONFIG").map(PathBuf::from));
        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(&env)?;
        config.resolve_state_dir(&env);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    fn apply_env<F>(&mut self, env: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = env("RINGLOG_BIND") {
            self.bind = parse_env("RINGLOG_BIND", value)?;
        }
        if let Some(value) = env("RINGLOG_CAPACITY") {
            self.capacity = parse_env("RINGLOG_CAPACITY", value)?;
        }
        if let Some(value) = env("RINGLOG_BACKEND") {
            self.backend = parse_env("RINGLOG_BACKEND", value)?;
        }
        if let Some(value) = env("RINGLOG_STATE_DIR") {
            self.state_dir = PathBuf::from(value);
        }
        Ok(())
    }

    /// Fill in the state directory from XDG or HOME when nothing set it.
    /// Left empty when neither is available; [`Config::validate`] reports it.
    fn resolve_state_dir<F>(&mut self, env: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.state_dir.as_os_str().is_empty() {
            return;
        }
        if let Some(xdg) = env("XDG_STATE_HOME") {
            self.state_dir = PathBuf::from(xdg).join("ringlog");
        } else if let Some(home) = env("HOME") {
            self.state_dir = PathBuf::from(home).join(".local/state/ringlog");
        }
    }

    /// Reject values the daemon cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be at least 1".into()));
        }
        if self.reap_interval.is_zero() {
            return Err(ConfigError::Invalid("reap_interval must be non-zero".into()));
        }
        if self.timestamp_interval.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::Invalid(
                "timestamp_interval must be non-zero".into(),
            ));
        }
        if self.state_dir.as_os_str().is_empty() {
            return Err(ConfigError::NoStateDir);
        }
        Ok(())
    }

    pub fn ring_capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.capacity)
            .ok_or_else(|| ConfigError::Invalid("capacity must be at least 1".into()))
    }

    pub fn pid_path(&self) -> PathBuf {
        self.state_dir.join(PID_FILE_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.state_dir.join(LOG_FILE_NAME))
    }

    pub fn data_path(&self) -> PathBuf {
        self.data_path
            .clone()
            .unwrap_or_else(|| self.state_dir.join(DATA_FILE_NAME))
    }

    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            chunk_size: self.chunk_size,
            reap_interval: self.reap_interval,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

fn parse_env<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { key, value })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
