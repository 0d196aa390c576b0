// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-level tests for the ringlogd binary

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

const WAIT: Duration = Duration::from_secs(10);

fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

fn ringlogd(state_dir: &Path, addr: SocketAddr) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ringlogd"));
    cmd.arg("--bind")
        .arg(addr.to_string())
        .arg("--state-dir")
        .arg(state_dir)
        .env_remove("RINGLOG_CONFIG")
        .env_remove("RINGLOG_BIND")
        .env_remove("RINGLOG_CAPACITY")
        .env_remove("RINGLOG_BACKEND")
        .env_remove("RINGLOG_STATE_DIR")
        .env("RUST_LOG", "debug");
    cmd
}

/// Start a foreground daemon and wait for its READY line
fn start(state_dir: &Path, addr: SocketAddr, extra: &[&str]) -> Child {
    let mut child = ringlogd(state_dir, addr)
        .args(extra)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let stdout = child.stdout.take().unwrap();
    let mut line = String::new();
    BufReader::new(stdout).read_line(&mut line).unwrap();
    assert_eq!(line.trim(), "READY", "daemon did not report ready");
    child
}

fn send(addr: SocketAddr, message: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(WAIT)).unwrap();
    stream.write_all(message).unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    response
}

fn terminate(pid: u32) {
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).unwrap();
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn serves_history_and_stops_on_sigterm() {
    let dir = tempfile::tempdir().unwrap();
    let addr = free_addr();
    let mut daemon = start(dir.path(), addr, &["--capacity", "2"]);

    let pid_path = dir.path().join("ringlogd.pid");
    let pid = std::fs::read_to_string(&pid_path).unwrap();
    assert_eq!(pid.trim(), daemon.id().to_string());

    assert_eq!(send(addr, b"hello\n"), b"hello\n");
    assert_eq!(send(addr, b"world\n"), b"hello\nworld\n");
    assert_eq!(send(addr, b"again\n"), b"world\nagain\n");

    terminate(daemon.id());
    let status = daemon.wait().unwrap();

    assert!(status.success(), "exit status {status}");
    assert!(!pid_path.exists());
}

#[test]
fn sigint_also_stops() {
    let dir = tempfile::tempdir().unwrap();
    let addr = free_addr();
    let mut daemon = start(dir.path(), addr, &[]);

    kill(Pid::from_raw(daemon.id() as i32), Signal::SIGINT).unwrap();

    assert!(daemon.wait().unwrap().success());
}

#[test]
fn file_backend_data_is_removed_on_exit() {
    let dir = tempfile::tempdir().unwrap();
    let addr = free_addr();
    let mut daemon = start(dir.path(), addr, &["--backend", "file"]);

    send(addr, b"persisted\n");
    let data_path = dir.path().join("ringlog.data");
    assert_eq!(std::fs::read(&data_path).unwrap(), b"persisted\n");

    terminate(daemon.id());
    assert!(daemon.wait().unwrap().success());
    assert!(!data_path.exists());
}

#[test]
fn second_instance_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = start(dir.path(), free_addr(), &[]);

    let output = ringlogd(dir.path(), free_addr()).output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already running"), "stderr: {stderr}");

    terminate(first.id());
    assert!(first.wait().unwrap().success());
}

#[test]
fn zero_capacity_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let output = ringlogd(dir.path(), free_addr())
        .args(["--capacity", "0"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("capacity"), "stderr: {stderr}");
    assert!(!dir.path().join("ringlogd.pid").exists());
}

#[test]
fn background_mode_detaches_after_ready() {
    let dir = tempfile::tempdir().unwrap();
    let addr = free_addr();

    let output = ringlogd(dir.path(), addr).arg("-d").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let pid: u32 = stdout
        .trim()
        .strip_prefix("ringlogd started (pid: ")
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|pid| pid.parse().ok())
        .unwrap_or_else(|| panic!("unexpected output: {stdout}"));

    assert_eq!(send(addr, b"from the background\n"), b"from the background\n");

    let log = std::fs::read_to_string(dir.path().join("ringlogd.log")).unwrap();
    assert!(log.contains(&format!("--- ringlogd: starting (pid: {pid})")));

    terminate(pid);
    let pid_path = dir.path().join("ringlogd.pid");
    assert!(wait_for(|| !pid_path.exists()), "daemon did not stop");
}
