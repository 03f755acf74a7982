//! End-to-end tests against the built `heartbeat` binary.

use std::io::{BufRead, BufReader, Read};
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

fn heartbeat(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_heartbeat"));
    cmd.args(args)
        .env_remove("HEARTBEAT_MESSAGE")
        .env_remove("HEARTBEAT_VARIANT")
        .env_remove("HEARTBEAT_CONFIG")
        .env_remove("HEARTBEAT_PID_FILE")
        .env("RUST_LOG", "off")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

fn banner(pid: u32) -> String {
    format!("Started heartbeat with pid {}", pid)
}

/// Block until the banner line arrives, returning the reader positioned after it.
fn read_banner(child: &mut Child) -> BufReader<std::process::ChildStdout> {
    let stdout = child.stdout.take().expect("stdout piped");
    let mut reader = BufReader::new(stdout);
    let mut first = String::new();
    reader.read_line(&mut first).unwrap();
    assert_eq!(first.trim_end(), banner(child.id()));
    reader
}

fn send(child: &Child, signal: Signal) {
    kill(Pid::from_raw(child.id() as i32), signal).unwrap();
}

fn rest_of(mut reader: impl Read) -> String {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

#[test]
fn prints_message_with_pid_within_two_seconds() {
    let output = heartbeat(&["hello", "--variant", "listen", "--run-for", "2100ms"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    let pid = lines[0].rsplit(' ').next().unwrap();

    assert_eq!(lines[0], format!("Started heartbeat with pid {}", pid));
    assert!(lines.contains(&format!("{} hello", pid).as_str()), "{:?}", lines);
}

#[test]
fn missing_message_is_undefined() {
    let output = heartbeat(&["--variant", "listen", "--run-for", "2100ms"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l.ends_with(" undefined")), "{}", stdout);
}

#[test]
fn sigterm_exits_with_code_four() {
    let mut child = heartbeat(&["x", "--no-entropy-echo"])
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let reader = read_banner(&mut child);

    send(&child, Signal::SIGTERM);
    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(4));

    let rest = rest_of(reader);
    let last = rest.lines().last().unwrap();
    assert_eq!(last, format!("{} received SIGTERM", child.id()));
}

#[test]
fn sigusr1_is_acknowledged_and_ticks_continue() {
    let mut child = heartbeat(&["beat", "--variant", "listen", "--run-for", "2500ms"])
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let reader = read_banner(&mut child);

    send(&child, Signal::SIGUSR1);
    thread::sleep(Duration::from_millis(100));
    send(&child, Signal::SIGINT);

    let status = child.wait().unwrap();
    assert!(status.success(), "{:?}", status);

    let pid = child.id();
    let rest = rest_of(reader);
    let lines: Vec<&str> = rest.lines().collect();
    let ack = lines
        .iter()
        .position(|l| *l == format!("{} received SIGUSR1", pid))
        .unwrap();
    assert!(lines.contains(&format!("{} received SIGINT", pid).as_str()));
    assert!(lines[ack..].contains(&format!("{} beat", pid).as_str()));
}

#[test]
fn unhandled_sigterm_uses_default_disposition() {
    let mut child = heartbeat(&["x", "--variant", "listen"])
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let _reader = read_banner(&mut child);

    send(&child, Signal::SIGTERM);
    let status = child.wait().unwrap();
    assert_eq!(status.code(), None);
    assert_eq!(status.signal(), Some(Signal::SIGTERM as i32));
}

#[test]
fn quiet_variant_dies_on_sigint() {
    let mut child = heartbeat(&["--variant", "quiet"])
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let reader = read_banner(&mut child);

    send(&child, Signal::SIGINT);
    let status = child.wait().unwrap();
    assert_eq!(status.signal(), Some(Signal::SIGINT as i32));
    assert!(!rest_of(reader).contains("received"));
}

#[test]
fn quiet_variant_only_prints_banner() {
    let output = heartbeat(&["--variant", "quiet", "--run-for", "2500ms"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.starts_with("Started heartbeat with pid "));
    assert!(output.stderr.is_empty());
}

#[test]
#[cfg(target_os = "linux")]
fn entropy_echo_writes_exactly_one_hundred_bytes() {
    let output = heartbeat(&["--variant", "full", "--silent", "--run-for", "1500ms"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let newline = output.stdout.iter().position(|b| *b == b'\n').unwrap();
    assert!(output.stdout[..newline].starts_with(b"Started heartbeat with pid "));
    assert_eq!(output.stdout.len() - (newline + 1), 100);
}

#[test]
fn entropy_failure_exits_nonzero() {
    let output = heartbeat(&[
        "--variant",
        "listen",
        "--entropy-command",
        "false",
        "--run-for",
        "3s",
    ])
    .output()
    .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Entropy echo failed"));
}

#[test]
fn pid_file_is_written_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let pid_path = dir.path().join("heartbeat.pid");

    let mut child = heartbeat(&[
        "--variant",
        "full",
        "--no-entropy-echo",
        "--pid-file",
        pid_path.to_str().unwrap(),
    ])
    .stderr(Stdio::null())
    .spawn()
    .unwrap();
    let reader = read_banner(&mut child);

    let recorded = std::fs::read_to_string(&pid_path).unwrap();
    assert_eq!(recorded.trim(), child.id().to_string());

    send(&child, Signal::SIGTERM);
    assert_eq!(child.wait().unwrap().code(), Some(4));
    drop(reader);
    assert!(!pid_path.exists());
}

#[test]
fn rejects_unknown_variant() {
    let output = heartbeat(&["--variant", "loud"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown variant"));
}
