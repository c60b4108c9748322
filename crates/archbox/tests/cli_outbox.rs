#![cfg(all(unix, feature = "cli"))]

use std::os::unix::net::UnixListener;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() >= timeout {
            panic!("socket {} never appeared", path.display());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn send_delivers_to_listen() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("listen.sock");
    let address = format!("unix:{}", sock.display());

    let listen = Command::new(env!("CARGO_BIN_EXE_archbox"))
        .args(["--log-level", "off", "--format", "json", "listen", &address])
        .args(["--layout", "int,string", "--count", "1"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should start");
    wait_for_socket(&sock, Duration::from_secs(3));

    let send = Command::new(env!("CARGO_BIN_EXE_archbox"))
        .args(["--log-level", "off", "--format", "json", "send", &address])
        .args(["-f", "int=42", "-f", "string=hello", "--timeout", "3s"])
        .output()
        .expect("send should run");
    assert!(send.status.success(), "send failed: {send:?}");
    let report: serde_json::Value = serde_json::from_slice(&send.stdout).unwrap();
    assert_eq!(report["queued"], 1);
    assert_eq!(report["sent"], 1);
    assert_eq!(report["abandoned"], 0);

    let output = listen.wait_with_output().expect("listen should exit");
    assert!(output.status.success());
    let received: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(received["frame_len"], 11);
    assert_eq!(received["fields"][0]["value"], "42");
    assert_eq!(received["fields"][1]["value"], "hello");
}

#[test]
fn send_to_missing_socket_fails_with_transport_code() {
    let dir = tempfile::tempdir().unwrap();
    let address = format!("unix:{}", dir.path().join("absent.sock").display());
    let output = Command::new(env!("CARGO_BIN_EXE_archbox"))
        .args(["--log-level", "off", "send", &address, "-f", "int=1"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn probe_counts_live_checks() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("probe.sock");
    let listener = UnixListener::bind(&sock).unwrap();
    let address = format!("unix:{}", sock.display());

    let probe = Command::new(env!("CARGO_BIN_EXE_archbox"))
        .args(["--log-level", "off", "--format", "raw", "probe", &address])
        .args(["--interval", "50ms", "--count", "2"])
        .stdout(Stdio::piped())
        .spawn()
        .expect("probe should start");
    let (_held, _) = listener.accept().unwrap();

    let output = probe.wait_with_output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().filter(|line| *line == "true").count(), 4);
}

#[test]
fn probe_exits_when_peer_hangs_up() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("gone.sock");
    let listener = UnixListener::bind(&sock).unwrap();
    let address = format!("unix:{}", sock.display());

    let probe = Command::new(env!("CARGO_BIN_EXE_archbox"))
        .args(["--log-level", "off", "--format", "json", "probe", &address])
        .args(["--interval", "50ms"])
        .stdout(Stdio::piped())
        .spawn()
        .expect("probe should start");
    let (conn, _) = listener.accept().unwrap();
    drop(conn);

    let output = probe.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(30));
    let last = String::from_utf8_lossy(&output.stdout)
        .lines()
        .last()
        .map(str::to_string)
        .unwrap();
    let record: serde_json::Value = serde_json::from_str(&last).unwrap();
    assert_eq!(record["alive"], false);
}
