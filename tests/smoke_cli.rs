//! Basic smoke tests for the `flatfield` binary.
//!
//! These run without hardware: config generation, the console with no port,
//! and the error path when no port is configured.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn flatfield(config_home: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_flatfield"));
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .env_remove("FLATFIELD_CONFIG")
        .env_remove("FLATFIELD_SERIAL_PORT")
        .env_remove("RUST_LOG")
        .current_dir(config_home);
    cmd
}

fn run_with_stdin(cmd: &mut Command, input: &[u8]) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start binary");
    child
        .stdin
        .take()
        .expect("stdin available")
        .write_all(input)
        .expect("write to stdin");
    child.wait_with_output().expect("binary exits")
}

#[test]
fn init_config_writes_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flatfield.toml");

    let output = flatfield(dir.path())
        .args(["init-config", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("[transport]"));
    assert!(written.contains("max_attempts = 3"));

    // Refuses to overwrite without --force.
    let again = flatfield(dir.path())
        .args(["init-config", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!again.status.success());
}

#[test]
fn device_command_without_port_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let output = flatfield(dir.path()).arg("park").output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no serial port"), "stderr: {stderr}");
}

#[test]
fn console_without_port_answers_help_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = flatfield(dir.path());
    cmd.arg("console");
    let output = run_with_stdin(&mut cmd, b"help\npark\nquit\n");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("commands:"), "stdout: {stdout}");
    assert!(stdout.contains("error NotConnected"), "stdout: {stdout}");
}

#[test]
fn brightness_out_of_u16_range_is_rejected_by_parser() {
    let dir = tempfile::tempdir().unwrap();
    let output = flatfield(dir.path())
        .args(["--port", "/dev/null", "brightness", "70000"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
