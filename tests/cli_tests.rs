//! End-to-end tests of the `fleetkeeper` binary.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use support::Installation;

#[cfg(unix)]
use support::RunningProcess;

fn cmd(install: &Installation) -> Command {
    Command::from_std(install.command())
}

#[test]
fn test_missing_config_directory_exits_one() {
    let install = Installation::without_config_dir();
    cmd(&install)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config directory"))
        .stderr(predicate::str::contains("Startup aborted"))
        .stderr(predicate::str::contains("Exiting with non-zero exit code"));
}

#[test]
fn test_unknown_argument_is_warned_not_fatal() {
    let install = Installation::without_config_dir();
    cmd(&install)
        .arg("--definitely-not-a-flag")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "unrecognized command-line argument: --definitely-not-a-flag",
        ))
        .stderr(predicate::str::contains("config directory"));
}

#[test]
fn test_broken_settings_fall_back_to_defaults() {
    let install = Installation::without_config_dir();
    std::fs::write(
        install.path().join("fleetkeeper.toml"),
        "[lifecycle]\nworker_stop_allowance_ms = 0\nfatal_grace_ms = 0\n",
    )
    .unwrap();

    // Defaults carry a ten second fatal grace; the run still exits 1.
    cmd(&install)
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Ignoring settings file"));
}

#[cfg(unix)]
#[test]
fn test_sigterm_exits_zero() {
    let install = Installation::new();
    let process = RunningProcess::start(install.command());

    let (status, stderr) = process.terminate();
    assert_eq!(status.code(), Some(0), "stderr:\n{}", stderr.join("\n"));
    assert!(stderr.iter().any(|l| l.contains("Acquired instance lock")));
    assert!(stderr.iter().any(|l| l.contains("Shutdown signal received")));
    assert!(stderr.iter().any(|l| l.contains("Shutdown sequence completed")));
}

#[cfg(unix)]
#[test]
fn test_second_instance_is_refused() {
    let install = Installation::new();
    let first = RunningProcess::start(install.command());

    cmd(&install)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Instance lock held by another process"))
        .stderr(predicate::str::contains("another instance"));

    let (status, _) = first.terminate();
    assert_eq!(status.code(), Some(0));
}

#[cfg(unix)]
#[test]
fn test_network_groups_run_side_by_side() {
    let install = Installation::new();
    let mut alpha = install.command();
    alpha.arg("--network-group=alpha");
    let mut beta = install.command();
    beta.arg("--network-group=beta");

    let alpha = RunningProcess::start(alpha);
    let beta = RunningProcess::start(beta);

    assert_eq!(alpha.terminate().0.code(), Some(0));
    assert_eq!(beta.terminate().0.code(), Some(0));
}

#[cfg(unix)]
#[test]
fn test_instance_lock_released_after_shutdown() {
    let install = Installation::new();
    let first = RunningProcess::start(install.command());
    assert_eq!(first.terminate().0.code(), Some(0));

    let second = RunningProcess::start(install.command());
    assert_eq!(second.terminate().0.code(), Some(0));
}

#[cfg(unix)]
#[test]
fn test_unique_instance_writes_log_file() {
    let install = Installation::new();
    let process = RunningProcess::start(install.command());
    let (status, _) = process.terminate();
    assert_eq!(status.code(), Some(0));

    let log = std::fs::read_to_string(install.path().join("logs").join("fleetkeeper.log")).unwrap();
    assert!(log.contains("Started"));
    assert!(log.contains("Shutdown sequence started"));
}

#[cfg(unix)]
#[test]
fn test_ipc_listener_answers_until_shutdown() {
    use std::io::Read;
    use std::net::{SocketAddr, TcpStream};

    let install = Installation::new();
    install.append_settings("\n[ipc]\nenabled = true\nbind = \"127.0.0.1:0\"\n");

    let mut command = install.command();
    command.env("RUST_LOG", "info");
    let mut process = RunningProcess::start(command);
    let line = process.wait_for_line("IPC listener started");
    let addr: SocketAddr = line
        .split("addr=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap()
        .parse()
        .unwrap();

    let mut banner = String::new();
    TcpStream::connect(addr)
        .unwrap()
        .read_to_string(&mut banner)
        .unwrap();
    assert!(banner.starts_with("fleetkeeper "));

    let (status, _) = process.terminate();
    assert_eq!(status.code(), Some(0));
    assert!(TcpStream::connect(addr).is_err());
}
