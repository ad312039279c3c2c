#[path = "common/mod.rs"]
mod common;

use std::{fs, os::unix::fs::PermissionsExt};

use assert_cmd::Command;
use common::{FakeSudo, FakeSystemctl, UNIT, Workspace};
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::tempdir;

#[test]
fn install_copies_enables_and_starts() {
    let temp = tempdir().expect("failed to create tempdir");
    let ws = Workspace::new(temp.path());

    ws.unitg(&[])
        .assert()
        .success()
        .stdout(contains("Service 'foo.service' installed, enabled and started."))
        .stdout(contains("sudo systemctl status foo.service"))
        .stdout(contains("sudo journalctl -u foo.service -f"));

    assert_eq!(fs::read_to_string(ws.installed()).unwrap(), UNIT);
    assert_eq!(
        ws.systemctl.mutations(),
        vec!["daemon-reload", "enable foo.service", "start foo.service"]
    );
    assert!(ws.systemctl.is_enabled("foo.service"));
    assert!(ws.systemctl.is_active("foo.service"));
}

#[test]
fn explicit_install_subcommand_matches_default() {
    let temp = tempdir().expect("failed to create tempdir");
    let ws = Workspace::new(temp.path());

    ws.unitg(&["install"]).assert().success();

    assert_eq!(fs::read_to_string(ws.installed()).unwrap(), UNIT);
    assert!(ws.systemctl.is_active("foo.service"));
}

#[test]
fn second_install_is_idempotent() {
    let temp = tempdir().expect("failed to create tempdir");
    let ws = Workspace::new(temp.path());

    ws.unitg(&[]).assert().success();
    ws.unitg(&[]).assert().success();

    assert_eq!(fs::read_to_string(ws.installed()).unwrap(), UNIT);
    let entries = fs::read_dir(&ws.dest_dir).unwrap().count();
    assert_eq!(entries, 1, "exactly one unit file should be installed");
    assert!(ws.systemctl.is_enabled("foo.service"));
    assert!(ws.systemctl.is_active("foo.service"));
}

#[test]
fn missing_source_fails_before_any_manager_call() {
    let temp = tempdir().expect("failed to create tempdir");
    let ws = Workspace::new(temp.path());
    fs::remove_file(&ws.source).unwrap();

    ws.unitg(&[])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(contains("Failed to copy"));

    assert!(ws.systemctl.calls().is_empty());
    assert!(!ws.installed().exists());
}

#[test]
fn invalid_unit_fails_at_enable_without_starting() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path();
    let ws = Workspace::with_systemctl(root, FakeSystemctl::failing_on(root, "enable"));

    ws.unitg(&[])
        .assert()
        .code(1)
        .stdout(contains("Useful commands").not())
        .stderr(contains("Failed to enable unit: Unit foo.service has a bad unit file setting."));

    assert_eq!(
        ws.systemctl.mutations(),
        vec!["daemon-reload", "enable foo.service"]
    );
    assert!(!ws.systemctl.is_active("foo.service"));
    // the copy is left in place; rerunning picks up from there
    assert!(ws.installed().exists());
}

#[test]
fn start_failure_is_surfaced_verbatim() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path();
    let ws = Workspace::with_systemctl(root, FakeSystemctl::failing_on(root, "start"));

    ws.unitg(&[])
        .assert()
        .code(1)
        .stderr(contains("Failed to start unit"));

    assert!(ws.systemctl.is_enabled("foo.service"));
    assert!(!ws.systemctl.is_active("foo.service"));
}

#[test]
fn missing_service_manager_exits_127() {
    let temp = tempdir().expect("failed to create tempdir");
    let ws = Workspace::new(temp.path());
    let missing = temp.path().join("no-such-systemctl");

    Command::new(assert_cmd::cargo::cargo_bin!("unitg"))
        .current_dir(&ws.root)
        .arg("--source")
        .arg(&ws.source)
        .arg("--dest-dir")
        .arg(&ws.dest_dir)
        .arg("--systemctl")
        .arg(&missing)
        .arg("--name")
        .arg("foo")
        .assert()
        .code(127)
        .stderr(contains("Failed to reload service manager"));
}

#[test]
fn status_reports_enabled_and_active_after_install() {
    let temp = tempdir().expect("failed to create tempdir");
    let ws = Workspace::new(temp.path());

    ws.unitg(&["status"])
        .assert()
        .success()
        .stdout(contains("disabled"))
        .stdout(contains("inactive"))
        .stdout(contains("missing"));

    ws.unitg(&[]).assert().success();

    let output = ws.unitg(&["status", "--json"]).output().unwrap();
    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["unit"], "foo.service");
    assert_eq!(status["installed"], true);
    assert_eq!(status["enabled"], "enabled");
    assert_eq!(status["active"], "active");
}

#[test]
fn install_from_config_file() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path();
    let systemctl = FakeSystemctl::new(root);
    let units = root.join("units");
    fs::create_dir_all(&units).unwrap();
    fs::write(units.join("bar.service"), UNIT).unwrap();
    let dest_dir = root.join("system");
    fs::create_dir_all(&dest_dir).unwrap();

    let config_path = root.join("unitg.yaml");
    fs::write(
        &config_path,
        format!(
            r#"
source_path: "units/bar.service"
destination_dir: "{}"
service_name: "bar"
systemctl: "{}"
escalation: none
"#,
            dest_dir.display(),
            systemctl.script.display()
        ),
    )
    .unwrap();

    Command::new(assert_cmd::cargo::cargo_bin!("unitg"))
        .current_dir(root)
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(contains("bar.service"));

    assert_eq!(fs::read_to_string(dest_dir.join("bar.service")).unwrap(), UNIT);
    assert!(systemctl.is_enabled("bar.service"));
    assert!(systemctl.is_active("bar.service"));
}

#[test]
fn sudo_install_reads_source_only_through_sudo() {
    let temp = tempdir().expect("failed to create tempdir");
    let ws = Workspace::new(temp.path());
    let sudo = FakeSudo::new(temp.path());

    // Readable by root alone.
    fs::set_permissions(&ws.source, fs::Permissions::from_mode(0o000)).unwrap();

    ws.unitg_sudo(&sudo, &[])
        .assert()
        .success()
        .stdout(contains("Service 'foo.service' installed, enabled and started."));

    assert_eq!(fs::read_to_string(ws.installed()).unwrap(), UNIT);

    let calls = sudo.calls();
    let copy = format!(
        "cp -- {} {}",
        ws.source.display(),
        ws.installed().display()
    );
    assert!(calls.contains(&copy), "missing `{copy}` in {calls:?}");
    if !nix::unistd::Uid::effective().is_root() {
        let read = format!("cat -- {}", ws.source.display());
        assert!(calls.contains(&read), "missing `{read}` in {calls:?}");
    }

    let systemctl = ws.systemctl.script.display().to_string();
    for verb in ["daemon-reload", "enable foo.service", "start foo.service"] {
        let escalated = format!("{systemctl} {verb}");
        assert!(calls.contains(&escalated), "missing `{escalated}` in {calls:?}");
    }
    assert_eq!(
        ws.systemctl.mutations(),
        vec!["daemon-reload", "enable foo.service", "start foo.service"]
    );
}
