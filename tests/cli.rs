use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

fn vmctl() -> assert_cmd::Command {
    cargo_bin_cmd!("vmctl").into()
}

/// Write a config rooted in `dir` whose control binary is `control`.
fn write_test_config(dir: &tempfile::TempDir, control: &str) -> PathBuf {
    let root = dir.path().join("vms");
    fs::create_dir_all(&root).unwrap();
    let config_path = dir.path().join("vmctl.toml");
    let mut f = fs::File::create(&config_path).unwrap();
    write!(
        f,
        r#"
vm_root = "{}"
control_binary = "{control}"
lease_file = "{}"
"#,
        root.display(),
        dir.path().join("dhcpd.leases").display()
    )
    .unwrap();
    config_path
}

fn make_bundle(dir: &tempfile::TempDir, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let bundle = dir.path().join("vms").join(format!("{name}.vmwarevm"));
    fs::create_dir_all(&bundle).unwrap();
    for (file, contents) in files {
        fs::write(bundle.join(file), contents).unwrap();
    }
    bundle
}

fn config_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn help_works() {
    vmctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Manage desktop VM bundles"));
}

#[test]
fn missing_config_shows_error() {
    vmctl()
        .args(["--config", "/nonexistent/vmctl.toml", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn list_prints_sorted_bundle_names() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_test_config(&dir, "true");
    make_bundle(&dir, "zulu", &[("zulu.vmx", "")]);
    make_bundle(&dir, "alpha", &[("alpha.vmx", "")]);

    vmctl()
        .args(["--config", config_arg(&config_path), "list"])
        .assert()
        .success()
        .stdout("alpha\nzulu\n");
}

#[test]
fn status_reports_each_vm() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_test_config(&dir, "true");
    make_bundle(&dir, "off", &[("off.vmx", "")]);
    make_bundle(&dir, "napping", &[("napping.vmx", ""), ("napping.vmss", "")]);

    vmctl()
        .args(["--config", config_arg(&config_path), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VM 'off': not running"))
        .stdout(predicate::str::contains("VM 'napping': suspended"));
}

#[test]
fn status_json() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_test_config(&dir, "true");
    make_bundle(&dir, "off", &[("off.vmx", "")]);

    vmctl()
        .args(["--config", config_arg(&config_path), "status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["))
        .stdout(predicate::str::contains("\"off\""))
        .stdout(predicate::str::contains("\"not running\""));
}

#[test]
fn control_failure_exit_code_passes_through() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("fake-vmrun");
    fs::write(&script, "#!/bin/sh\necho \"Error: cannot connect to host\"\nexit 3\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    let config_path = write_test_config(&dir, script.to_str().unwrap());
    make_bundle(&dir, "off", &[("off.vmx", "")]);

    vmctl()
        .args(["--config", config_arg(&config_path), "status"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("cannot connect to host"));
}

#[test]
fn start_unknown_vm_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_test_config(&dir, "true");

    vmctl()
        .args(["--config", config_arg(&config_path), "start", "ghost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn start_runs_control_command() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_test_config(&dir, "true");
    make_bundle(&dir, "dev", &[("dev.vmx", "")]);

    vmctl()
        .args(["--config", config_arg(&config_path), "start", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VM 'dev': started"));
}

#[test]
fn clone_creates_renamed_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_test_config(&dir, "true");
    make_bundle(
        &dir,
        "foo",
        &[
            ("foo.vmx", "displayName = \"foo\"\nscsi0:0.fileName = \"foo.vmdk\"\n"),
            ("foo.vmdk", "# Disk DescriptorFile\nRW 100 SPARSE \"foo-s001.vmdk\"\n"),
            ("foo-s001.vmdk", "KDMV\0\0\0"),
        ],
    );

    vmctl()
        .args(["--config", config_arg(&config_path), "clone", "foo", "bar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cloned 'foo' to 'bar'"));

    let target = dir.path().join("vms").join("bar.vmwarevm");
    assert!(target.join("bar-s001.vmdk").exists());
    let vmx = fs::read_to_string(target.join("bar.vmx")).unwrap();
    assert!(!vmx.contains("foo"));
}

#[test]
fn clone_refuses_existing_target() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_test_config(&dir, "true");
    make_bundle(&dir, "foo", &[("foo.vmx", "")]);
    make_bundle(&dir, "bar", &[("bar.vmx", "")]);

    vmctl()
        .args(["--config", config_arg(&config_path), "clone", "foo", "bar"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn ip_reports_lease() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_test_config(&dir, "true");
    make_bundle(
        &dir,
        "dev",
        &[("dev.vmx", "ethernet0.generatedAddress = \"00:0c:29:aa:bb:cc\"\n")],
    );
    fs::write(
        dir.path().join("dhcpd.leases"),
        "lease 172.16.10.130 {\n  starts 3 2023/01/01 00:00:00;\n  ends 4 2023/01/02 00:00:00;\n  hardware ethernet 00:0c:29:aa:bb:cc;\n}\n",
    )
    .unwrap();

    vmctl()
        .args(["--config", config_arg(&config_path), "ip", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MAC: 00:0c:29:aa:bb:cc"))
        .stdout(predicate::str::contains("IP: 172.16.10.130"))
        .stdout(predicate::str::contains("Lease expired"));
}

#[test]
fn start_gui_warns_when_gui_is_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_test_config(&dir, "true");
    fs::OpenOptions::new()
        .append(true)
        .open(&config_path)
        .unwrap()
        .write_all(b"gui_process = \"vmctl-no-such-gui-process\"\n")
        .unwrap();
    make_bundle(&dir, "dev", &[("dev.vmx", "")]);

    vmctl()
        .env_remove("RUST_LOG")
        .args(["--config", config_arg(&config_path), "start", "dev", "--gui"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VM 'dev': started"))
        .stderr(predicate::str::contains("hypervisor GUI is not running"));
}

#[test]
fn verbose_logs_config_path() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_test_config(&dir, "true");

    vmctl()
        .args(["--config", config_arg(&config_path), "--verbose", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("loaded config"))
        .stderr(predicate::str::contains("vmctl.toml"));
}
