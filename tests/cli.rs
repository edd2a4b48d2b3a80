mod common;

use assert_cmd::Command;
use common::ProjectFixture;
use predicates::prelude::*;
use serde_json::Value;

fn skp(fx: &ProjectFixture) -> Command {
    let mut cmd = Command::cargo_bin("skp").unwrap();
    cmd.env_remove("SKP_CONFIG")
        .env("SKP_INSTALL_ENABLED", "false")
        .env("NO_COLOR", "1")
        .arg("--project")
        .arg(fx.root());
    cmd
}

fn robot_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("skp").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("skp").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_init_then_apply_robot() {
    let fx = ProjectFixture::new();
    fx.write("src/index.ts", "a\n");

    let output = skp(&fx).args(["--robot", "-q", "init"]).output().unwrap();
    assert!(output.status.success());
    let json = robot_json(&output.stdout);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["data"]["core_version"], "1.0.0");

    let skill = fx.skill("foo", "1.0.0").add("x.txt", "x\n").build();
    let output = skp(&fx)
        .args(["--robot", "-q", "apply"])
        .arg(&skill)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = robot_json(&output.stdout);
    assert_eq!(json["data"]["success"], true);
    assert_eq!(json["data"]["skill"], "foo");
    assert_eq!(fx.read("x.txt"), "x\n");

    skp(&fx)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("foo@1.0.0"));
}

#[test]
fn test_init_twice_requires_force() {
    let fx = ProjectFixture::new();
    skp(&fx).args(["-q", "init"]).assert().success();
    skp(&fx)
        .args(["-q", "init"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already initialized"));
    skp(&fx).args(["-q", "init", "--force"]).assert().success();
}

#[test]
fn test_apply_before_init_fails() {
    let fx = ProjectFixture::new();
    let skill = fx.skill("foo", "1.0.0").add("x.txt", "x\n").build();

    let output = skp(&fx)
        .args(["--robot", "-q", "apply"])
        .arg(&skill)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json = robot_json(&output.stdout);
    assert_eq!(json["error"], true);
    assert_eq!(json["code"], "not_initialized");
}

#[test]
fn test_conflict_exit_code_and_abort() {
    let fx = ProjectFixture::new();
    fx.write("shared.txt", "1\n2\n3\n");
    skp(&fx).args(["-q", "init"]).assert().success();

    let one = fx.skill("one", "1.0.0").modify("shared.txt", "1\nONE\n3\n").build();
    skp(&fx).args(["-q", "apply"]).arg(&one).assert().success();
    fx.write("shared.txt", "1\nUSER\n3\n");

    let two = fx.skill("two", "1.0.0").modify("shared.txt", "1\nTWO\n3\n").build();
    let output = skp(&fx)
        .args(["--robot", "-q", "apply"])
        .arg(&two)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let json = robot_json(&output.stdout);
    assert_eq!(json["status"]["conflicts"]["paths"][0], "shared.txt");

    skp(&fx)
        .args(["-q", "resolve"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("shared.txt"));

    skp(&fx).args(["-q", "abort"]).assert().success();
    assert_eq!(fx.read("shared.txt"), "1\nUSER\n3\n");
}

#[test]
fn test_hash_matches_library() {
    let fx = ProjectFixture::new();
    fx.write("file.txt", "abc");

    skp(&fx)
        .args(["hash"])
        .arg(fx.layout.live("file.txt"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with(skp::utils::hash_bytes(b"abc")));
}
