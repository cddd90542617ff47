//! Plan command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, WORKING_CONFIG};

#[test]
fn plan_shows_archive_without_running_anything() {
  let env = TestEnv::with_config(WORKING_CONFIG);

  env
    .distpipe_cmd("plan")
    .args(["--os", "linux"])
    .assert()
    .success()
    .stdout(predicate::str::contains("project-linux.tar.gz"))
    .stdout(predicate::str::contains("/bin/sh -c"));

  assert!(!env.join("target").exists());
  assert!(!env.join("package").exists());
}

#[test]
fn windows_plan_uses_default_toolchain() {
  let env = TestEnv::with_config("[project]\nname = \"project\"\n");

  env
    .distpipe_cmd("plan")
    .args(["--os", "windows", "--tag", "v1.2.0"])
    .assert()
    .success()
    .stdout(predicate::str::contains("project-windows-v1.2.0.zip"))
    .stdout(predicate::str::contains("project.exe"))
    .stdout(predicate::str::contains("yasm"))
    .stdout(predicate::str::contains("cargo build --release"));
}

#[test]
fn plan_json_is_machine_readable() {
  let env = TestEnv::with_config(WORKING_CONFIG);

  let output = env
    .distpipe_cmd("plan")
    .args(["--os", "linux", "--timeout", "45m", "--output", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(plan["archive"]["format"], "targz");
  assert_eq!(plan["timeout"], "45m");
  assert_eq!(plan["requirements"][0]["name"], "sh");
}

#[test]
fn project_name_defaults_to_cargo_package() {
  let env = TestEnv::with_config("");
  env.write_file("Cargo.toml", "[package]\nname = \"muta-chain\"\nversion = \"0.1.0\"\n");

  env
    .distpipe_cmd("plan")
    .args(["--os", "linux", "--tag", "v0.1.0"])
    .assert()
    .success()
    .stdout(predicate::str::contains("muta-chain-linux-v0.1.0.tar.gz"));
}
