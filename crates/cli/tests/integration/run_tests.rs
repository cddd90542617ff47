//! Run command integration tests.

use predicates::prelude::*;

use super::common::{FAILING_BUILD_CONFIG, TestEnv, WORKING_CONFIG, tar_entries};

#[test]
fn run_linux_untagged() {
  let env = TestEnv::with_config(WORKING_CONFIG);

  env
    .distpipe_cmd("run")
    .args(["--os", "linux"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Created project-linux.tar.gz"))
    .stdout(predicate::str::contains("sh 1.0"));

  let entries = tar_entries(&env.join("project-linux.tar.gz"));
  assert!(entries.contains(&"package/config/app.toml".to_string()));
  assert!(entries.contains(&"package/project".to_string()));
}

#[test]
fn run_reads_os_and_tag_from_ci_environment() {
  let env = TestEnv::with_config(WORKING_CONFIG);

  env
    .distpipe_cmd("run")
    .env("TRAVIS_OS_NAME", "osx")
    .env("TRAVIS_TAG", "v1.2.0")
    .assert()
    .success();

  assert!(env.join("project-macos-v1.2.0.tar.gz").is_file());
}

#[test]
fn explicit_flags_win_over_environment() {
  let env = TestEnv::with_config(WORKING_CONFIG);

  env
    .distpipe_cmd("run")
    .args(["--os", "linux", "--tag", "v2.0.0"])
    .env("TRAVIS_OS_NAME", "osx")
    .env("TRAVIS_TAG", "v1.2.0")
    .assert()
    .success();

  assert!(env.join("project-linux-v2.0.0.tar.gz").is_file());
  assert!(!env.join("project-macos-v1.2.0.tar.gz").exists());
}

#[test]
fn run_json_report() {
  let env = TestEnv::with_config(WORKING_CONFIG);

  let output = env
    .distpipe_cmd("run")
    .args(["--os", "linux", "--output", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["artifact"]["file_name"], "project-linux.tar.gz");
  assert_eq!(report["artifact"]["format"], "targz");
  assert_eq!(report["artifact"]["sha256"].as_str().unwrap().len(), 64);
  assert_eq!(report["toolchain"]["sh"], "sh 1.0");
}

#[test]
fn failing_build_exits_20_without_staging() {
  let env = TestEnv::with_config(FAILING_BUILD_CONFIG);

  env
    .distpipe_cmd("run")
    .args(["--os", "linux"])
    .assert()
    .code(20)
    .stderr(predicate::str::contains("building stage failed"))
    .stderr(predicate::str::contains("could not compile"));

  assert!(!env.join("package").exists());
  assert!(!env.join("project-linux.tar.gz").exists());
}

#[test]
fn missing_tool_exits_10() {
  let env = TestEnv::with_config(
    r#"
[project]
name = "project"

[[toolchain]]
name = "yasm"
probe = ["distpipe-test-no-such-yasm", "--version"]
"#,
  );

  env
    .distpipe_cmd("run")
    .args(["--os", "linux"])
    .assert()
    .code(10)
    .stderr(predicate::str::contains("yasm"));
}

#[test]
fn build_timeout_exits_20() {
  let env = TestEnv::with_config(
    r#"
[project]
name = "project"

[build]
command = ["/bin/sh", "-c", "sleep 5"]

[[toolchain]]
name = "sh"
probe = ["/bin/sh", "-c", "echo sh 1.0"]
"#,
  );

  env
    .distpipe_cmd("run")
    .args(["--os", "linux", "--timeout", "300ms"])
    .assert()
    .code(20)
    .stderr(predicate::str::contains("timed out"));
}

#[test]
fn staging_path_occupied_exits_30() {
  let env = TestEnv::with_config(WORKING_CONFIG);
  env.write_file("package", "not a directory");

  env
    .distpipe_cmd("run")
    .args(["--os", "linux"])
    .assert()
    .code(30)
    .stderr(predicate::str::contains("not a directory"));

  assert!(!env.join("project-linux.tar.gz").exists());
}

#[test]
fn missing_config_dir_exits_40() {
  let env = TestEnv::with_config(WORKING_CONFIG);
  std::fs::remove_dir_all(env.join("config")).unwrap();

  env
    .distpipe_cmd("run")
    .args(["--os", "linux"])
    .assert()
    .code(40)
    .stderr(predicate::str::contains("package source is missing"));
}

#[test]
fn invalid_config_exits_1() {
  let env = TestEnv::with_config("[package]\nstaging_dir = \"../outside\"\n");

  env
    .distpipe_cmd("run")
    .args(["--os", "linux"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("package.staging_dir"));
}

#[test]
fn staging_dir_over_config_dir_exits_1_and_keeps_sources() {
  let env = TestEnv::with_config(&format!("{WORKING_CONFIG}\n[package]\nstaging_dir = \"config\"\n"));

  env
    .distpipe_cmd("run")
    .args(["--os", "linux"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("overlaps project.config_dir"));

  assert!(env.join("config/app.toml").is_file());
  assert!(!env.join("target").exists());
  assert!(!env.join("project-linux.tar.gz").exists());
}
