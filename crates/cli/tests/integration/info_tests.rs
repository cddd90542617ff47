//! Info command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

const CUSTOM_ENV_CONFIG: &str = r#"
[env]
os_vars = ["DISTPIPE_CI_OS"]
tag_vars = ["DISTPIPE_CI_TAG"]
"#;

#[test]
fn info_lists_configured_variables() {
  let env = TestEnv::with_config(CUSTOM_ENV_CONFIG);

  env
    .distpipe_cmd("info")
    .env("DISTPIPE_CI_TAG", "v3.1.4")
    .assert()
    .success()
    .stdout(predicate::str::contains("DISTPIPE_CI_OS"))
    .stdout(predicate::str::contains("v3.1.4"))
    .stdout(predicate::str::contains("TRAVIS_OS_NAME").not());
}

#[test]
fn info_json_uses_configured_variables() {
  let env = TestEnv::with_config(CUSTOM_ENV_CONFIG);

  let output = env
    .distpipe_cmd("info")
    .args(["--output", "json"])
    .env("DISTPIPE_CI_OS", "osx")
    .output()
    .unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let environment = json["environment"].as_object().unwrap();
  assert_eq!(environment["DISTPIPE_CI_OS"], "osx");
  assert!(environment["DISTPIPE_CI_TAG"].is_null());
  assert!(!environment.contains_key("TRAVIS_TAG"));
}

#[test]
fn info_without_config_shows_default_variables() {
  let env = TestEnv::with_config("");

  env
    .distpipe_cmd("info")
    .assert()
    .success()
    .stdout(predicate::str::contains("TRAVIS_OS_NAME"))
    .stdout(predicate::str::contains("RUNNER_OS"))
    .stdout(predicate::str::contains("TRAVIS_TAG"));
}
