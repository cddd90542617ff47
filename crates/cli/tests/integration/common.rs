//! Shared test helpers for CLI integration tests.

use std::fs::File;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use flate2::read::GzDecoder;
use tempfile::TempDir;

/// Configuration whose build writes `target/release/project` and whose only tool is `sh`.
pub const WORKING_CONFIG: &str = r#"
[project]
name = "project"

[build]
command = ["/bin/sh", "-c", "mkdir -p target/release && echo binary > target/release/project"]

[[toolchain]]
name = "sh"
probe = ["/bin/sh", "-c", "echo sh 1.0"]
"#;

/// Same as [`WORKING_CONFIG`] but the build exits 1.
pub const FAILING_BUILD_CONFIG: &str = r#"
[project]
name = "project"

[build]
command = ["/bin/sh", "-c", "echo 'error: could not compile' >&2; exit 1"]

[[toolchain]]
name = "sh"
probe = ["/bin/sh", "-c", "echo sh 1.0"]
"#;

/// Isolated project directory.
///
/// Each test gets its own temporary directory with a `config/` tree and a `distpipe.toml`.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn with_config(config: &str) -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    env.write_file("distpipe.toml", config);
    env.write_file("config/app.toml", "port = 8000\n");
    env
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn join(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// A distpipe `subcommand` rooted at this project, with CI variables cleared.
  pub fn distpipe_cmd(&self, subcommand: &str) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("distpipe");
    for var in ["TRAVIS_OS_NAME", "RUNNER_OS", "TRAVIS_TAG", "RUST_LOG"] {
      cmd.env_remove(var);
    }
    cmd.arg(subcommand).arg("--workdir").arg(self.path());
    cmd
  }
}

/// Entry names of a tar.gz archive, without trailing slashes.
pub fn tar_entries(path: &Path) -> Vec<String> {
  let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
  archive
    .entries()
    .unwrap()
    .map(|e| e.unwrap().path().unwrap().to_string_lossy().trim_end_matches('/').to_string())
    .collect()
}
