//! External process execution.
//!
//! Every tool the pipeline touches (package managers, compilers, version probes) runs as an
//! opaque child process through a [`CommandRunner`]. Only the exit code and captured output
//! are consumed.

pub mod types;

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

pub use types::{CmdOutput, CommandSpec, EmptyCommandError, ExecEnv, ExecError, describe_exit};

/// Runs external commands on behalf of the pipeline stages.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
  /// Run `cmd` in `cwd` with the scoped environment `env` and wait for it to exit.
  async fn run(&self, cmd: &CommandSpec, cwd: &Path, env: &ExecEnv) -> Result<CmdOutput, ExecError>;
}

/// Runs commands as real child processes, optionally bounded by a timeout.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
  timeout: Option<Duration>,
}

impl ProcessRunner {
  pub fn new(timeout: Option<Duration>) -> Self {
    Self { timeout }
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.timeout
  }
}

impl CommandRunner for ProcessRunner {
  async fn run(&self, cmd: &CommandSpec, cwd: &Path, env: &ExecEnv) -> Result<CmdOutput, ExecError> {
    info!(cmd = %cmd, "executing command");

    let mut command = Command::new(cmd.program());
    command
      .args(cmd.get_args())
      .current_dir(cwd)
      .stdin(Stdio::null())
      // Dropping the output future (on timeout) must not leave the child running
      .kill_on_drop(true);
    env.apply(&mut command)?;

    debug!(cwd = ?cwd, path_prefix = ?env.path_prefix(), "spawning process");

    let pending = command.output();
    let result = match self.timeout {
      Some(limit) => match tokio::time::timeout(limit, pending).await {
        Ok(result) => result,
        Err(_) => {
          return Err(ExecError::Timeout {
            cmd: cmd.to_string(),
            timeout: limit,
          });
        }
      },
      None => pending.await,
    };

    let output = result.map_err(|e| spawn_error(cmd, e))?;

    let out = CmdOutput {
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !out.stdout.trim().is_empty() {
      debug!(stdout = %out.stdout.trim_end(), "command stdout");
    }
    if !out.stderr.trim().is_empty() {
      debug!(stderr = %out.stderr.trim_end(), "command stderr");
    }
    debug!(cmd = %cmd, code = ?out.code, "command exited");

    Ok(out)
  }
}

fn spawn_error(cmd: &CommandSpec, err: io::Error) -> ExecError {
  if err.kind() == io::ErrorKind::NotFound {
    ExecError::NotFound {
      program: cmd.program().to_string(),
    }
  } else {
    ExecError::Spawn {
      program: cmd.program().to_string(),
      source: err,
    }
  }
}
