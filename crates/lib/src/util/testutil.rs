//! Test utilities for distpipe-lib.
//!
//! This module provides cross-platform shell helpers for tests that run real processes,
//! and a scripted [`CommandRunner`] for tests that must not (Windows provisioning on a
//! Linux host, failure injection).

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::exec::{CmdOutput, CommandRunner, CommandSpec, ExecEnv, ExecError};

/// Returns a command that runs `script` through the platform shell.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> CommandSpec {
  CommandSpec::new("/bin/sh").args(["-c", script])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> CommandSpec {
  CommandSpec::new("cmd.exe").args(["/C", script])
}

/// Returns a command that echoes an environment variable.
#[cfg(unix)]
pub fn shell_echo_env(var: &str) -> CommandSpec {
  shell_cmd(&format!("echo \"${}\"", var))
}

#[cfg(windows)]
pub fn shell_echo_env(var: &str) -> CommandSpec {
  shell_cmd(&format!("echo %{}%", var))
}

/// A successful exit with the given stdout.
pub fn ok(stdout: &str) -> CmdOutput {
  CmdOutput {
    code: Some(0),
    stdout: stdout.to_string(),
    stderr: String::new(),
  }
}

/// A failed exit with the given code and stderr.
pub fn exit(code: i32, stderr: &str) -> CmdOutput {
  CmdOutput {
    code: Some(code),
    stdout: String::new(),
    stderr: stderr.to_string(),
  }
}

pub fn not_found(cmd: &CommandSpec) -> ExecError {
  ExecError::NotFound {
    program: cmd.program().to_string(),
  }
}

/// A command observed by a [`ScriptedRunner`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
  pub command: CommandSpec,
  pub cwd: PathBuf,
  pub path_prefix: Vec<PathBuf>,
}

type Handler = Box<dyn FnMut(&CommandSpec, &Path) -> Result<CmdOutput, ExecError> + Send>;

/// Answers commands from a closure instead of spawning processes, recording every call.
pub struct ScriptedRunner {
  handler: Mutex<Handler>,
  calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRunner {
  pub fn new(handler: impl FnMut(&CommandSpec, &Path) -> Result<CmdOutput, ExecError> + Send + 'static) -> Self {
    Self {
      handler: Mutex::new(Box::new(handler)),
      calls: Mutex::new(Vec::new()),
    }
  }

  /// Every command succeeds and prints `<program> 1.0`.
  pub fn succeeding() -> Self {
    Self::new(|cmd, _| Ok(ok(&format!("{} 1.0", cmd.program()))))
  }

  pub fn calls(&self) -> Vec<RecordedCall> {
    self.calls.lock().unwrap().clone()
  }

  /// Number of calls whose rendered command line contains `needle`.
  pub fn count(&self, needle: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|c| c.command.to_string().contains(needle))
      .count()
  }

  pub fn ran(&self, needle: &str) -> bool {
    self.count(needle) > 0
  }
}

impl CommandRunner for ScriptedRunner {
  async fn run(&self, cmd: &CommandSpec, cwd: &Path, env: &ExecEnv) -> Result<CmdOutput, ExecError> {
    self.calls.lock().unwrap().push(RecordedCall {
      command: cmd.clone(),
      cwd: cwd.to_path_buf(),
      path_prefix: env.path_prefix().to_vec(),
    });
    let mut handler = self.handler.lock().unwrap();
    (*handler)(cmd, cwd)
  }
}
