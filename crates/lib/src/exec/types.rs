//! Types for external process execution.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while running an external process.
///
/// A non-zero exit is not an error at this level; callers inspect [`CmdOutput`].
#[derive(Debug, Error)]
pub enum ExecError {
  /// The program could not be found on the execution path.
  #[error("program not found: {program}")]
  NotFound { program: String },

  /// The process could not be started.
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  /// The process did not exit within the configured timeout and was killed.
  #[error("command timed out after {}: {cmd}", fmt_timeout(.timeout))]
  Timeout { cmd: String, timeout: Duration },

  /// The scoped execution path could not be joined into a PATH value.
  #[error("invalid execution path entry: {0}")]
  InvalidPath(#[from] env::JoinPathsError),
}

fn fmt_timeout(timeout: &Duration) -> String {
  humantime::format_duration(*timeout).to_string()
}

/// Human-readable exit status, for error messages.
pub fn describe_exit(code: Option<i32>) -> String {
  match code {
    Some(code) => format!("exit code {}", code),
    None => "no exit code (terminated by signal)".to_string(),
  }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("command must contain at least a program name")]
pub struct EmptyCommandError;

/// A program and its arguments, passed to the OS without a shell.
///
/// Serialized as an argv array, e.g. `["cargo", "build", "--release"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CommandSpec {
  program: String,
  args: Vec<String>,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  pub fn get_args(&self) -> &[String] {
    &self.args
  }

  /// Replace every occurrence of `placeholder` in the program and arguments.
  pub fn substitute(&self, placeholder: &str, value: &str) -> Self {
    Self {
      program: self.program.replace(placeholder, value),
      args: self.args.iter().map(|a| a.replace(placeholder, value)).collect(),
    }
  }
}

impl TryFrom<Vec<String>> for CommandSpec {
  type Error = EmptyCommandError;

  fn try_from(mut argv: Vec<String>) -> Result<Self, Self::Error> {
    if argv.is_empty() || argv[0].trim().is_empty() {
      return Err(EmptyCommandError);
    }
    let program = argv.remove(0);
    Ok(Self { program, args: argv })
  }
}

impl From<CommandSpec> for Vec<String> {
  fn from(spec: CommandSpec) -> Self {
    let mut argv = Vec::with_capacity(spec.args.len() + 1);
    argv.push(spec.program);
    argv.extend(spec.args);
    argv
  }
}

impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", quote(&self.program))?;
    for arg in &self.args {
      write!(f, " {}", quote(arg))?;
    }
    Ok(())
  }
}

fn quote(s: &str) -> String {
  if s.is_empty() || s.contains(char::is_whitespace) {
    format!("{:?}", s)
  } else {
    s.to_string()
  }
}

/// Exit status and captured output of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdOutput {
  /// Exit code, or `None` if the process was terminated by a signal.
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CmdOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// First non-empty line of stdout, falling back to stderr.
  ///
  /// Some tools print their `--version` banner on stderr.
  pub fn first_line(&self) -> Option<&str> {
    first_non_empty(&self.stdout).or_else(|| first_non_empty(&self.stderr))
  }

  /// Returns true if stdout or stderr contains `needle`, ignoring ASCII case.
  pub fn mentions(&self, needle: &str) -> bool {
    let needle = needle.to_ascii_lowercase();
    self.stdout.to_ascii_lowercase().contains(&needle) || self.stderr.to_ascii_lowercase().contains(&needle)
  }

  /// The last `lines` lines of diagnostic output (stderr, or stdout if stderr is empty).
  pub fn diagnostics_tail(&self, lines: usize) -> String {
    let source = if self.stderr.trim().is_empty() {
      &self.stdout
    } else {
      &self.stderr
    };
    let all: Vec<&str> = source.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
  }
}

fn first_non_empty(s: &str) -> Option<&str> {
  s.lines().map(str::trim).find(|line| !line.is_empty())
}

/// Scoped execution context applied to each child process.
///
/// Entries are prepended to the child's inherited `PATH`; the orchestrator's own
/// environment is never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecEnv {
  path_prefix: Vec<PathBuf>,
  vars: BTreeMap<String, String>,
}

impl ExecEnv {
  /// Add a directory to the front of the search path, after entries added earlier.
  ///
  /// Duplicate entries are ignored.
  pub fn push_path(&mut self, dir: impl AsRef<Path>) {
    let dir = dir.as_ref();
    if !self.path_prefix.iter().any(|p| p == dir) {
      self.path_prefix.push(dir.to_path_buf());
    }
  }

  pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
    self.vars.insert(name.into(), value.into());
  }

  pub fn path_prefix(&self) -> &[PathBuf] {
    &self.path_prefix
  }

  pub fn vars(&self) -> &BTreeMap<String, String> {
    &self.vars
  }

  /// The `PATH` value a child should receive, or `None` when nothing is prepended.
  pub fn path_value(&self) -> Result<Option<OsString>, ExecError> {
    if self.path_prefix.is_empty() {
      return Ok(None);
    }
    let existing = env::var_os("PATH").unwrap_or_default();
    let mut paths = self.path_prefix.clone();
    paths.extend(env::split_paths(&existing));
    Ok(Some(env::join_paths(paths)?))
  }

  pub fn apply(&self, command: &mut tokio::process::Command) -> Result<(), ExecError> {
    if let Some(path) = self.path_value()? {
      command.env("PATH", path);
    }
    for (key, value) in &self.vars {
      command.env(key, value);
    }
    Ok(())
  }
}
