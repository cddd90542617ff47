//! Pipeline context.
//!
//! The context is created once at pipeline start from explicit flags, CI environment
//! variables and the host platform. Every stage receives it by reference and it is never
//! mutated afterwards.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::EnvConfig;
use crate::platform::TargetOs;

#[derive(Debug, Error)]
pub enum ContextError {
  #[error("invalid version tag '{0}': the tag is part of the archive name and may not contain path separators")]
  InvalidTag(String),

  #[error("environment variable {var} holds an unknown operating system '{value}'")]
  UnknownOsVar { var: String, value: String },

  #[error("host operating system '{0}' is not a supported target; pass --os explicitly")]
  UnsupportedHost(String),

  #[error("cannot use working directory {}: {source}", .path.display())]
  WorkingDirectory {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("working directory is not a directory: {}", .0.display())]
  NotADirectory(PathBuf),
}

/// Where the target OS of a run came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsSource {
  /// Passed explicitly by the invoker.
  Flag,
  /// Read from a CI environment variable.
  Env { var: String, value: String },
  /// Auto-detected from the host.
  Host,
}

impl fmt::Display for OsSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OsSource::Flag => write!(f, "flag"),
      OsSource::Env { var, value } => write!(f, "${}={}", var, value),
      OsSource::Host => write!(f, "host"),
    }
  }
}

/// Inputs for [`PipelineContext::resolve`]; explicit values win over the environment.
#[derive(Debug, Clone, Default)]
pub struct ContextRequest {
  pub target_os: Option<TargetOs>,
  pub version_tag: Option<String>,
  pub working_directory: PathBuf,
}

/// Immutable per-run record shared by all stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineContext {
  target_os: TargetOs,
  version_tag: String,
  working_directory: PathBuf,
}

impl PipelineContext {
  /// Create a context, validating the tag and canonicalizing the working directory.
  ///
  /// An empty (or all-whitespace) tag means the run is untagged.
  pub fn new(
    target_os: TargetOs,
    version_tag: impl Into<String>,
    working_directory: impl AsRef<Path>,
  ) -> Result<Self, ContextError> {
    let version_tag = validate_tag(version_tag.into())?;
    let path = working_directory.as_ref();

    let working_directory = dunce::canonicalize(path).map_err(|source| ContextError::WorkingDirectory {
      path: path.to_path_buf(),
      source,
    })?;
    if !working_directory.is_dir() {
      return Err(ContextError::NotADirectory(working_directory));
    }

    Ok(Self {
      target_os,
      version_tag,
      working_directory,
    })
  }

  /// Resolve a context from explicit values, then the configured environment variables,
  /// then the host platform.
  pub fn resolve(request: ContextRequest, env: &EnvConfig) -> Result<(Self, OsSource), ContextError> {
    let (target_os, source) = resolve_target_os(request.target_os, &env.os_vars)?;
    let version_tag = match request.version_tag {
      Some(tag) => tag,
      None => tag_from_env(&env.tag_vars),
    };

    debug!(os = %target_os, source = %source, tag = %version_tag, "resolved pipeline context");

    let ctx = Self::new(target_os, version_tag, &request.working_directory)?;
    Ok((ctx, source))
  }

  pub fn target_os(&self) -> TargetOs {
    self.target_os
  }

  /// The release tag, or `None` for an untagged run.
  pub fn version_tag(&self) -> Option<&str> {
    if self.version_tag.is_empty() {
      None
    } else {
      Some(&self.version_tag)
    }
  }

  pub fn working_directory(&self) -> &Path {
    &self.working_directory
  }

  /// Resolve a path relative to the working directory.
  pub fn resolve_path(&self, relative: &Path) -> PathBuf {
    let mut path = self.working_directory.clone();
    path.extend(relative.components().filter(|c| !matches!(c, Component::CurDir)));
    path
  }
}

fn validate_tag(tag: String) -> Result<String, ContextError> {
  let trimmed = tag.trim();
  let invalid = trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\', '\0']);
  if invalid {
    return Err(ContextError::InvalidTag(tag));
  }
  Ok(trimmed.to_string())
}

fn resolve_target_os(explicit: Option<TargetOs>, vars: &[String]) -> Result<(TargetOs, OsSource), ContextError> {
  if let Some(os) = explicit {
    return Ok((os, OsSource::Flag));
  }

  for var in vars {
    let Ok(value) = std::env::var(var) else {
      continue;
    };
    if value.trim().is_empty() {
      continue;
    }
    let os = TargetOs::from_identifier(&value).ok_or_else(|| ContextError::UnknownOsVar {
      var: var.clone(),
      value: value.clone(),
    })?;
    return Ok((os, OsSource::Env { var: var.clone(), value }));
  }

  TargetOs::host()
    .map(|os| (os, OsSource::Host))
    .ok_or_else(|| ContextError::UnsupportedHost(std::env::consts::OS.to_string()))
}

fn tag_from_env(vars: &[String]) -> String {
  vars
    .iter()
    .filter_map(|var| std::env::var(var).ok())
    .find(|value| !value.trim().is_empty())
    .unwrap_or_default()
}
