//! Types for toolchain provisioning.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::PACKAGE_PLACEHOLDER;
use crate::exec::{CmdOutput, CommandSpec, ExecEnv};
use crate::platform::TargetOs;

/// Errors that abort provisioning. Any of them stops the pipeline before the build.
#[derive(Debug, Error)]
pub enum ProvisioningError {
  /// The package manager is missing and could not be bootstrapped.
  #[error("package manager {manager} is unavailable: {message}")]
  Bootstrap { manager: String, message: String },

  /// Every install attempt for a tool failed.
  #[error("failed to install {tool} ({cmd}): {reason}")]
  Install { tool: String, cmd: String, reason: String },

  /// A tool's version command did not produce a version string.
  #[error("{tool} is not usable ({cmd}): {reason}")]
  VersionProbe { tool: String, cmd: String, reason: String },
}

/// A tool the build needs, how to verify it, and how to install it on Windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainRequirement {
  pub name: String,

  /// Version command; must exit successfully and print a version line.
  pub probe: CommandSpec,

  /// Package id for the primary package manager. `None` means the tool must already exist.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub package: Option<String>,

  /// Package id for the secondary package manager, tried when the primary install fails.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fallback_package: Option<String>,

  /// Directories the tool lives in once installed; prepended to the execution path.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub path_entries: Vec<PathBuf>,

  /// Target OSes this requirement applies to. Empty means all.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub platforms: Vec<TargetOs>,
}

impl ToolchainRequirement {
  /// A requirement that applies everywhere and is never installed by the pipeline.
  pub fn preinstalled(name: impl Into<String>, probe: CommandSpec) -> Self {
    Self {
      name: name.into(),
      probe,
      package: None,
      fallback_package: None,
      path_entries: Vec::new(),
      platforms: Vec::new(),
    }
  }

  pub fn applies_to(&self, os: TargetOs) -> bool {
    self.platforms.is_empty() || self.platforms.contains(&os)
  }
}

/// A package manager the provisioner can install tools through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManagerSpec {
  pub name: String,

  /// Command that succeeds when the manager is usable.
  pub probe: CommandSpec,

  /// Install command; `{package}` is replaced with the package id.
  pub install: CommandSpec,

  /// Where the manager's own executables live.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub path_entries: Vec<PathBuf>,

  /// Output fragments meaning the package is already present (treated as success).
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub already_installed_markers: Vec<String>,

  /// Command that installs the manager itself when the probe fails.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bootstrap: Option<CommandSpec>,
}

impl PackageManagerSpec {
  pub fn install_command(&self, package: &str) -> CommandSpec {
    self.install.substitute(PACKAGE_PLACEHOLDER, package)
  }

  /// Whether an install attempt counts as success: a clean exit, or output saying the
  /// package is already there.
  pub fn install_succeeded(&self, output: &CmdOutput) -> bool {
    output.success() || self.already_installed_markers.iter().any(|m| output.mentions(m))
  }
}

/// Output of the provisioner: detected versions plus the scoped environment the
/// later stages must run under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Toolchain {
  pub versions: BTreeMap<String, String>,
  pub env: ExecEnv,
}
