//! Project configuration (`distpipe.toml`).
//!
//! Every field is optional. A missing file or section yields the stock pipeline: Chocolatey
//! plus MSYS2 on Windows, `cargo build --release`, and a `package/` staging directory holding
//! the binary and `config/`.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{
  CONFIG_FILENAME, DEFAULT_BINARY_DIR, DEFAULT_CONFIG_DIR, DEFAULT_OS_VARS, DEFAULT_STAGING_DIR, DEFAULT_TAG_VARS,
};
use crate::exec::CommandSpec;
use crate::provision::{PackageManagerSpec, ToolchainRequirement, chocolatey, default_requirements, msys2_pacman};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("{field} must be a relative path inside the working directory, got '{}'", .path.display())]
  PathEscapes { field: String, path: PathBuf },

  #[error(
    "package.staging_dir '{}' overlaps {field} '{}'; the staging directory is recreated on every run",
    .staging_dir.display(),
    .path.display()
  )]
  Overlap {
    staging_dir: PathBuf,
    field: String,
    path: PathBuf,
  },

  #[error("{field} must not be empty")]
  Empty { field: String },

  #[error("invalid exec.timeout '{value}': {source}")]
  Timeout {
    value: String,
    #[source]
    source: humantime::DurationError,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
  pub project: ProjectConfig,
  pub build: BuildConfig,
  pub package: PackageConfig,
  pub env: EnvConfig,
  pub exec: ExecConfig,
  pub package_managers: PackageManagers,
  /// Replaces the default requirement set when non-empty.
  pub toolchain: Vec<ToolchainRequirement>,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      project: ProjectConfig::default(),
      build: BuildConfig::default(),
      package: PackageConfig::default(),
      env: EnvConfig::default(),
      exec: ExecConfig::default(),
      package_managers: PackageManagers::default(),
      toolchain: default_requirements(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
  /// Project name used in the archive file name.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  /// Binary name without the `.exe` suffix. Defaults to the project name.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub binary: Option<String>,
  pub binary_dir: PathBuf,
  pub config_dir: PathBuf,
}

impl Default for ProjectConfig {
  fn default() -> Self {
    Self {
      name: None,
      binary: None,
      binary_dir: PathBuf::from(DEFAULT_BINARY_DIR),
      config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
  pub command: CommandSpec,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      command: CommandSpec::new("cargo").args(["build", "--release"]),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageConfig {
  pub staging_dir: PathBuf,
  pub output_dir: PathBuf,
  /// Extra files or directories staged next to the binary and config directory.
  pub include: Vec<PathBuf>,
}

impl Default for PackageConfig {
  fn default() -> Self {
    Self {
      staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
      output_dir: PathBuf::from("."),
      include: Vec::new(),
    }
  }
}

/// Names of the CI variables the context is read from, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvConfig {
  pub os_vars: Vec<String>,
  pub tag_vars: Vec<String>,
}

impl Default for EnvConfig {
  fn default() -> Self {
    Self {
      os_vars: DEFAULT_OS_VARS.iter().map(|v| v.to_string()).collect(),
      tag_vars: DEFAULT_TAG_VARS.iter().map(|v| v.to_string()).collect(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecConfig {
  /// Per-command timeout in humantime syntax (`90s`, `45m`, `1h 30m`).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageManagers {
  pub primary: Option<PackageManagerSpec>,
  pub secondary: Option<PackageManagerSpec>,
}

impl Default for PackageManagers {
  fn default() -> Self {
    Self {
      primary: Some(chocolatey()),
      secondary: Some(msys2_pacman()),
    }
  }
}

impl PipelineConfig {
  /// Parse and validate a configuration file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    config.validate()?;
    debug!(path = ?path, "loaded configuration");
    Ok(config)
  }

  /// Load `explicit` if given, else `<workdir>/distpipe.toml` if it exists, else the defaults.
  pub fn discover(workdir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
    if let Some(path) = explicit {
      return Self::load(path);
    }

    let candidate = workdir.join(CONFIG_FILENAME);
    if candidate.is_file() {
      return Self::load(&candidate);
    }

    debug!(workdir = ?workdir, "no {} found, using defaults", CONFIG_FILENAME);
    Ok(Self::default())
  }

  /// Check that every configured path stays inside the working directory, and that the
  /// staging directory is disjoint from every packaging source.
  pub fn validate(&self) -> Result<(), ConfigError> {
    check_relative("project.binary_dir", &self.project.binary_dir)?;
    check_relative("project.config_dir", &self.project.config_dir)?;
    check_relative("package.staging_dir", &self.package.staging_dir)?;
    check_relative("package.output_dir", &self.package.output_dir)?;
    for include in &self.package.include {
      check_relative("package.include", include)?;
    }

    if self.package.staging_dir.components().all(|c| matches!(c, Component::CurDir)) {
      return Err(ConfigError::Empty {
        field: "package.staging_dir".to_string(),
      });
    }
    self.check_staging_overlap()?;

    for (field, value) in [("project.name", &self.project.name), ("project.binary", &self.project.binary)] {
      if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
        return Err(ConfigError::Empty {
          field: field.to_string(),
        });
      }
    }

    self.timeout()?;
    Ok(())
  }

  /// The staging directory is removed at the start of packaging, so it must neither equal,
  /// contain nor sit inside a directory the run reads from. The output directory may contain
  /// it (the default `.` does) but may not sit inside it.
  fn check_staging_overlap(&self) -> Result<(), ConfigError> {
    let staging = normalize(&self.package.staging_dir);
    let overlap = |field: &str, path: &Path| ConfigError::Overlap {
      staging_dir: self.package.staging_dir.clone(),
      field: field.to_string(),
      path: path.to_path_buf(),
    };

    let sources = [
      ("project.binary_dir", &self.project.binary_dir),
      ("project.config_dir", &self.project.config_dir),
    ]
    .into_iter()
    .chain(self.package.include.iter().map(|p| ("package.include", p)));

    for (field, path) in sources {
      let source = normalize(path);
      if source.starts_with(&staging) || staging.starts_with(&source) {
        return Err(overlap(field, path.as_path()));
      }
    }

    if normalize(&self.package.output_dir).starts_with(&staging) {
      return Err(overlap("package.output_dir", self.package.output_dir.as_path()));
    }
    Ok(())
  }

  /// The project name: configured, else `[package].name` from `Cargo.toml`, else the
  /// working directory's name.
  pub fn project_name(&self, workdir: &Path) -> String {
    if let Some(name) = &self.project.name {
      return name.clone();
    }
    if let Some(name) = cargo_package_name(workdir) {
      return name;
    }
    workdir
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "project".to_string())
  }

  /// The binary name without platform suffix.
  pub fn binary_name(&self, workdir: &Path) -> String {
    self.project.binary.clone().unwrap_or_else(|| self.project_name(workdir))
  }

  pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
    self
      .exec
      .timeout
      .as_deref()
      .map(|value| {
        humantime::parse_duration(value).map_err(|source| ConfigError::Timeout {
          value: value.to_string(),
          source,
        })
      })
      .transpose()
  }
}

fn check_relative(field: &str, path: &Path) -> Result<(), ConfigError> {
  let escapes = path
    .components()
    .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
  if escapes || path.as_os_str().is_empty() {
    return Err(ConfigError::PathEscapes {
      field: field.to_string(),
      path: path.to_path_buf(),
    });
  }
  Ok(())
}

/// Drop `.` components so `./config` and `config` compare equal. Paths are already known
/// to be relative and free of `..`.
fn normalize(path: &Path) -> PathBuf {
  path.components().filter(|c| !matches!(c, Component::CurDir)).collect()
}

#[derive(Deserialize)]
struct CargoManifest {
  package: Option<CargoPackage>,
}

#[derive(Deserialize)]
struct CargoPackage {
  name: String,
}

fn cargo_package_name(workdir: &Path) -> Option<String> {
  let content = std::fs::read_to_string(workdir.join("Cargo.toml")).ok()?;
  let manifest: CargoManifest = toml::from_str(&content).ok()?;
  manifest.package.map(|p| p.name)
}
