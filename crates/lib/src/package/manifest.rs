//! What gets staged, and what the archive is called.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::context::PipelineContext;
use crate::platform::TargetOs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
  Zip,
  TarGz,
}

impl ArchiveFormat {
  /// Zip for Windows, gzip-compressed tar everywhere else.
  pub const fn for_os(os: TargetOs) -> Self {
    if os.is_windows() { Self::Zip } else { Self::TarGz }
  }

  pub const fn extension(&self) -> &'static str {
    match self {
      Self::Zip => "zip",
      Self::TarGz => "tar.gz",
    }
  }
}

impl fmt::Display for ArchiveFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.extension())
  }
}

/// Name and format of the final archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSpec {
  pub project: String,
  pub target_os: TargetOs,
  pub version_tag: Option<String>,
  pub format: ArchiveFormat,
}

impl ArchiveSpec {
  pub fn new(project: impl Into<String>, ctx: &PipelineContext) -> Self {
    Self {
      project: project.into(),
      target_os: ctx.target_os(),
      version_tag: ctx.version_tag().map(str::to_string),
      format: ArchiveFormat::for_os(ctx.target_os()),
    }
  }

  /// `<project>-<os>[-<tag>].<ext>`
  pub fn file_name(&self) -> String {
    match &self.version_tag {
      Some(tag) => format!("{}-{}-{}.{}", self.project, self.target_os, tag, self.format.extension()),
      None => format!("{}-{}.{}", self.project, self.target_os, self.format.extension()),
    }
  }
}

/// One source to copy into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
  /// Absolute source path (file or directory).
  pub source: PathBuf,
  /// Destination relative to the staging directory.
  pub dest: PathBuf,
}

/// Everything that goes into the staging directory, in staging order.
///
/// The binary and the configuration directory always come first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageManifest {
  pub staging_dir: PathBuf,
  pub entries: Vec<ManifestEntry>,
}

impl PackageManifest {
  /// Build the manifest for a project rooted at the context's working directory.
  ///
  /// `config_dir` and `include` are relative to the working directory. Included paths
  /// keep their relative location inside the staging directory.
  pub fn new(
    ctx: &PipelineContext,
    staging_dir: &Path,
    binary_path: &Path,
    config_dir: &Path,
    include: &[PathBuf],
  ) -> Self {
    let mut entries = vec![
      ManifestEntry {
        source: binary_path.to_path_buf(),
        dest: binary_path.file_name().map(PathBuf::from).unwrap_or_default(),
      },
      ManifestEntry {
        source: ctx.resolve_path(config_dir),
        dest: config_dir.to_path_buf(),
      },
    ];
    entries.extend(include.iter().map(|path| ManifestEntry {
      source: ctx.resolve_path(path),
      dest: path.clone(),
    }));

    Self {
      staging_dir: ctx.resolve_path(staging_dir),
      entries,
    }
  }

  /// Name of the single top-level directory inside the archive.
  pub fn root_name(&self) -> String {
    self
      .staging_dir
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "package".to_string())
  }
}
