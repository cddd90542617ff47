//! Artifact packaging.
//!
//! Stages the build binary, the configuration directory and any extra includes into a
//! freshly created staging directory, then archives it in the target OS's format.
//!
//! # Submodules
//!
//! - [`manifest`] - What gets staged and the archive name
//! - [`staging`] - Staging directory setup and copying
//! - [`archive`] - Deterministic tar.gz and zip writers

pub mod archive;
pub mod manifest;
pub mod staging;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::util::hash::hash_file;

pub use archive::PackagingError;
pub use manifest::{ArchiveFormat, ArchiveSpec, ManifestEntry, PackageManifest};
pub use staging::StagingError;

#[derive(Debug, Error)]
pub enum PackageError {
  #[error(transparent)]
  Staging(#[from] StagingError),

  #[error(transparent)]
  Packaging(#[from] PackagingError),
}

/// The archive produced by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
  pub path: PathBuf,
  pub file_name: String,
  pub format: ArchiveFormat,
  pub size: u64,
  pub sha256: String,
}

pub struct Packager<'a> {
  manifest: &'a PackageManifest,
  spec: &'a ArchiveSpec,
  output_dir: PathBuf,
}

impl<'a> Packager<'a> {
  /// `output_dir` must be absolute; the archive is written there.
  pub fn new(manifest: &'a PackageManifest, spec: &'a ArchiveSpec, output_dir: impl Into<PathBuf>) -> Self {
    Self {
      manifest,
      spec,
      output_dir: output_dir.into(),
    }
  }

  pub fn output_path(&self) -> PathBuf {
    self.output_dir.join(self.spec.file_name())
  }

  pub fn package(&self) -> Result<Artifact, PackageError> {
    for entry in &self.manifest.entries {
      if !entry.source.exists() {
        return Err(PackagingError::MissingSource(entry.source.clone()).into());
      }
    }

    let staging_dir = &self.manifest.staging_dir;
    staging::prepare_staging_dir(staging_dir)?;
    info!(staging = ?staging_dir, "staging package contents");

    let mut files = 0;
    for entry in &self.manifest.entries {
      files += staging::stage_entry(entry, staging_dir)?;
    }

    let output = self.output_path();
    info!(archive = %self.spec.file_name(), format = %self.spec.format, files, "writing archive");
    archive::write_archive(staging_dir, self.spec.format, &output)?;

    let artifact = describe(&output, self.spec)?;
    info!(
      archive = ?artifact.path,
      size = artifact.size,
      sha256 = %artifact.sha256,
      "archive created"
    );
    Ok(artifact)
  }
}

fn describe(path: &Path, spec: &ArchiveSpec) -> Result<Artifact, PackagingError> {
  let write_err = |source| PackagingError::Write {
    path: path.to_path_buf(),
    source,
  };
  let size = std::fs::metadata(path).map_err(write_err)?.len();
  let sha256 = hash_file(path).map_err(write_err)?;

  Ok(Artifact {
    path: path.to_path_buf(),
    file_name: spec.file_name(),
    format: spec.format,
    size,
    sha256,
  })
}
