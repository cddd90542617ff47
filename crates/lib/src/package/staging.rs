//! Staging directory management.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use super::manifest::ManifestEntry;

#[derive(Debug, Error)]
pub enum StagingError {
  #[error("staging path {} exists and is not a directory", .0.display())]
  NotADirectory(PathBuf),

  #[error("failed to remove stale staging directory {}: {source}", .path.display())]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create staging directory {}: {source}", .path.display())]
  Create {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Recreate `path` as an empty directory.
///
/// A stale staging directory is removed first. A non-directory at `path` is an error and
/// is left untouched.
pub fn prepare_staging_dir(path: &Path) -> Result<(), StagingError> {
  match fs::symlink_metadata(path) {
    Ok(meta) if meta.is_dir() => {
      debug!(path = ?path, "removing stale staging directory");
      fs::remove_dir_all(path).map_err(|source| StagingError::Remove {
        path: path.to_path_buf(),
        source,
      })?;
    }
    Ok(_) => return Err(StagingError::NotADirectory(path.to_path_buf())),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(source) => {
      return Err(StagingError::Remove {
        path: path.to_path_buf(),
        source,
      });
    }
  }

  fs::create_dir_all(path).map_err(|source| StagingError::Create {
    path: path.to_path_buf(),
    source,
  })
}

/// Copy one manifest entry into the staging directory, recursing into directories.
///
/// Returns the number of files copied.
pub fn stage_entry(entry: &ManifestEntry, staging_dir: &Path) -> Result<usize, StagingError> {
  let dest = staging_dir.join(&entry.dest);
  let copy_err = |from: &Path, to: &Path, source: io::Error| StagingError::Copy {
    from: from.to_path_buf(),
    to: to.to_path_buf(),
    source,
  };

  if !entry.source.is_dir() {
    if let Some(parent) = dest.parent() {
      fs::create_dir_all(parent).map_err(|e| copy_err(&entry.source, &dest, e))?;
    }
    fs::copy(&entry.source, &dest).map_err(|e| copy_err(&entry.source, &dest, e))?;
    debug!(from = ?entry.source, to = ?dest, "staged file");
    return Ok(1);
  }

  let mut copied = 0;
  for item in WalkDir::new(&entry.source).sort_by_file_name() {
    let item = item.map_err(|e| copy_err(&entry.source, &dest, e.into()))?;
    let rel = item
      .path()
      .strip_prefix(&entry.source)
      .map_err(|e| copy_err(item.path(), &dest, io::Error::other(e)))?;
    let target = dest.join(rel);

    if item.file_type().is_dir() {
      fs::create_dir_all(&target).map_err(|e| copy_err(item.path(), &target, e))?;
    } else {
      fs::copy(item.path(), &target).map_err(|e| copy_err(item.path(), &target, e))?;
      copied += 1;
    }
  }

  debug!(from = ?entry.source, to = ?dest, files = copied, "staged directory");
  Ok(copied)
}
