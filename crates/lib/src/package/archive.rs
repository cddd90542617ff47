//! Deterministic archive writers.
//!
//! Entries are rooted at the staging directory's name, walked in sorted order, and carry
//! a fixed timestamp ([`ARCHIVE_EPOCH`]) with owner ids zeroed, so identical staging trees
//! produce identical archives. The archive is written to a temporary file next to its
//! destination and only renamed into place once complete.

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Component, Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use super::manifest::ArchiveFormat;
use crate::consts::ARCHIVE_EPOCH;

#[derive(Debug, Error)]
pub enum PackagingError {
  /// A manifest source does not exist, e.g. the build produced no binary.
  #[error("package source is missing: {}", .0.display())]
  MissingSource(PathBuf),

  #[error("failed to write archive {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write zip archive {}: {source}", .path.display())]
  Zip {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },
}

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;
const EXEC_MODE: u32 = 0o755;

/// A file or directory to archive, with its archive-relative name.
struct Item {
  path: PathBuf,
  name: String,
  is_dir: bool,
  mode: u32,
}

/// Write `staging_dir` as an archive at `output`.
pub fn write_archive(staging_dir: &Path, format: ArchiveFormat, output: &Path) -> Result<(), PackagingError> {
  let write_err = |source: io::Error| PackagingError::Write {
    path: output.to_path_buf(),
    source,
  };

  let items = collect_items(staging_dir).map_err(write_err)?;
  let out_dir = output.parent().unwrap_or(Path::new("."));
  let mut temp = NamedTempFile::new_in(out_dir).map_err(write_err)?;

  debug!(format = %format, entries = items.len(), temp = ?temp.path(), "writing archive");

  match format {
    ArchiveFormat::TarGz => write_tar_gz(temp.as_file_mut(), &items).map_err(write_err)?,
    ArchiveFormat::Zip => write_zip(temp.as_file_mut(), &items).map_err(|source| PackagingError::Zip {
      path: output.to_path_buf(),
      source,
    })?,
  }

  temp.as_file().sync_all().map_err(write_err)?;
  temp.persist(output).map_err(|e| write_err(e.error))?;
  Ok(())
}

fn collect_items(staging_dir: &Path) -> io::Result<Vec<Item>> {
  let root = staging_dir
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "package".to_string());

  let mut items = Vec::new();
  for entry in WalkDir::new(staging_dir).sort_by_file_name() {
    let entry = entry?;
    let rel = entry.path().strip_prefix(staging_dir).map_err(io::Error::other)?;

    let mut name = root.clone();
    for component in rel.components() {
      if let Component::Normal(part) = component {
        name.push('/');
        name.push_str(&part.to_string_lossy());
      }
    }

    let is_dir = entry.file_type().is_dir();
    let mode = if is_dir {
      DIR_MODE
    } else if is_executable(&entry.metadata().map_err(io::Error::from)?) {
      EXEC_MODE
    } else {
      FILE_MODE
    };

    items.push(Item {
      path: entry.into_path(),
      name,
      is_dir,
      mode,
    });
  }
  Ok(items)
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
  use std::os::unix::fs::PermissionsExt;
  meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
  false
}

fn write_tar_gz(file: &mut File, items: &[Item]) -> io::Result<()> {
  let encoder = GzEncoder::new(file, Compression::default());
  let mut builder = tar::Builder::new(encoder);

  for item in items {
    let mut header = tar::Header::new_gnu();
    header.set_mtime(ARCHIVE_EPOCH);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mode(item.mode);

    if item.is_dir {
      header.set_entry_type(tar::EntryType::Directory);
      header.set_size(0);
      builder.append_data(&mut header, format!("{}/", item.name), io::empty())?;
    } else {
      let source = File::open(&item.path)?;
      header.set_entry_type(tar::EntryType::Regular);
      header.set_size(source.metadata()?.len());
      builder.append_data(&mut header, &item.name, BufReader::new(source))?;
    }
  }

  let mut encoder = builder.into_inner()?;
  encoder.flush()?;
  encoder.finish()?;
  Ok(())
}

fn write_zip(file: &mut File, items: &[Item]) -> zip::result::ZipResult<()> {
  let mut writer = zip::ZipWriter::new(file);

  for item in items {
    let options = zip::write::SimpleFileOptions::default()
      .compression_method(zip::CompressionMethod::Deflated)
      .last_modified_time(zip::DateTime::default())
      .unix_permissions(item.mode);
    if item.is_dir {
      writer.add_directory(format!("{}/", item.name), options)?;
    } else {
      writer.start_file(item.name.clone(), options)?;
      let mut source = File::open(&item.path)?;
      io::copy(&mut source, &mut writer)?;
    }
  }

  writer.finish()?;
  Ok(())
}
