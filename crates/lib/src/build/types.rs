use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::exec::{ExecError, describe_exit};

#[derive(Debug, Error)]
pub enum BuildError {
  /// The build ran and exited unsuccessfully.
  #[error("build command `{cmd}` failed with {}\n{diagnostics}", fmt_code(.code))]
  Failed {
    cmd: String,
    code: Option<i32>,
    /// Tail of the build's diagnostic output.
    diagnostics: String,
  },

  /// The build could not be run to completion (spawn failure or timeout).
  #[error("build command `{cmd}` could not run: {source}")]
  Exec {
    cmd: String,
    #[source]
    source: ExecError,
  },
}

fn fmt_code(code: &Option<i32>) -> String {
  describe_exit(*code)
}

impl BuildError {
  pub fn code(&self) -> Option<i32> {
    match self {
      BuildError::Failed { code, .. } => *code,
      BuildError::Exec { .. } => None,
    }
  }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
  pub exit_code: i32,
  /// Expected location of the produced binary, with the target's executable suffix.
  pub binary_path: PathBuf,
  /// Toolchain versions in effect for the build, for the audit log.
  pub toolchain_versions: BTreeMap<String, String>,
}
