//! Release build invocation.
//!
//! Runs the configured build command exactly once in the working directory, under the
//! scoped environment produced by provisioning. The toolchain versions are logged right
//! before the build so every run's log records what built the artifact.

mod types;

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::consts::DIAGNOSTIC_TAIL_LINES;
use crate::context::PipelineContext;
use crate::exec::{CommandRunner, CommandSpec};
use crate::provision::Toolchain;

pub use types::{BuildError, BuildResult};

/// Absolute path of `binary` (relative, without suffix) for the context's target OS.
pub fn binary_path(ctx: &PipelineContext, binary: &Path) -> PathBuf {
  let mut name = binary.as_os_str().to_os_string();
  name.push(ctx.target_os().exe_suffix());
  ctx.resolve_path(Path::new(&name))
}

pub struct BuildInvoker<'a, R: CommandRunner> {
  runner: &'a R,
  command: &'a CommandSpec,
  /// Binary location relative to the working directory, without platform suffix.
  binary: PathBuf,
}

impl<'a, R: CommandRunner> BuildInvoker<'a, R> {
  pub fn new(runner: &'a R, command: &'a CommandSpec, binary: impl Into<PathBuf>) -> Self {
    Self {
      runner,
      command,
      binary: binary.into(),
    }
  }

  pub fn binary_path(&self, ctx: &PipelineContext) -> PathBuf {
    binary_path(ctx, &self.binary)
  }

  pub async fn build(&self, ctx: &PipelineContext, toolchain: &Toolchain) -> Result<BuildResult, BuildError> {
    for (tool, version) in &toolchain.versions {
      info!(tool = %tool, version = %version, "toolchain");
    }
    info!(cmd = %self.command, os = %ctx.target_os(), "starting build");

    let out = self
      .runner
      .run(self.command, ctx.working_directory(), &toolchain.env)
      .await
      .map_err(|source| BuildError::Exec {
        cmd: self.command.to_string(),
        source,
      })?;

    if !out.success() {
      error!(cmd = %self.command, code = ?out.code, "build failed");
      return Err(BuildError::Failed {
        cmd: self.command.to_string(),
        code: out.code,
        diagnostics: out.diagnostics_tail(DIAGNOSTIC_TAIL_LINES),
      });
    }

    let binary_path = self.binary_path(ctx);
    info!(binary = ?binary_path, "build finished");

    Ok(BuildResult {
      exit_code: 0,
      binary_path,
      toolchain_versions: toolchain.versions.clone(),
    })
  }
}
