//! Resolved, side-effect free description of a run.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::build;
use crate::config::{ConfigError, PipelineConfig};
use crate::context::PipelineContext;
use crate::exec::CommandSpec;
use crate::package::{ArchiveSpec, PackageManifest};
use crate::provision::ToolchainRequirement;

/// Everything a run will do, derived from the context and configuration alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelinePlan {
  pub context: PipelineContext,
  pub project: String,
  /// Requirements applying to the target OS, in provisioning order.
  pub requirements: Vec<ToolchainRequirement>,
  pub build_command: CommandSpec,
  pub binary_path: PathBuf,
  pub manifest: PackageManifest,
  pub archive: ArchiveSpec,
  pub archive_path: PathBuf,
  #[serde(skip_serializing_if = "Option::is_none", serialize_with = "humantime_opt::serialize")]
  pub timeout: Option<Duration>,
}

impl PipelinePlan {
  /// Validates `config` first, so configurations built in code get the same checks as
  /// loaded files.
  pub fn resolve(ctx: &PipelineContext, config: &PipelineConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    let workdir = ctx.working_directory();
    let project = config.project_name(workdir);

    let binary_path = build::binary_path(ctx, &config.project.binary_dir.join(config.binary_name(workdir)));

    let manifest = PackageManifest::new(
      ctx,
      &config.package.staging_dir,
      &binary_path,
      &config.project.config_dir,
      &config.package.include,
    );
    let archive = ArchiveSpec::new(project.clone(), ctx);
    let archive_path = ctx.resolve_path(&config.package.output_dir).join(archive.file_name());

    let requirements = config
      .toolchain
      .iter()
      .filter(|r| r.applies_to(ctx.target_os()))
      .cloned()
      .collect();

    Ok(Self {
      context: ctx.clone(),
      project,
      requirements,
      build_command: config.build.command.clone(),
      binary_path,
      manifest,
      archive,
      archive_path,
      timeout: config.timeout()?,
    })
  }
}

mod humantime_opt {
  use std::time::Duration;

  use serde::Serializer;

  pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
      Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
      None => serializer.serialize_none(),
    }
  }
}
