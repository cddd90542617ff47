//! Pipeline orchestration.
//!
//! A run is a strict sequence: `Start → Provisioning → Building → Packaging → Done`. The
//! first failure moves the pipeline to `Failed` (terminal) and is returned unchanged,
//! tagged with the stage it came from. There are no retries and no resume; a new run
//! starts over from `Start`.
//!
//! # Submodules
//!
//! - [`plan`] - Side-effect free resolution of what a run will do
//! - [`cancel`] - Operator cancellation, honored at stage boundaries

pub mod cancel;
pub mod plan;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::build::{BuildError, BuildInvoker};
use crate::config::{ConfigError, PipelineConfig};
use crate::context::PipelineContext;
use crate::exec::CommandRunner;
use crate::package::{Artifact, PackageError, PackageManifest, Packager, PackagingError, StagingError};
use crate::provision::{Provisioner, ProvisioningError};

pub use cancel::Cancellation;
pub use plan::PipelinePlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  Provisioning,
  Building,
  Packaging,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Provisioning => "provisioning",
      Stage::Building => "building",
      Stage::Packaging => "packaging",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
  Start,
  Provisioning,
  Building,
  Packaging,
  Done,
  Failed(Stage),
}

impl PipelineState {
  pub fn is_terminal(&self) -> bool {
    matches!(self, PipelineState::Done | PipelineState::Failed(_))
  }
}

impl From<Stage> for PipelineState {
  fn from(stage: Stage) -> Self {
    match stage {
      Stage::Provisioning => PipelineState::Provisioning,
      Stage::Building => PipelineState::Building,
      Stage::Packaging => PipelineState::Packaging,
    }
  }
}

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("invalid configuration: {0}")]
  Config(#[from] ConfigError),

  #[error("provisioning failed: {0}")]
  Provisioning(#[from] ProvisioningError),

  #[error("build failed: {0}")]
  Build(#[from] BuildError),

  #[error("staging failed: {0}")]
  Staging(#[from] StagingError),

  #[error("packaging failed: {0}")]
  Packaging(#[from] PackagingError),

  #[error("run cancelled at the {stage} stage")]
  Cancelled { stage: Stage },
}

impl From<PackageError> for PipelineError {
  fn from(err: PackageError) -> Self {
    match err {
      PackageError::Staging(e) => PipelineError::Staging(e),
      PackageError::Packaging(e) => PipelineError::Packaging(e),
    }
  }
}

impl PipelineError {
  /// The stage the error originated in. `None` for errors raised before any stage ran.
  pub fn stage(&self) -> Option<Stage> {
    match self {
      PipelineError::Config(_) => None,
      PipelineError::Provisioning(_) => Some(Stage::Provisioning),
      PipelineError::Build(_) => Some(Stage::Building),
      PipelineError::Staging(_) | PipelineError::Packaging(_) => Some(Stage::Packaging),
      PipelineError::Cancelled { stage } => Some(*stage),
    }
  }

  /// Process exit code for this failure.
  pub fn exit_code(&self) -> u8 {
    match self {
      PipelineError::Config(_) => 1,
      PipelineError::Provisioning(_) => 10,
      PipelineError::Build(_) => 20,
      PipelineError::Staging(_) => 30,
      PipelineError::Packaging(_) => 40,
      PipelineError::Cancelled { .. } => 130,
    }
  }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
  pub context: PipelineContext,
  pub project: String,
  pub toolchain: BTreeMap<String, String>,
  pub binary: PathBuf,
  pub artifact: Artifact,
  pub elapsed_ms: u64,
}

pub struct Pipeline<'a, R: CommandRunner> {
  ctx: &'a PipelineContext,
  config: &'a PipelineConfig,
  runner: &'a R,
  cancel: Cancellation,
  state: PipelineState,
  history: Vec<PipelineState>,
}

impl<'a, R: CommandRunner> Pipeline<'a, R> {
  pub fn new(ctx: &'a PipelineContext, config: &'a PipelineConfig, runner: &'a R) -> Self {
    Self {
      ctx,
      config,
      runner,
      cancel: Cancellation::default(),
      state: PipelineState::Start,
      history: vec![PipelineState::Start],
    }
  }

  pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn state(&self) -> PipelineState {
    self.state
  }

  /// Every state entered so far, starting with `Start`.
  pub fn history(&self) -> &[PipelineState] {
    &self.history
  }

  /// Run all stages in order, stopping at the first failure.
  pub async fn run(&mut self) -> Result<PipelineReport, PipelineError> {
    let (ctx, config, runner) = (self.ctx, self.config, self.runner);
    let started = Instant::now();
    let plan = PipelinePlan::resolve(ctx, config)?;

    info!(
      project = %plan.project,
      os = %ctx.target_os(),
      tag = ctx.version_tag().unwrap_or(""),
      "starting pipeline"
    );

    self.enter(Stage::Provisioning)?;
    let managers = &config.package_managers;
    let provisioner = Provisioner::new(runner, managers.primary.as_ref(), managers.secondary.as_ref());
    let toolchain = match provisioner.provision(ctx, &config.toolchain).await {
      Ok(toolchain) => toolchain,
      Err(e) => return Err(self.stage_failed(Stage::Provisioning, e.into())),
    };

    self.enter(Stage::Building)?;
    let binary = config
      .project
      .binary_dir
      .join(config.binary_name(ctx.working_directory()));
    let invoker = BuildInvoker::new(runner, &config.build.command, binary);
    let build = match invoker.build(ctx, &toolchain).await {
      Ok(build) => build,
      Err(e) => return Err(self.stage_failed(Stage::Building, e.into())),
    };

    self.enter(Stage::Packaging)?;
    let manifest = PackageManifest::new(
      ctx,
      &config.package.staging_dir,
      &build.binary_path,
      &config.project.config_dir,
      &config.package.include,
    );
    let output_dir = ctx.resolve_path(&config.package.output_dir);
    let artifact = match Packager::new(&manifest, &plan.archive, output_dir).package() {
      Ok(artifact) => artifact,
      Err(e) => return Err(self.stage_failed(Stage::Packaging, e.into())),
    };

    self.transition(PipelineState::Done);
    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(artifact = %artifact.file_name, elapsed_ms, "pipeline finished");

    Ok(PipelineReport {
      context: ctx.clone(),
      project: plan.project,
      toolchain: build.toolchain_versions,
      binary: build.binary_path,
      artifact,
      elapsed_ms,
    })
  }

  fn enter(&mut self, stage: Stage) -> Result<(), PipelineError> {
    if self.cancel.is_cancelled() {
      warn!(stage = %stage, "cancellation requested, not starting stage");
      return Err(self.fail(stage, PipelineError::Cancelled { stage }));
    }
    info!(stage = %stage, "entering stage");
    self.transition(stage.into());
    Ok(())
  }

  /// A stage error raised after an interrupt is reported as the cancellation it caused: the
  /// interrupt reaches child processes too, so their failure is not the root cause.
  fn stage_failed(&mut self, stage: Stage, err: PipelineError) -> PipelineError {
    if self.cancel.is_cancelled() {
      warn!(stage = %stage, error = %err, "stage failed after cancellation was requested");
      return self.fail(stage, PipelineError::Cancelled { stage });
    }
    self.fail(stage, err)
  }

  fn fail(&mut self, stage: Stage, err: PipelineError) -> PipelineError {
    error!(stage = %stage, error = %err, "pipeline failed");
    self.transition(PipelineState::Failed(stage));
    err
  }

  fn transition(&mut self, next: PipelineState) {
    self.state = next;
    self.history.push(next);
  }
}
