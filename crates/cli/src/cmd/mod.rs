mod info;
mod plan;
mod run;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use distpipe_lib::config::PipelineConfig;
use distpipe_lib::context::{ContextRequest, OsSource, PipelineContext};
use distpipe_lib::platform::TargetOs;

pub use info::{InfoArgs, cmd_info};
pub use plan::{PlanArgs, cmd_plan};
pub use run::{RunArgs, cmd_run};

/// Flags that select the target and the project, shared by `run` and `plan`.
#[derive(Debug, Args)]
pub struct ContextArgs {
  /// Target operating system (default: CI environment, then host)
  #[arg(long, value_name = "OS")]
  os: Option<TargetOs>,

  /// Release tag embedded in the archive name (default: CI environment)
  #[arg(long, value_name = "TAG")]
  tag: Option<String>,

  /// Project directory
  #[arg(long, value_name = "DIR", default_value = ".")]
  workdir: PathBuf,

  /// Configuration file (default: <workdir>/distpipe.toml if present)
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Timeout for each external command, e.g. `90s` or `45m`
  #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
  timeout: Option<Duration>,
}

impl ContextArgs {
  /// Load the configuration and resolve the pipeline context.
  pub fn resolve(&self) -> Result<(PipelineContext, OsSource, PipelineConfig)> {
    let mut config = PipelineConfig::discover(&self.workdir, self.config.as_deref()).context("Failed to load configuration")?;

    if let Some(timeout) = self.timeout {
      config.exec.timeout = Some(humantime::format_duration(timeout).to_string());
    }

    let request = ContextRequest {
      target_os: self.os,
      version_tag: self.tag.clone(),
      working_directory: self.workdir.clone(),
    };
    let (ctx, source) = PipelineContext::resolve(request, &config.env).context("Failed to resolve pipeline context")?;

    Ok((ctx, source, config))
  }
}
