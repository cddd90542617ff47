use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use distpipe_lib::config::PipelineConfig;
use distpipe_lib::platform::host_os;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct InfoArgs {
  /// Project directory whose configuration names the CI variables
  #[arg(long, value_name = "DIR", default_value = ".")]
  workdir: PathBuf,

  /// Configuration file (default: <workdir>/distpipe.toml if present)
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,
}

pub fn cmd_info(args: InfoArgs) -> Result<()> {
  let config = PipelineConfig::discover(&args.workdir, args.config.as_deref()).context("Failed to load configuration")?;
  let host = host_os();
  let vars: Vec<(String, Option<String>)> = config
    .env
    .os_vars
    .iter()
    .chain(&config.env.tag_vars)
    .map(|var| (var.clone(), std::env::var(var).ok()))
    .collect();

  if args.output.is_json() {
    let vars: serde_json::Map<String, serde_json::Value> =
      vars.into_iter().map(|(k, v)| (k, serde_json::json!(v))).collect();
    return output::print_json(&serde_json::json!({
      "version": env!("CARGO_PKG_VERSION"),
      "host_os": host.map(|os| os.as_str()),
      "environment": vars,
    }));
  }

  output::heading("System");
  match host {
    Some(os) => output::field("Host OS", os.as_str()),
    None => output::field("Host OS", format!("{} (unsupported)", std::env::consts::OS)),
  }
  output::heading("Environment");
  for (var, value) in &vars {
    output::field(var, value.as_deref().unwrap_or("(unset)"));
  }

  Ok(())
}
