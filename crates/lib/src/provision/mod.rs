//! Dependency provisioning.
//!
//! Makes every applicable [`ToolchainRequirement`] resolvable and records its version.
//! On Windows targets missing tools are installed through the primary package manager
//! (bootstrapped if absent), falling back to the secondary one. POSIX targets are assumed
//! to be provisioned by the host, so only the version probes run there.
//!
//! Provisioning is idempotent: a tool whose probe already succeeds is never reinstalled,
//! and install output reporting an existing package counts as success.

pub mod defaults;
pub mod types;

use tracing::{debug, info, warn};

use crate::context::PipelineContext;
use crate::exec::{CommandRunner, CommandSpec, ExecEnv, describe_exit};

pub use defaults::{BOOTSTRAP_EXECUTION_POLICY, chocolatey, default_requirements, msys2_pacman};
pub use types::{PackageManagerSpec, ProvisioningError, Toolchain, ToolchainRequirement};

enum InstallOutcome {
  Installed,
  Failed { cmd: String, reason: String },
}

pub struct Provisioner<'a, R: CommandRunner> {
  runner: &'a R,
  primary: Option<&'a PackageManagerSpec>,
  secondary: Option<&'a PackageManagerSpec>,
}

impl<'a, R: CommandRunner> Provisioner<'a, R> {
  pub fn new(runner: &'a R, primary: Option<&'a PackageManagerSpec>, secondary: Option<&'a PackageManagerSpec>) -> Self {
    Self {
      runner,
      primary,
      secondary,
    }
  }

  /// Ensure every requirement applying to the context's target OS is usable.
  ///
  /// Requirements are processed in order. Returns the detected versions and the scoped
  /// environment that later stages must use.
  pub async fn provision(
    &self,
    ctx: &PipelineContext,
    requirements: &[ToolchainRequirement],
  ) -> Result<Toolchain, ProvisioningError> {
    let os = ctx.target_os();
    let applicable: Vec<&ToolchainRequirement> = requirements.iter().filter(|r| r.applies_to(os)).collect();

    info!(os = %os, tools = applicable.len(), "provisioning toolchain");

    let mut env = ExecEnv::default();

    if os.is_windows() {
      if let Some(primary) = self.primary {
        add_paths(&mut env, &primary.path_entries);
        self.ensure_manager(primary, ctx, &env).await?;
      }
      if let Some(secondary) = self.secondary {
        add_paths(&mut env, &secondary.path_entries);
      }

      for req in &applicable {
        add_paths(&mut env, &req.path_entries);
        self.install(req, ctx, &env).await?;
      }
    } else {
      debug!(os = %os, "posix target, toolchain is expected to be preinstalled");
      for req in &applicable {
        add_paths(&mut env, &req.path_entries);
      }
    }

    let mut toolchain = Toolchain {
      versions: Default::default(),
      env,
    };

    for req in applicable {
      let version = self.probe_version(req, ctx, &toolchain.env).await?;
      info!(tool = %req.name, version = %version, "tool available");
      toolchain.versions.insert(req.name.clone(), version);
    }

    Ok(toolchain)
  }

  /// Make sure the primary package manager answers its probe, bootstrapping it if not.
  async fn ensure_manager(
    &self,
    manager: &PackageManagerSpec,
    ctx: &PipelineContext,
    env: &ExecEnv,
  ) -> Result<(), ProvisioningError> {
    if self.is_usable(&manager.probe, ctx, env).await {
      debug!(manager = %manager.name, "package manager present");
      return Ok(());
    }

    let Some(bootstrap) = &manager.bootstrap else {
      return Err(ProvisioningError::Bootstrap {
        manager: manager.name.clone(),
        message: "not found and no bootstrap command is configured".to_string(),
      });
    };

    info!(
      manager = %manager.name,
      execution_policy = defaults::BOOTSTRAP_EXECUTION_POLICY,
      scope = "process",
      "bootstrapping package manager"
    );

    match self.runner.run(bootstrap, ctx.working_directory(), env).await {
      Ok(out) if out.success() => {}
      Ok(out) => {
        return Err(ProvisioningError::Bootstrap {
          manager: manager.name.clone(),
          message: format!("bootstrap exited with {}", describe_exit(out.code)),
        });
      }
      Err(e) => {
        return Err(ProvisioningError::Bootstrap {
          manager: manager.name.clone(),
          message: e.to_string(),
        });
      }
    }

    if !self.is_usable(&manager.probe, ctx, env).await {
      return Err(ProvisioningError::Bootstrap {
        manager: manager.name.clone(),
        message: format!("`{}` still fails after bootstrap", manager.probe),
      });
    }

    info!(manager = %manager.name, "package manager bootstrapped");
    Ok(())
  }

  async fn install(
    &self,
    req: &ToolchainRequirement,
    ctx: &PipelineContext,
    env: &ExecEnv,
  ) -> Result<(), ProvisioningError> {
    let Some(package) = &req.package else {
      return Ok(());
    };

    if self.is_usable(&req.probe, ctx, env).await {
      info!(tool = %req.name, "already present, skipping install");
      return Ok(());
    }

    let mut last_failure = None;

    if let Some(primary) = self.primary {
      match self.install_with(primary, package, req, ctx, env).await {
        InstallOutcome::Installed => return Ok(()),
        InstallOutcome::Failed { cmd, reason } => {
          warn!(tool = %req.name, manager = %primary.name, cmd = %cmd, reason = %reason, "install failed");
          last_failure = Some((cmd, reason));
        }
      }
    }

    if let (Some(fallback), Some(secondary)) = (&req.fallback_package, self.secondary) {
      info!(tool = %req.name, manager = %secondary.name, package = %fallback, "falling back to secondary package manager");
      match self.install_with(secondary, fallback, req, ctx, env).await {
        InstallOutcome::Installed => return Ok(()),
        InstallOutcome::Failed { cmd, reason } => {
          warn!(tool = %req.name, manager = %secondary.name, cmd = %cmd, reason = %reason, "install failed");
          last_failure = Some((cmd, reason));
        }
      }
    }

    let (cmd, reason) = last_failure.unwrap_or_else(|| (String::new(), "no package manager configured".to_string()));
    Err(ProvisioningError::Install {
      tool: req.name.clone(),
      cmd,
      reason,
    })
  }

  async fn install_with(
    &self,
    manager: &PackageManagerSpec,
    package: &str,
    req: &ToolchainRequirement,
    ctx: &PipelineContext,
    env: &ExecEnv,
  ) -> InstallOutcome {
    let cmd = manager.install_command(package);
    info!(tool = %req.name, manager = %manager.name, package = %package, "installing");

    match self.runner.run(&cmd, ctx.working_directory(), env).await {
      Ok(out) if manager.install_succeeded(&out) => {
        if !out.success() {
          debug!(tool = %req.name, "package manager reports package already installed");
        }
        InstallOutcome::Installed
      }
      Ok(out) => InstallOutcome::Failed {
        cmd: cmd.to_string(),
        reason: format!("exited with {}", describe_exit(out.code)),
      },
      Err(e) => InstallOutcome::Failed {
        cmd: cmd.to_string(),
        reason: e.to_string(),
      },
    }
  }

  async fn probe_version(
    &self,
    req: &ToolchainRequirement,
    ctx: &PipelineContext,
    env: &ExecEnv,
  ) -> Result<String, ProvisioningError> {
    let failure = |reason: String| ProvisioningError::VersionProbe {
      tool: req.name.clone(),
      cmd: req.probe.to_string(),
      reason,
    };

    let out = self
      .runner
      .run(&req.probe, ctx.working_directory(), env)
      .await
      .map_err(|e| failure(e.to_string()))?;

    if !out.success() {
      return Err(failure(format!("exited with {}", describe_exit(out.code))));
    }

    out
      .first_line()
      .map(str::to_string)
      .ok_or_else(|| failure("printed no version".to_string()))
  }

  async fn is_usable(&self, probe: &CommandSpec, ctx: &PipelineContext, env: &ExecEnv) -> bool {
    matches!(self.runner.run(probe, ctx.working_directory(), env).await, Ok(out) if out.success())
  }
}

fn add_paths(env: &mut ExecEnv, entries: &[std::path::PathBuf]) {
  for entry in entries {
    env.push_path(entry);
  }
}
