//! Stock toolchain for a Rust project with native (LLVM/yasm) dependencies.
//!
//! Windows hosts get the toolchain through Chocolatey, falling back to the MSYS2 package
//! manager for packages Chocolatey cannot install. POSIX hosts are expected to have
//! everything preinstalled.

use std::path::PathBuf;

use crate::exec::CommandSpec;
use crate::platform::TargetOs;

use super::types::{PackageManagerSpec, ToolchainRequirement};

/// Execution policy the bootstrap runs under. Process-scoped, so nothing persists
/// past the bootstrap's own PowerShell session.
pub const BOOTSTRAP_EXECUTION_POLICY: &str = "RemoteSigned";

const CHOCOLATEY_INSTALL_SCRIPT: &str = "Set-ExecutionPolicy RemoteSigned -Scope Process -Force; \
  [System.Net.ServicePointManager]::SecurityProtocol = [System.Net.ServicePointManager]::SecurityProtocol -bor 3072; \
  iex ((New-Object System.Net.WebClient).DownloadString('https://community.chocolatey.org/install.ps1'))";

const MSYS2_ROOT: &str = r"C:\tools\msys64";

fn msys2_dir(sub: &str) -> PathBuf {
  PathBuf::from(format!(r"{}\{}", MSYS2_ROOT, sub))
}

/// Chocolatey, bootstrapped through PowerShell when missing.
pub fn chocolatey() -> PackageManagerSpec {
  PackageManagerSpec {
    name: "chocolatey".to_string(),
    probe: CommandSpec::new("choco").arg("--version"),
    install: CommandSpec::new("choco").args(["install", "{package}", "--yes", "--no-progress"]),
    path_entries: vec![PathBuf::from(r"C:\ProgramData\chocolatey\bin")],
    already_installed_markers: vec!["already installed".to_string()],
    bootstrap: Some(CommandSpec::new("powershell.exe").args([
      "-NoProfile",
      "-NonInteractive",
      "-ExecutionPolicy",
      BOOTSTRAP_EXECUTION_POLICY,
      "-Command",
      CHOCOLATEY_INSTALL_SCRIPT,
    ])),
  }
}

/// The MSYS2 `pacman`, available once the `msys2` requirement is installed.
pub fn msys2_pacman() -> PackageManagerSpec {
  PackageManagerSpec {
    name: "msys2-pacman".to_string(),
    probe: CommandSpec::new("pacman").arg("--version"),
    install: CommandSpec::new("pacman").args(["-S", "--needed", "--noconfirm", "{package}"]),
    path_entries: vec![msys2_dir(r"usr\bin")],
    already_installed_markers: vec!["is up to date -- skipping".to_string(), "there is nothing to do".to_string()],
    bootstrap: None,
  }
}

/// The default requirement set, in install order.
///
/// `msys2` precedes `yasm` so the secondary package manager is on the path if the
/// primary cannot provide `yasm`.
pub fn default_requirements() -> Vec<ToolchainRequirement> {
  let windows = vec![TargetOs::Windows];

  vec![
    ToolchainRequirement {
      platforms: windows.clone(),
      ..ToolchainRequirement::preinstalled("choco", CommandSpec::new("choco").arg("--version"))
    },
    ToolchainRequirement {
      name: "llvm".to_string(),
      probe: CommandSpec::new("clang").arg("--version"),
      package: Some("llvm".to_string()),
      fallback_package: None,
      path_entries: vec![PathBuf::from(r"C:\Program Files\LLVM\bin")],
      platforms: windows.clone(),
    },
    ToolchainRequirement {
      name: "msys2".to_string(),
      probe: CommandSpec::new("bash").arg("--version"),
      package: Some("msys2".to_string()),
      fallback_package: None,
      path_entries: vec![msys2_dir(r"usr\bin")],
      platforms: windows.clone(),
    },
    ToolchainRequirement {
      name: "yasm".to_string(),
      probe: CommandSpec::new("yasm").arg("--version"),
      package: Some("yasm".to_string()),
      fallback_package: Some("mingw-w64-x86_64-yasm".to_string()),
      path_entries: vec![msys2_dir(r"mingw64\bin")],
      platforms: windows,
    },
    ToolchainRequirement::preinstalled("rustc", CommandSpec::new("rustc").arg("--version")),
    ToolchainRequirement::preinstalled("cargo", CommandSpec::new("cargo").arg("--version")),
  ]
}
