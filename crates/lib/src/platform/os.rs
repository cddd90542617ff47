use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operating systems a pipeline can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
  Windows,
  Linux,
  MacOs,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown operating system '{0}' (expected windows, linux or macos)")]
pub struct UnknownOsError(pub String);

impl TargetOs {
  pub const ALL: [TargetOs; 3] = [TargetOs::Windows, TargetOs::Linux, TargetOs::MacOs];

  /// Detect the host operating system at runtime
  ///
  /// Returns `None` if the host is not one of the supported targets
  pub fn host() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Parse an OS identifier as CI platforms spell it.
  ///
  /// Accepts `linux`, `windows`, `macos` and the common aliases (`osx`, `darwin`,
  /// `macOS`, `win`), case-insensitively.
  pub fn from_identifier(value: &str) -> Option<Self> {
    match value.trim().to_ascii_lowercase().as_str() {
      "windows" | "win" | "win32" | "win64" => Some(Self::Windows),
      "linux" => Some(Self::Linux),
      "macos" | "osx" | "darwin" | "mac" => Some(Self::MacOs),
      _ => None,
    }
  }

  /// Returns the lowercase identifier used in archive names
  pub const fn as_str(&self) -> &'static str {
    match self {
      Self::Windows => "windows",
      Self::Linux => "linux",
      Self::MacOs => "macos",
    }
  }

  pub const fn is_windows(&self) -> bool {
    matches!(self, Self::Windows)
  }

  /// Suffix appended to executable names on this OS
  pub const fn exe_suffix(&self) -> &'static str {
    match self {
      Self::Windows => ".exe",
      Self::Linux | Self::MacOs => "",
    }
  }
}

impl fmt::Display for TargetOs {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for TargetOs {
  type Err = UnknownOsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::from_identifier(s).ok_or_else(|| UnknownOsError(s.to_string()))
  }
}
