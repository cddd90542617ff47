//! Platform detection.

pub mod os;

pub use os::{TargetOs, UnknownOsError};

/// Returns the host operating system
///
/// Returns `None` if the host is not a supported target
pub fn host_os() -> Option<TargetOs> {
  TargetOs::host()
}
