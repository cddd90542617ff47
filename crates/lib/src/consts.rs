/// Configuration file looked up in the working directory when no explicit path is given.
pub const CONFIG_FILENAME: &str = "distpipe.toml";

pub const DEFAULT_CONFIG_DIR: &str = "config";
pub const DEFAULT_STAGING_DIR: &str = "package";
pub const DEFAULT_BINARY_DIR: &str = "target/release";

/// Environment variables carrying the CI host's OS name, checked in order.
pub const DEFAULT_OS_VARS: &[&str] = &["TRAVIS_OS_NAME", "RUNNER_OS"];

/// Environment variables carrying the release tag, checked in order.
pub const DEFAULT_TAG_VARS: &[&str] = &["TRAVIS_TAG"];

/// Modification time written for every archive entry.
/// Value is 315532800 = January 1, 1980 00:00:00 UTC (ZIP epoch)
pub const ARCHIVE_EPOCH: u64 = 315532800;

/// Number of trailing diagnostic lines kept when a build fails.
pub const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// Placeholder substituted with the package id in install commands.
pub const PACKAGE_PLACEHOLDER: &str = "{package}";
