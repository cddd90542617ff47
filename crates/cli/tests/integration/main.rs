//! CLI integration tests: full `run`, `plan` and `info` invocations against a scratch project.
//!
//! Builds and probes are `/bin/sh` scripts, so these run on Unix only.

#![cfg(unix)]

mod common;
mod info_tests;
mod plan_tests;
mod run_tests;
