//! End-to-end pipeline tests against real processes.
//!
//! The toolchain probes and the build are `/bin/sh` scripts, so these run on Unix only.

#![cfg(unix)]

mod scenario_tests;
