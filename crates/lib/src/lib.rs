//! distpipe-lib: build-and-release pipeline for native projects
//!
//! This crate provides the stages of a release pipeline and the orchestrator that runs them:
//! - `provision`: makes the required toolchain available and records tool versions
//! - `build`: runs the project's release build with the provisioned toolchain
//! - `package`: stages the build output and writes a versioned, OS-specific archive
//! - `pipeline`: sequences the stages with fail-fast semantics

pub mod build;
pub mod config;
pub mod consts;
pub mod context;
pub mod exec;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod provision;
pub mod util;
