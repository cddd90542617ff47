//! Full pipeline runs: success, build failure, determinism and idempotent provisioning.

use std::fs;

use distpipe_lib::context::PipelineContext;
use distpipe_lib::exec::ProcessRunner;
use distpipe_lib::pipeline::{Pipeline, PipelineError, PipelineState, Stage};
use distpipe_lib::platform::TargetOs;
use distpipe_lib::provision::Provisioner;

use super::common::{BUILD_OK, Project, archive_path, sh, tar_entries};

#[tokio::test]
async fn untagged_linux_run_produces_tar_gz() {
  let project = Project::new();
  let ctx = PipelineContext::new(TargetOs::Linux, "", project.path()).unwrap();
  let config = project.config(BUILD_OK);
  let runner = ProcessRunner::default();

  let mut pipeline = Pipeline::new(&ctx, &config, &runner);
  let report = pipeline.run().await.unwrap();

  assert_eq!(pipeline.state(), PipelineState::Done);
  assert_eq!(report.artifact.file_name, "project-linux.tar.gz");
  assert_eq!(report.artifact.path, archive_path(&project, "project-linux.tar.gz"));
  assert_eq!(report.toolchain["sh"], "sh 1.0");

  let entries = tar_entries(&report.artifact.path);
  assert!(entries.contains(&"package/config".to_string()));
  assert!(entries.contains(&"package/config/app.toml".to_string()));
  assert!(entries.contains(&"package/config/certs/ca.pem".to_string()));
  assert!(entries.contains(&"package/project".to_string()));
}

#[tokio::test]
async fn tagged_run_embeds_tag() {
  let project = Project::new();
  let ctx = PipelineContext::new(TargetOs::MacOs, "v2.0.0", project.path()).unwrap();
  let config = project.config(BUILD_OK);
  let runner = ProcessRunner::default();

  let report = Pipeline::new(&ctx, &config, &runner).run().await.unwrap();

  assert_eq!(report.artifact.file_name, "project-macos-v2.0.0.tar.gz");
  assert!(report.artifact.path.is_file());
}

#[tokio::test]
async fn failing_build_leaves_no_staging_or_archive() {
  let project = Project::new();
  let ctx = PipelineContext::new(TargetOs::Linux, "", project.path()).unwrap();
  let config = project.config("echo 'error: linking failed' >&2; exit 1");
  let runner = ProcessRunner::default();

  let mut pipeline = Pipeline::new(&ctx, &config, &runner);
  let err = pipeline.run().await.unwrap_err();

  assert!(matches!(err, PipelineError::Build(_)));
  assert_eq!(err.exit_code(), 20);
  assert!(err.to_string().contains("linking failed"));
  assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Building));
  assert!(!project.path().join("package").exists());
  assert!(!project.path().join("project-linux.tar.gz").exists());
}

#[tokio::test]
async fn build_timeout_is_a_build_failure() {
  let project = Project::new();
  let ctx = PipelineContext::new(TargetOs::Linux, "", project.path()).unwrap();
  let mut config = project.config("sleep 5");
  config.exec.timeout = Some("200ms".to_string());
  let runner = ProcessRunner::new(config.timeout().unwrap());

  let err = Pipeline::new(&ctx, &config, &runner).run().await.unwrap_err();

  assert_eq!(err.stage(), Some(Stage::Building));
  assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn identical_inputs_give_identical_archives() {
  let project = Project::new();
  let ctx = PipelineContext::new(TargetOs::Linux, "", project.path()).unwrap();
  let config = project.config(BUILD_OK);
  let runner = ProcessRunner::default();

  let first = Pipeline::new(&ctx, &config, &runner).run().await.unwrap();
  let first_bytes = fs::read(&first.artifact.path).unwrap();
  // The rebuild rewrites the binary with a fresh mtime
  let second = Pipeline::new(&ctx, &config, &runner).run().await.unwrap();

  assert_eq!(first.artifact.sha256, second.artifact.sha256);
  assert_eq!(first_bytes, fs::read(&second.artifact.path).unwrap());
}

#[tokio::test]
async fn provisioning_twice_succeeds() {
  let project = Project::new();
  let ctx = PipelineContext::new(TargetOs::Linux, "", project.path()).unwrap();
  let config = project.config(BUILD_OK);
  let runner = ProcessRunner::default();
  let provisioner = Provisioner::new(&runner, None, None);

  let first = provisioner.provision(&ctx, &config.toolchain).await.unwrap();
  let second = provisioner.provision(&ctx, &config.toolchain).await.unwrap();

  assert_eq!(first, second);
  assert_eq!(first.versions["sh"], "sh 1.0");
}

#[tokio::test]
async fn missing_tool_aborts_before_build() {
  let project = Project::new();
  let ctx = PipelineContext::new(TargetOs::Linux, "", project.path()).unwrap();
  let mut config = project.config("touch built-marker");
  config.toolchain.push(distpipe_lib::provision::ToolchainRequirement::preinstalled(
    "missing",
    sh("exit 127"),
  ));
  let runner = ProcessRunner::default();

  let err = Pipeline::new(&ctx, &config, &runner).run().await.unwrap_err();

  assert_eq!(err.exit_code(), 10);
  assert!(!project.path().join("built-marker").exists());
}

#[tokio::test]
async fn staging_dir_over_sources_never_deletes_them() {
  let project = Project::new();
  let ctx = PipelineContext::new(TargetOs::Linux, "", project.path()).unwrap();
  let runner = ProcessRunner::default();

  for staging_dir in ["config", "target"] {
    let mut config = project.config(&format!("{BUILD_OK} && touch built-marker"));
    config.package.staging_dir = staging_dir.into();

    let mut pipeline = Pipeline::new(&ctx, &config, &runner);
    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::Config(_)), "{staging_dir}: {err}");
    assert_eq!(err.exit_code(), 1);
    assert_eq!(pipeline.history(), [PipelineState::Start]);
  }

  assert!(project.path().join("config/app.toml").is_file());
  assert!(project.path().join("config/certs/ca.pem").is_file());
  assert!(!project.path().join("built-marker").exists());
}
