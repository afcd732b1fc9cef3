//! Per-target pipeline: Build -> (Package) -> Upload
//!
//! Single pass and strictly gated. A stage runs only when the previous one
//! succeeded, so an artifact that needed an installer is never uploaded raw.
//! Failures are captured in the [`PipelineResult`] and never propagated.

use crate::core::config::InstallerConfig;
use crate::core::error::StageError;
use crate::host::{UploadDisposition, UploadReceipt};
use crate::release::build::{ArtifactKind, BuildArtifact, Builder};
use crate::release::package::Packager;
use crate::release::targets::TargetSpec;
use crate::release::upload::{AssetUploader, asset_name};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Terminal outcome of one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Success,
  BuildFailed,
  PackageFailed,
  UploadFailed,
}

impl Outcome {
  pub fn is_success(self) -> bool {
    self == Outcome::Success
  }
}

impl fmt::Display for Outcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Outcome::Success => "success",
      Outcome::BuildFailed => "build failed",
      Outcome::PackageFailed => "package failed",
      Outcome::UploadFailed => "upload failed",
    };
    f.write_str(s)
  }
}

/// Pipeline stage, reported as each one completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Build,
  Package,
  Upload,
}

impl Stage {
  /// Stages every target passes through (packaging may be a passthrough)
  pub const ALL: [Stage; 3] = [Stage::Build, Stage::Package, Stage::Upload];
}

/// Asset that ended up on the release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
  pub name: String,
  pub kind: ArtifactKind,
  pub size_bytes: u64,
  /// SHA-256 of the local artifact
  pub checksum: String,
  pub disposition: UploadDisposition,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub download_url: Option<String>,
}

impl UploadedAsset {
  fn new(artifact: &BuildArtifact, receipt: UploadReceipt) -> Self {
    Self {
      name: receipt.asset_name,
      kind: artifact.kind,
      size_bytes: receipt.size_bytes,
      checksum: artifact.checksum.clone(),
      disposition: receipt.disposition,
      download_url: receipt.download_url,
    }
  }
}

/// Result of one pipeline instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
  pub target: TargetSpec,
  pub outcome: Outcome,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_detail: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub asset: Option<UploadedAsset>,
  pub elapsed_ms: u64,
}

impl PipelineResult {
  fn succeeded(target: &TargetSpec, asset: UploadedAsset, started: Instant) -> Self {
    Self {
      target: target.clone(),
      outcome: Outcome::Success,
      error_detail: None,
      asset: Some(asset),
      elapsed_ms: started.elapsed().as_millis() as u64,
    }
  }

  fn failed(target: &TargetSpec, err: StageError, started: Instant) -> Self {
    let outcome = match err {
      StageError::BuildFailed { .. } => Outcome::BuildFailed,
      StageError::PackagingFailed { .. } => Outcome::PackageFailed,
      StageError::UploadFailed { .. } => Outcome::UploadFailed,
    };
    Self {
      target: target.clone(),
      outcome,
      error_detail: Some(err.detail().to_string()),
      asset: None,
      elapsed_ms: started.elapsed().as_millis() as u64,
    }
  }
}

/// Stage executors shared by every pipeline instance of a run
pub struct TargetPipeline<'a> {
  builder: &'a Builder<'a>,
  packager: &'a Packager<'a>,
  uploader: &'a AssetUploader<'a>,
  installer: Option<&'a InstallerConfig>,
  program: &'a str,
  version: &'a str,
}

impl<'a> TargetPipeline<'a> {
  pub fn new(
    builder: &'a Builder<'a>,
    packager: &'a Packager<'a>,
    uploader: &'a AssetUploader<'a>,
    installer: Option<&'a InstallerConfig>,
    program: &'a str,
    version: &'a str,
  ) -> Self {
    Self {
      builder,
      packager,
      uploader,
      installer,
      program,
      version,
    }
  }

  /// Run every stage for `target`. `on_stage` fires after each completed stage.
  pub fn run(&self, target: &TargetSpec, on_stage: &dyn Fn(Stage)) -> PipelineResult {
    let started = Instant::now();
    let span = tracing::info_span!("pipeline", triple = %target.triple);
    let _guard = span.enter();

    match self.stages(target, on_stage) {
      Ok(asset) => PipelineResult::succeeded(target, asset, started),
      Err(err) => {
        tracing::warn!(error = %err, "pipeline stopped");
        PipelineResult::failed(target, err, started)
      }
    }
  }

  fn stages(&self, target: &TargetSpec, on_stage: &dyn Fn(Stage)) -> Result<UploadedAsset, StageError> {
    let artifact = self.builder.build(target)?;
    on_stage(Stage::Build);

    let artifact = self.packager.package(artifact)?;
    on_stage(Stage::Package);

    let name = asset_name(self.program, self.version, &artifact, self.installer);
    let receipt = self.uploader.upload(&artifact, &name)?;
    on_stage(Stage::Upload);

    Ok(UploadedAsset::new(&artifact, receipt))
  }
}
