//! Build executor
//!
//! Compiles one target, natively with `cargo` or through the `cross` shim,
//! and hands back the artifact with its size and SHA-256 digest.

use crate::cargo::CheckoutMetadata;
use crate::core::config::BuildConfig;
use crate::core::error::StageError;
use crate::core::process::{display_command, run_with_timeout};
use crate::release::targets::TargetSpec;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Lines of stderr kept in a failure detail
pub const STDERR_TAIL: usize = 20;

/// How a target is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStrategy {
  /// Host toolchain (`cargo`)
  Native,
  /// Containerized cross-compilation shim (`cross`)
  Cross,
}

impl BuildStrategy {
  pub fn for_target(target: &TargetSpec) -> Self {
    if target.cross { BuildStrategy::Cross } else { BuildStrategy::Native }
  }
}

/// What an artifact file is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  RawBinary,
  Installer,
}

/// Output of a successful build (or packaging) step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
  pub target: TargetSpec,
  pub path: PathBuf,
  pub kind: ArtifactKind,
  pub size_bytes: u64,
  /// Lowercase hex SHA-256 of the file
  pub checksum: String,
}

impl BuildArtifact {
  /// Describe the file at `path`, hashing its contents
  pub fn from_file(target: &TargetSpec, path: &Path, kind: ArtifactKind) -> io::Result<Self> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let size_bytes = io::copy(&mut file, &mut hasher)?;

    Ok(Self {
      target: target.clone(),
      path: path.to_path_buf(),
      kind,
      size_bytes,
      checksum: format!("{:x}", hasher.finalize()),
    })
  }
}

/// Fully resolved toolchain command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
  pub strategy: BuildStrategy,
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  pub timeout: Duration,
}

impl BuildInvocation {
  pub fn command(&self) -> Command {
    let mut cmd = Command::new(&self.program);
    cmd.args(&self.args).current_dir(&self.cwd);
    cmd
  }
}

/// Toolchain collaborator.
///
/// `Err` carries the failure detail shown in the run summary.
pub trait Toolchain: Send + Sync {
  fn compile(&self, invocation: &BuildInvocation) -> Result<(), String>;
}

/// Runs `cargo`/`cross` as child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct CargoToolchain;

impl Toolchain for CargoToolchain {
  fn compile(&self, invocation: &BuildInvocation) -> Result<(), String> {
    let cmd = invocation.command();
    tracing::info!(command = %display_command(&cmd), "invoking toolchain");

    let output = run_with_timeout(cmd, invocation.timeout)
      .map_err(|e| format!("failed to start {}: {}", invocation.program, e))?;

    tracing::debug!(
      program = %invocation.program,
      elapsed_ms = output.elapsed.as_millis() as u64,
      success = output.success(),
      "toolchain finished"
    );

    if output.success() {
      Ok(())
    } else {
      Err(output.failure_detail(invocation.timeout, STDERR_TAIL))
    }
  }
}

/// Builds targets from one checkout
pub struct Builder<'a> {
  toolchain: &'a dyn Toolchain,
  checkout: &'a CheckoutMetadata,
  settings: &'a BuildConfig,
}

impl<'a> Builder<'a> {
  pub fn new(toolchain: &'a dyn Toolchain, checkout: &'a CheckoutMetadata, settings: &'a BuildConfig) -> Self {
    Self {
      toolchain,
      checkout,
      settings,
    }
  }

  /// Command line used for `target`
  pub fn invocation(&self, target: &TargetSpec) -> BuildInvocation {
    let strategy = BuildStrategy::for_target(target);
    let program = match strategy {
      BuildStrategy::Native => self.settings.cargo.clone(),
      BuildStrategy::Cross => self.settings.cross.clone(),
    };

    let args = vec![
      format!("+{}", target.toolchain),
      "build".to_string(),
      "--release".to_string(),
      "--target".to_string(),
      target.triple.clone(),
      "--package".to_string(),
      self.checkout.package.clone(),
      "--bin".to_string(),
      self.checkout.program.clone(),
      "--config".to_string(),
      "profile.release.lto=true".to_string(),
    ];

    BuildInvocation {
      strategy,
      program,
      args,
      cwd: self.checkout.workspace_root.clone(),
      timeout: self.settings.timeout(),
    }
  }

  /// Where the binary for `target` lands
  pub fn binary_path(&self, target: &TargetSpec) -> PathBuf {
    self
      .checkout
      .binary_path(&target.triple, target.platform.exe_suffix())
  }

  /// Compile `target` and describe the produced binary
  pub fn build(&self, target: &TargetSpec) -> Result<BuildArtifact, StageError> {
    let failed = |stderr: String| StageError::BuildFailed {
      triple: target.triple.clone(),
      stderr,
    };

    let invocation = self.invocation(target);
    self.toolchain.compile(&invocation).map_err(failed)?;

    let path = self.binary_path(target);
    if !path.is_file() {
      return Err(failed(format!(
        "toolchain exited successfully but {} does not exist",
        path.display()
      )));
    }

    let artifact = BuildArtifact::from_file(target, &path, ArtifactKind::RawBinary)
      .map_err(|e| failed(format!("cannot read {}: {}", path.display(), e)))?;

    tracing::info!(
      triple = %target.triple,
      size = artifact.size_bytes,
      sha256 = %artifact.checksum,
      "build finished"
    );
    Ok(artifact)
  }
}
