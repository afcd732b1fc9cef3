//! Packager
//!
//! Targets flagged with `installer = true` get their raw binary wrapped in a
//! platform installer by an external generator (`cargo wix` by default).
//! Every other target passes straight through.

use crate::cargo::CheckoutMetadata;
use crate::core::config::InstallerConfig;
use crate::core::error::StageError;
use crate::core::process::{display_command, run_with_timeout};
use crate::release::build::{ArtifactKind, BuildArtifact, STDERR_TAIL};
use crate::release::targets::TargetSpec;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

/// Packaging applied to a target's artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackagingStep {
  /// Upload the raw binary
  Passthrough,
  /// Wrap the binary in an installer image
  Installer,
}

impl PackagingStep {
  pub fn for_target(target: &TargetSpec) -> Self {
    if target.installer {
      PackagingStep::Installer
    } else {
      PackagingStep::Passthrough
    }
  }
}

/// Rendered installer command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerInvocation {
  pub argv: Vec<String>,
  pub output: PathBuf,
  pub cwd: PathBuf,
  pub timeout: Duration,
}

impl InstallerInvocation {
  pub fn command(&self) -> Option<Command> {
    let (program, args) = self.argv.split_first()?;
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(&self.cwd);
    Some(cmd)
  }
}

/// Installer-generator collaborator. `Err` carries the failure detail.
pub trait InstallerTool: Send + Sync {
  fn generate(&self, invocation: &InstallerInvocation) -> Result<(), String>;
}

/// Runs the configured generator command
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandInstaller;

impl InstallerTool for CommandInstaller {
  fn generate(&self, invocation: &InstallerInvocation) -> Result<(), String> {
    let cmd = invocation
      .command()
      .ok_or_else(|| "installer command is empty".to_string())?;
    tracing::info!(command = %display_command(&cmd), "invoking installer generator");

    let program = invocation.argv[0].clone();
    let output = run_with_timeout(cmd, invocation.timeout).map_err(|e| format!("failed to start {}: {}", program, e))?;

    if output.success() {
      Ok(())
    } else {
      Err(output.failure_detail(invocation.timeout, STDERR_TAIL))
    }
  }
}

/// Applies the packaging step for each artifact
pub struct Packager<'a> {
  tool: &'a dyn InstallerTool,
  installer: Option<&'a InstallerConfig>,
  checkout: &'a CheckoutMetadata,
  version: &'a str,
}

impl<'a> Packager<'a> {
  pub fn new(
    tool: &'a dyn InstallerTool,
    installer: Option<&'a InstallerConfig>,
    checkout: &'a CheckoutMetadata,
    version: &'a str,
  ) -> Self {
    Self {
      tool,
      installer,
      checkout,
      version,
    }
  }

  /// Render the generator command for `artifact`
  pub fn invocation(&self, installer: &InstallerConfig, artifact: &BuildArtifact) -> InstallerInvocation {
    let triple = &artifact.target.triple;
    let output = self
      .checkout
      .target_directory
      .join(triple)
      .join("installer")
      .join(installer.output_name_for(&self.checkout.program, triple));
    let descriptor = self.checkout.workspace_root.join(&installer.descriptor);

    let substitute = |arg: &str| {
      arg
        .replace("{binary}", &artifact.path.to_string_lossy())
        .replace("{descriptor}", &descriptor.to_string_lossy())
        .replace("{output}", &output.to_string_lossy())
        .replace("{triple}", triple)
        .replace("{program}", &self.checkout.program)
        .replace("{version}", self.version)
    };

    InstallerInvocation {
      argv: installer.command.iter().map(|a| substitute(a)).collect(),
      output,
      cwd: self.checkout.workspace_root.clone(),
      timeout: installer.timeout(),
    }
  }

  /// Apply the target's packaging step
  pub fn package(&self, artifact: BuildArtifact) -> Result<BuildArtifact, StageError> {
    match PackagingStep::for_target(&artifact.target) {
      PackagingStep::Passthrough => Ok(artifact),
      PackagingStep::Installer => self.wrap(artifact),
    }
  }

  fn wrap(&self, artifact: BuildArtifact) -> Result<BuildArtifact, StageError> {
    let failed = |detail: String| StageError::PackagingFailed {
      triple: artifact.target.triple.clone(),
      detail,
    };

    let installer = self
      .installer
      .ok_or_else(|| failed("no [installer] configured".to_string()))?;
    let invocation = self.invocation(installer, &artifact);

    // A stale image from an earlier run must not pass for fresh output
    if invocation.output.exists() {
      fs::remove_file(&invocation.output)
        .map_err(|e| failed(format!("cannot remove stale {}: {}", invocation.output.display(), e)))?;
    }
    if let Some(parent) = invocation.output.parent() {
      fs::create_dir_all(parent).map_err(|e| failed(format!("cannot create {}: {}", parent.display(), e)))?;
    }

    self.tool.generate(&invocation).map_err(failed)?;

    if !invocation.output.is_file() {
      return Err(failed(format!(
        "installer generator exited successfully but {} does not exist",
        invocation.output.display()
      )));
    }

    let packaged = BuildArtifact::from_file(&artifact.target, &invocation.output, ArtifactKind::Installer)
      .map_err(|e| failed(format!("cannot read {}: {}", invocation.output.display(), e)))?;

    tracing::info!(
      triple = %artifact.target.triple,
      installer = %packaged.path.display(),
      size = packaged.size_bytes,
      "installer generated"
    );
    Ok(packaged)
  }
}
