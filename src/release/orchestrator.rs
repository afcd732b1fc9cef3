//! Release orchestrator
//!
//! # Flow
//!
//! ```text
//! Idle -> VersionResolved -> ReleaseCreated -> BuildingAll -> Completed
//!                                                          -> PartiallyFailed
//! ```
//!
//! Version resolution and release creation happen once, before any build.
//! Either failing aborts the run with no pipeline started. After that barrier
//! one pipeline per target runs on a dedicated rayon pool, every instance
//! sharing the same read-only [`ReleaseHandle`]. The parallel iterator's
//! `collect()` is the join: the run waits for every target, and a failing
//! target never cancels its siblings.

use crate::cargo::CheckoutMetadata;
use crate::core::config::{BuildConfig, InstallerConfig, ShipConfig, UploadConfig};
use crate::core::error::{ConfigError, ShipResult};
use crate::core::process::display_command;
use crate::host::{ReleaseHandle, ReleaseHost};
use crate::release::build::{BuildStrategy, Builder, CargoToolchain, Toolchain};
use crate::release::package::{InstallerTool, Packager, PackagingStep};
use crate::release::pipeline::{PipelineResult, Stage, TargetPipeline};
use crate::release::publisher::ReleasePublisher;
use crate::release::summary::RunSummary;
use crate::release::targets::TargetRegistry;
use crate::release::upload::{AssetUploader, raw_asset_name};
use crate::release::version::resolve_version;
use crate::ui::progress::MultiProgress;
use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
  Idle,
  VersionResolved,
  ReleaseCreated,
  BuildingAll,
  Completed,
  PartiallyFailed,
}

/// Settings for one run, after CLI overrides
#[derive(Debug, Clone)]
pub struct RunSettings {
  pub build: BuildConfig,
  pub upload: UploadConfig,
  pub installer: Option<InstallerConfig>,
  /// No progress lines or bars on the terminal (`--json`, tests)
  pub quiet: bool,
}

impl RunSettings {
  pub fn from_config(config: &ShipConfig) -> Self {
    Self {
      build: config.build.clone(),
      upload: config.upload.clone(),
      installer: config.installer(),
      quiet: false,
    }
  }
}

/// External collaborators of a run
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
  pub host: &'a dyn ReleaseHost,
  pub toolchain: &'a dyn Toolchain,
  pub installer: &'a dyn InstallerTool,
}

/// What a run would do for one target (`--dry-run`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTarget {
  pub triple: String,
  pub strategy: BuildStrategy,
  pub command: String,
  pub packaging: PackagingStep,
  pub asset_name: String,
}

/// Dry-run plan for a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPlan {
  pub version: String,
  pub program: String,
  pub targets: Vec<PlannedTarget>,
}

pub struct Orchestrator<'a> {
  registry: &'a TargetRegistry,
  checkout: &'a CheckoutMetadata,
  settings: &'a RunSettings,
  collaborators: Collaborators<'a>,
  state: RunState,
}

impl<'a> Orchestrator<'a> {
  pub fn new(
    registry: &'a TargetRegistry,
    checkout: &'a CheckoutMetadata,
    settings: &'a RunSettings,
    collaborators: Collaborators<'a>,
  ) -> Self {
    Self {
      registry,
      checkout,
      settings,
      collaborators,
      state: RunState::Idle,
    }
  }

  fn say(&self, line: std::fmt::Arguments<'_>) {
    if !self.settings.quiet {
      println!("{}", line);
    }
  }

  fn transition(&mut self, next: RunState) {
    tracing::debug!(from = ?self.state, to = ?next, "run state");
    self.state = next;
  }

  /// Execute a full release run for `reference`.
  ///
  /// Errors are returned only for pre-barrier failures. Target failures are
  /// recorded in the summary, whose state is `PartiallyFailed`.
  pub fn run(&mut self, reference: &str) -> ShipResult<RunSummary> {
    let started_at = Utc::now();

    let version = resolve_version(reference)?;
    self.transition(RunState::VersionResolved);
    self.say(format_args!("🏷️  Releasing {} for {} target(s)", version, self.registry.len()));

    ensure_targets(self.registry, self.settings)?;

    let release = ReleasePublisher::new(self.collaborators.host).create_release(&version)?;
    self.transition(RunState::ReleaseCreated);
    self.say(format_args!("📣 Release {} ready (id {})", release.version_tag, release.release_id));

    self.transition(RunState::BuildingAll);
    let results = self.run_pipelines(&release, &version)?;

    let state = if results.iter().all(|r| r.outcome.is_success()) {
      RunState::Completed
    } else {
      RunState::PartiallyFailed
    };
    self.transition(state);

    Ok(RunSummary {
      version,
      release_id: release.release_id,
      state,
      started_at,
      finished_at: Utc::now(),
      results,
    })
  }

  fn run_pipelines(&self, release: &ReleaseHandle, version: &str) -> ShipResult<Vec<PipelineResult>> {
    let settings = self.settings;
    let builder = Builder::new(self.collaborators.toolchain, self.checkout, &settings.build);
    let packager = Packager::new(
      self.collaborators.installer,
      settings.installer.as_ref(),
      self.checkout,
      version,
    );
    let uploader = AssetUploader::new(
      self.collaborators.host,
      release,
      settings.upload.existing,
      settings.upload.timeout(),
    );
    let pipeline = TargetPipeline::new(
      &builder,
      &packager,
      &uploader,
      settings.installer.as_ref(),
      &self.checkout.program,
      version,
    );

    let targets = self.registry.targets();
    let threads = match settings.build.jobs {
      0 => targets.len(),
      jobs => jobs.min(targets.len()),
    };
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(threads.max(1))
      .thread_name(|i| format!("ship-pipeline-{}", i))
      .build()?;

    tracing::debug!(targets = targets.len(), threads, "starting pipelines");
    self.say(format_args!("🚀 Building {} target(s) in parallel...\n", targets.len()));

    let progress = if settings.quiet {
      MultiProgress::hidden()
    } else {
      MultiProgress::new()
    };
    let total = Stage::ALL.len();
    let bars: Vec<_> = targets.iter().map(|t| progress.add_bar(total, t.triple.clone())).collect();

    let results = pool.install(|| {
      targets
        .par_iter()
        .enumerate()
        .map(|(idx, target)| {
          let bar = bars[idx].as_ref();
          let result = pipeline.run(target, &|_stage: Stage| progress.inc(bar));
          progress.set(bar, total);
          result
        })
        .collect::<Vec<_>>()
    });

    Ok(results)
  }
}

/// Describe a run without touching the hosting service or any toolchain
pub fn plan_run(
  registry: &TargetRegistry,
  checkout: &CheckoutMetadata,
  settings: &RunSettings,
  reference: &str,
) -> ShipResult<RunPlan> {
  let version = resolve_version(reference)?;
  ensure_targets(registry, settings)?;

  let builder = Builder::new(&CargoToolchain, checkout, &settings.build);
  let targets = registry
    .targets()
    .iter()
    .map(|target| {
      let invocation = builder.invocation(target);
      let packaging = PackagingStep::for_target(target);
      let asset_name = match (packaging, &settings.installer) {
        (PackagingStep::Installer, Some(installer)) => installer.asset_name_for(&checkout.program, &target.triple),
        _ => raw_asset_name(&checkout.program, &version, target),
      };
      PlannedTarget {
        triple: target.triple.clone(),
        strategy: invocation.strategy,
        command: display_command(&invocation.command()),
        packaging,
        asset_name,
      }
    })
    .collect();

  Ok(RunPlan {
    version,
    program: checkout.program.clone(),
    targets,
  })
}

fn ensure_targets(registry: &TargetRegistry, settings: &RunSettings) -> ShipResult<()> {
  if registry.is_empty() {
    return Err(
      ConfigError::NoTargets {
        reason: "every target was filtered out".to_string(),
      }
      .into(),
    );
  }
  if let Some(target) = registry.targets().iter().find(|t| t.installer)
    && settings.installer.is_none()
  {
    return Err(
      ConfigError::MissingInstaller {
        triple: target.triple.clone(),
      }
      .into(),
    );
  }
  Ok(())
}
