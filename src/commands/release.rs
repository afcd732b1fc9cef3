//! `cargo ship release`
//!
//! Resolve the version, publish the release, then build, package and upload
//! every selected target. Exits non-zero when any target did not succeed.

use crate::core::context::ShipContext;
use crate::core::config::ExistingAssetPolicy;
use crate::core::error::{ConfigError, ShipError, ShipResult};
use crate::core::vcs::SystemGit;
use crate::host::GitHubHost;
use crate::release::orchestrator::{RunPlan, plan_run};
use crate::release::{
  CargoToolchain, Collaborators, CommandInstaller, Orchestrator, Platform, RunSettings, RunSummary, TargetRegistry,
  resolve_version,
};
use std::env;
use std::path::PathBuf;

/// Environment variable CI systems use for the triggering ref
pub const REF_ENV: &str = "GITHUB_REF";

/// Flags of `cargo ship release`
#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
  pub reference: Option<String>,
  pub source: Option<PathBuf>,
  pub only: Vec<String>,
  pub local_only: bool,
  pub retry_failed: Option<PathBuf>,
  pub overwrite: bool,
  pub build_timeout: Option<u64>,
  pub upload_timeout: Option<u64>,
  pub jobs: Option<usize>,
  pub sync_submodules: bool,
  pub dry_run: bool,
  pub json: bool,
  pub summary: Option<PathBuf>,
}

/// Trigger ref from the argument, falling back to `$GITHUB_REF`
pub fn reference_or_env(reference: Option<String>) -> ShipResult<String> {
  reference.or_else(|| env::var(REF_ENV).ok()).ok_or_else(|| {
    ShipError::with_help(
      "No release ref given",
      format!("Pass a ref such as refs/tags/v1.2.3, or set {}.", REF_ENV),
    )
  })
}

/// Run the release command
pub fn run_release(options: ReleaseOptions) -> ShipResult<()> {
  // A bad ref fails before any config, checkout, git or host work
  let reference = reference_or_env(options.reference.clone())?;
  let version = resolve_version(&reference)?;

  let source = match &options.source {
    Some(dir) => dir.clone(),
    None => env::current_dir()?,
  };
  let ctx = ShipContext::build(&source)?;

  let Some(registry) = select_targets(&ctx.registry, &options, &version)? else {
    return Ok(());
  };

  let mut settings = RunSettings::from_config(&ctx.config);
  if let Some(secs) = options.build_timeout {
    settings.build.timeout_secs = secs;
  }
  if let Some(secs) = options.upload_timeout {
    settings.upload.timeout_secs = secs;
  }
  if let Some(jobs) = options.jobs {
    settings.build.jobs = jobs;
  }
  if options.overwrite {
    settings.upload.existing = ExistingAssetPolicy::Overwrite;
  }
  settings.quiet = options.json;
  if settings.build.timeout_secs == 0 || settings.upload.timeout_secs == 0 {
    return Err(
      ConfigError::InvalidField {
        field: "--build-timeout/--upload-timeout".to_string(),
        reason: "must be greater than zero".to_string(),
      }
      .into(),
    );
  }

  if options.dry_run {
    let checkout = ctx.checkout_or_synthetic();
    let plan = plan_run(&registry, &checkout, &settings, &reference)?;
    if options.json {
      println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
      print_plan(&plan);
    }
    return Ok(());
  }

  match SystemGit::open(&ctx.root) {
    Ok(repo) => {
      if options.sync_submodules && repo.has_submodules() {
        if !options.json {
          println!("🔄 Synchronizing submodules...");
        }
        repo.update_submodules()?;
      }
      if let Ok(head) = repo.head_commit() {
        tracing::info!(commit = %head, "releasing checkout");
      }
    }
    Err(err) if options.sync_submodules => return Err(err),
    Err(err) => tracing::debug!(error = %err, "source is not a git checkout"),
  }

  let checkout = ctx.checkout()?;
  let host = GitHubHost::from_env(&ctx.config.host.api_url, ctx.config.host.repository.as_deref())?;
  let collaborators = Collaborators {
    host: &host,
    toolchain: &CargoToolchain,
    installer: &CommandInstaller,
  };

  let summary = Orchestrator::new(&registry, &checkout, &settings, collaborators).run(&reference)?;

  if let Some(path) = &options.summary {
    summary.write(path)?;
  }
  if options.json {
    println!("{}", summary.to_json()?);
  } else {
    summary.print();
  }

  if summary.is_complete() {
    Ok(())
  } else {
    Err(ShipError::TargetsFailed {
      version: summary.version.clone(),
      failed: summary.failed_triples(),
      total: summary.results.len(),
    })
  }
}

/// Apply `--retry-failed`, `--only` and `--local-only`.
/// `None` means a retry found nothing left to do.
fn select_targets(
  registry: &TargetRegistry,
  options: &ReleaseOptions,
  version: &str,
) -> ShipResult<Option<TargetRegistry>> {
  let mut selected = registry.clone();

  if let Some(path) = &options.retry_failed {
    let previous = RunSummary::load(path)?;
    if previous.version != version {
      return Err(ShipError::with_help(
        format!(
          "{} records a run of {}, not {}",
          path.display(),
          previous.version,
          version
        ),
        format!(
          "Retry with refs/tags/{}, or drop --retry-failed to release {} in full.",
          previous.version, version
        ),
      ));
    }
    let failed = previous.failed_triples();
    if failed.is_empty() {
      if !options.json {
        println!("✅ Every target of {} succeeded, nothing to retry", previous.version);
      }
      return Ok(None);
    }
    if !options.json {
      println!("🔁 Retrying {} failed target(s) from {}", failed.len(), path.display());
    }
    selected = selected.select(&failed)?;
  }

  if !options.only.is_empty() {
    selected = selected.select(&options.only)?;
  }

  if options.local_only {
    let host = Platform::current().ok_or_else(|| {
      ShipError::message(format!("--local-only is not supported on {}", env::consts::OS))
    })?;
    selected = selected.runnable_on(host);
  }

  if selected.is_empty() {
    return Err(
      ConfigError::NoTargets {
        reason: "no registered target matches the selection".to_string(),
      }
      .into(),
    );
  }

  Ok(Some(selected))
}

fn print_plan(plan: &RunPlan) {
  println!("🔍 Dry-run: release {} of {}", plan.version, plan.program);
  println!();
  for target in &plan.targets {
    println!("  📦 {}", target.triple);
    println!("     build:   {}", target.command);
    println!("     package: {:?}", target.packaging);
    println!("     asset:   {}", target.asset_name);
  }
  println!();
  println!("No release created, nothing built.");
}
