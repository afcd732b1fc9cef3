//! `cargo ship targets`: list the target registry

use crate::core::context::ShipContext;
use crate::core::error::ShipResult;
use crate::release::Platform;
use crate::release::build::BuildStrategy;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct TargetRow<'a> {
  triple: &'a str,
  platform: Platform,
  toolchain: &'a str,
  strategy: BuildStrategy,
  installer: bool,
  runs_here: bool,
}

/// Print every registered target
pub fn run_targets(source: &Path, json: bool) -> ShipResult<()> {
  let ctx = ShipContext::build(source)?;
  let here = Platform::current();

  let rows: Vec<TargetRow> = ctx
    .registry
    .targets()
    .iter()
    .map(|t| TargetRow {
      triple: &t.triple,
      platform: t.platform,
      toolchain: &t.toolchain,
      strategy: BuildStrategy::for_target(t),
      installer: t.installer,
      runs_here: here.is_some_and(|h| t.runs_on(h)),
    })
    .collect();

  if json {
    println!("{}", serde_json::to_string_pretty(&rows)?);
    return Ok(());
  }

  let origin = if ctx.config.targets.is_empty() {
    "built-in registry"
  } else {
    "ship.toml"
  };
  println!("🎯 {} target(s) from {}", rows.len(), origin);
  println!();
  for row in &rows {
    let mut notes = Vec::new();
    if matches!(row.strategy, BuildStrategy::Cross) {
      notes.push("cross");
    }
    if row.installer {
      notes.push("installer");
    }
    if !row.runs_here {
      notes.push("not buildable here");
    }
    let notes = if notes.is_empty() {
      String::new()
    } else {
      format!(" ({})", notes.join(", "))
    };
    println!(
      "  {:<34} {:<8} +{}{}",
      row.triple, row.platform, row.toolchain, notes
    );
  }

  if ctx.registry.needs_installer()
    && let Some(installer) = ctx.config.installer()
  {
    println!();
    println!("📦 Installer: {}", installer.command.join(" "));
  }

  Ok(())
}
