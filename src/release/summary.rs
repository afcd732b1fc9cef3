//! Run summary
//!
//! Every target of a run is listed with its outcome. The summary prints as
//! text, serializes to JSON (`--json`, `--summary <file>`), and is read back
//! by `--retry-failed` to re-run only what did not succeed.

use crate::core::error::{ShipError, ShipResult, ResultExt};
use crate::host::UploadDisposition;
use crate::release::orchestrator::RunState;
use crate::release::pipeline::PipelineResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Aggregated result of a release run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
  pub version: String,
  pub release_id: u64,
  pub state: RunState,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub results: Vec<PipelineResult>,
}

impl RunSummary {
  /// Triples whose outcome is not `Success`, in registry order
  pub fn failed_triples(&self) -> Vec<String> {
    self
      .results
      .iter()
      .filter(|r| !r.outcome.is_success())
      .map(|r| r.target.triple.clone())
      .collect()
  }

  pub fn success_count(&self) -> usize {
    self.results.iter().filter(|r| r.outcome.is_success()).count()
  }

  pub fn is_complete(&self) -> bool {
    self.state == RunState::Completed
  }

  pub fn to_json(&self) -> ShipResult<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  /// Write the JSON summary to `path`
  pub fn write(&self, path: &Path) -> ShipResult<()> {
    let json = self.to_json()?;
    fs::write(path, json).with_context(|| format!("Failed to write run summary to {}", path.display()))
  }

  /// Read a summary written by an earlier run
  pub fn load(path: &Path) -> ShipResult<Self> {
    let content =
      fs::read_to_string(path).with_context(|| format!("Failed to read run summary from {}", path.display()))?;
    serde_json::from_str(&content).map_err(|e| {
      ShipError::with_help(
        format!("{} is not a cargo-ship run summary: {}", path.display(), e),
        "Pass the file written by `cargo ship release --summary <FILE>`.",
      )
    })
  }

  /// Command that re-runs only the failed triples, if any failed
  pub fn retry_command(&self) -> Option<String> {
    let failed = self.failed_triples();
    if failed.is_empty() {
      return None;
    }
    Some(format!(
      "cargo ship release refs/tags/{} --only {}",
      self.version,
      failed.join(",")
    ))
  }

  /// Human-readable summary on stdout
  pub fn print(&self) {
    println!();
    println!("📦 Release {} (id {})", self.version, self.release_id);
    println!();

    for result in &self.results {
      let icon = if result.outcome.is_success() { "✅" } else { "❌" };
      match (&result.asset, &result.error_detail) {
        (Some(asset), _) => {
          let note = match asset.disposition {
            UploadDisposition::Uploaded => "",
            UploadDisposition::Replaced => " (replaced)",
            UploadDisposition::AlreadyPresent => " (already present)",
          };
          println!(
            "  {} {:<34} {}{}",
            icon, result.target.triple, asset.name, note
          );
          println!("       {} bytes  sha256:{}", asset.size_bytes, asset.checksum);
        }
        (None, detail) => {
          println!("  {} {:<34} {}", icon, result.target.triple, result.outcome);
          if let Some(detail) = detail {
            for line in detail.lines() {
              println!("       {}", line);
            }
          }
        }
      }
    }

    println!();
    let elapsed = (self.finished_at - self.started_at).num_seconds();
    match self.state {
      RunState::Completed => println!(
        "🎉 {} target(s) released in {}s",
        self.results.len(),
        elapsed
      ),
      _ => println!(
        "⚠️  {} of {} target(s) succeeded in {}s",
        self.success_count(),
        self.results.len(),
        elapsed
      ),
    }
    if let Some(retry) = self.retry_command() {
      println!("   Retry the failures: {}", retry);
    }
  }
}
