//! Tests for the `release` command
//!
//! These never reach a real hosting service: dry runs stop before the
//! release is created, and the failure cases stop earlier still.

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_release_dry_run_plan() -> Result<()> {
  let checkout = TestCheckout::with_package("demo-app")?;

  let output = run_cargo_ship(
    &checkout.path,
    &["ship", "release", "refs/tags/v1.4.0", "--dry-run", "--json"],
  )?;
  let plan: serde_json::Value = serde_json::from_str(&stdout(&output))?;

  assert_eq!(plan["version"], "v1.4.0");
  assert_eq!(plan["program"], "demo-app");

  let targets = plan["targets"].as_array().expect("planned targets");
  assert_eq!(targets.len(), 6);
  assert_eq!(targets[0]["asset_name"], "demo-app-v1.4.0-x86_64-unknown-linux-gnu");
  assert_eq!(targets[0]["packaging"], "passthrough");
  assert!(
    targets[0]["command"]
      .as_str()
      .is_some_and(|c| c.contains("--target x86_64-unknown-linux-gnu"))
  );

  let windows = &targets[5];
  assert_eq!(windows["triple"], "x86_64-pc-windows-msvc");
  assert_eq!(windows["packaging"], "installer");
  assert_eq!(windows["asset_name"], "demo-app-installer.msi");

  // Nothing was built
  assert!(!checkout.file_exists("target"));

  Ok(())
}

#[test]
fn test_release_dry_run_only_filter() -> Result<()> {
  let checkout = TestCheckout::with_package("demo-app")?;

  let output = run_cargo_ship(
    &checkout.path,
    &[
      "ship",
      "release",
      "refs/tags/v1.4.0",
      "--dry-run",
      "--json",
      "--only",
      "x86_64-apple-darwin,aarch64-unknown-linux-gnu",
    ],
  )?;
  let plan: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  let triples: Vec<&str> = plan["targets"]
    .as_array()
    .expect("planned targets")
    .iter()
    .filter_map(|t| t["triple"].as_str())
    .collect();

  // Registry order, not argument order
  assert_eq!(triples, vec!["aarch64-unknown-linux-gnu", "x86_64-apple-darwin"]);

  Ok(())
}

#[test]
fn test_release_dry_run_without_manifest_uses_config_name() -> Result<()> {
  let checkout = TestCheckout::empty()?;
  checkout.write_config(
    r#"
[program]
name = "tool"

[[targets]]
platform = "linux"
triple = "x86_64-unknown-linux-gnu"
"#,
  )?;

  let output = run_cargo_ship(&checkout.path, &["ship", "release", "refs/tags/v3.0.0", "--dry-run"])?;
  let text = stdout(&output);
  assert!(text.contains("tool-v3.0.0-x86_64-unknown-linux-gnu"));
  assert!(text.contains("No release created"));

  Ok(())
}

#[test]
fn test_release_invalid_ref_fails_before_anything() -> Result<()> {
  let checkout = TestCheckout::with_package("demo-app")?;

  let output = run_cargo_ship_raw(&checkout.path, &["ship", "release", "refs/heads/feature"])?;
  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("refs/heads/feature"));
  // Reported before the host is configured, so no repository complaint
  assert!(!err.contains("GITHUB_REPOSITORY"));
  assert!(!checkout.file_exists("target"));

  Ok(())
}

#[test]
fn test_release_unknown_only_triple() -> Result<()> {
  let checkout = TestCheckout::with_package("demo-app")?;

  let output = run_cargo_ship_raw(
    &checkout.path,
    &["ship", "release", "refs/tags/v1.0.0", "--dry-run", "--only", "sparc-sun-solaris"],
  )?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("sparc-sun-solaris"));

  Ok(())
}

#[test]
fn test_release_without_repository_is_user_error() -> Result<()> {
  let checkout = TestCheckout::with_package("demo-app")?;

  let output = run_cargo_ship_raw(&checkout.path, &["ship", "release", "refs/tags/v1.0.0"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("GITHUB_REPOSITORY"));
  assert!(!checkout.file_exists("target"));

  Ok(())
}

#[test]
fn test_release_retry_with_clean_summary_is_noop() -> Result<()> {
  let checkout = TestCheckout::with_package("demo-app")?;
  std::fs::write(
    checkout.path.join("summary.json"),
    r#"{
  "version": "v1.0.0",
  "release_id": 7,
  "state": "completed",
  "started_at": "2026-01-01T00:00:00Z",
  "finished_at": "2026-01-01T00:05:00Z",
  "results": []
}"#,
  )?;

  let output = run_cargo_ship(
    &checkout.path,
    &["ship", "release", "refs/tags/v1.0.0", "--retry-failed", "summary.json"],
  )?;
  assert!(stdout(&output).contains("nothing to retry"));

  Ok(())
}

#[test]
fn test_release_retry_rejects_summary_of_other_version() -> Result<()> {
  let checkout = TestCheckout::with_package("demo-app")?;
  std::fs::write(
    checkout.path.join("summary.json"),
    r#"{
  "version": "v1.0.0",
  "release_id": 7,
  "state": "partially_failed",
  "started_at": "2026-01-01T00:00:00Z",
  "finished_at": "2026-01-01T00:05:00Z",
  "results": []
}"#,
  )?;

  let output = run_cargo_ship_raw(
    &checkout.path,
    &["ship", "release", "refs/tags/v2.0.0", "--retry-failed", "summary.json", "--dry-run"],
  )?;
  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("v1.0.0"));
  assert!(err.contains("v2.0.0"));

  Ok(())
}
