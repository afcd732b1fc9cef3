//! Tests for the `resolve` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_resolve_tag_ref() -> Result<()> {
  let checkout = TestCheckout::empty()?;

  let output = run_cargo_ship(&checkout.path, &["ship", "resolve", "refs/tags/v1.2.3"])?;
  assert_eq!(stdout(&output).trim(), "v1.2.3");

  Ok(())
}

#[test]
fn test_resolve_keeps_prerelease_suffix() -> Result<()> {
  let checkout = TestCheckout::empty()?;

  let output = run_cargo_ship(&checkout.path, &["ship", "resolve", "refs/tags/v2.0.0-rc.1"])?;
  assert_eq!(stdout(&output).trim(), "v2.0.0-rc.1");

  Ok(())
}

#[test]
fn test_resolve_falls_back_to_github_ref() -> Result<()> {
  let checkout = TestCheckout::empty()?;

  let output = ship_command(&checkout.path, &["ship", "resolve"])
    .env("GITHUB_REF", "refs/tags/v0.9.0")
    .output()?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));
  assert_eq!(stdout(&output).trim(), "v0.9.0");

  Ok(())
}

#[test]
fn test_resolve_branch_ref_is_user_error() -> Result<()> {
  let checkout = TestCheckout::empty()?;

  let output = run_cargo_ship_raw(&checkout.path, &["ship", "resolve", "refs/heads/main"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stdout(&output).is_empty());
  assert!(stderr(&output).contains("refs/heads/main"));

  Ok(())
}

#[test]
fn test_resolve_without_ref_is_user_error() -> Result<()> {
  let checkout = TestCheckout::empty()?;

  let output = run_cargo_ship_raw(&checkout.path, &["ship", "resolve"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("GITHUB_REF"));

  Ok(())
}
