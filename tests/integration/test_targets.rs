//! Tests for the `targets` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_targets_lists_builtin_registry() -> Result<()> {
  let checkout = TestCheckout::empty()?;

  let output = run_cargo_ship(&checkout.path, &["ship", "targets", "--json"])?;
  let rows: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  let rows = rows.as_array().expect("array of targets");

  assert_eq!(rows.len(), 6);
  assert_eq!(rows[0]["triple"], "x86_64-unknown-linux-gnu");
  assert_eq!(rows[1]["strategy"], "cross");

  let windows = rows
    .iter()
    .find(|r| r["triple"] == "x86_64-pc-windows-msvc")
    .expect("windows target");
  assert_eq!(windows["installer"], true);

  Ok(())
}

#[test]
fn test_targets_from_config() -> Result<()> {
  let checkout = TestCheckout::empty()?;
  checkout.write_config(
    r#"
[[targets]]
platform = "linux"
triple = "x86_64-unknown-linux-gnu"

[[targets]]
platform = "macos"
triple = "aarch64-apple-darwin"
toolchain = "1.91.0"
"#,
  )?;

  let output = run_cargo_ship(&checkout.path, &["ship", "targets", "--json"])?;
  let rows: serde_json::Value = serde_json::from_str(&stdout(&output))?;

  assert_eq!(rows.as_array().map(Vec::len), Some(2));
  assert_eq!(rows[1]["toolchain"], "1.91.0");
  assert_eq!(rows[1]["strategy"], "native");

  let text = run_cargo_ship(&checkout.path, &["ship", "targets"])?;
  assert!(stdout(&text).contains("ship.toml"));

  Ok(())
}

#[test]
fn test_targets_rejects_duplicate_triples() -> Result<()> {
  let checkout = TestCheckout::empty()?;
  checkout.write_config(
    r#"
[[targets]]
platform = "linux"
triple = "x86_64-unknown-linux-gnu"

[[targets]]
platform = "linux"
triple = "x86_64-unknown-linux-gnu"
cross = true
"#,
  )?;

  let output = run_cargo_ship_raw(&checkout.path, &["ship", "targets"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("x86_64-unknown-linux-gnu"));

  Ok(())
}
