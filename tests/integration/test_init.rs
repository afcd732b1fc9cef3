//! Tests for the `init` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_init_creates_config() -> Result<()> {
  let checkout = TestCheckout::empty()?;

  run_cargo_ship(&checkout.path, &["ship", "init"])?;

  assert!(checkout.file_exists("ship.toml"));
  let config = checkout.read_file("ship.toml")?;
  assert!(config.contains("[[targets]]"));
  assert!(config.contains("x86_64-pc-windows-msvc"));
  assert!(config.contains("[installer]"));

  Ok(())
}

#[test]
fn test_init_config_is_loadable() -> Result<()> {
  let checkout = TestCheckout::empty()?;
  run_cargo_ship(&checkout.path, &["ship", "init"])?;

  // The scaffold must round-trip through the loader
  let output = run_cargo_ship(&checkout.path, &["ship", "targets", "--json"])?;
  let rows: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  assert_eq!(rows.as_array().map(Vec::len), Some(6));

  Ok(())
}

#[test]
fn test_init_refuses_to_overwrite() -> Result<()> {
  let checkout = TestCheckout::empty()?;
  checkout.write_config("[program]\nname = \"mine\"\n")?;

  let output = run_cargo_ship_raw(&checkout.path, &["ship", "init"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("--force"));
  assert_eq!(checkout.read_file("ship.toml")?, "[program]\nname = \"mine\"\n");

  Ok(())
}

#[test]
fn test_init_force_overwrites() -> Result<()> {
  let checkout = TestCheckout::empty()?;
  checkout.write_config("[program]\nname = \"mine\"\n")?;

  run_cargo_ship(&checkout.path, &["ship", "init", "--force"])?;

  let config = checkout.read_file("ship.toml")?;
  assert!(config.contains("[[targets]]"));

  Ok(())
}
