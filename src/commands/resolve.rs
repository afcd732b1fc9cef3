//! `cargo ship resolve`: print the version a ref resolves to

use crate::commands::release::reference_or_env;
use crate::core::error::ShipResult;
use crate::release::resolve_version;

/// Resolve `reference` (or `$GITHUB_REF`) and print the version tag
pub fn run_resolve(reference: Option<String>) -> ShipResult<()> {
  let reference = reference_or_env(reference)?;
  let version = resolve_version(&reference)?;
  println!("{}", version);
  Ok(())
}
