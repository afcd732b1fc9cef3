//! `cargo ship init`: write a ship.toml with every default spelled out

use crate::core::config::ShipConfig;
use crate::core::error::{ShipError, ShipResult};
use std::path::Path;

/// Run the init command
pub fn run_init(source: &Path, force: bool) -> ShipResult<()> {
  if let Some(existing) = ShipConfig::find_config_path(source)
    && !force
  {
    return Err(ShipError::with_help(
      format!("Configuration already exists at {}", existing.display()),
      "Re-run with --force to overwrite it.",
    ));
  }

  let path = ShipConfig::scaffold().save(source)?;

  println!("✅ Wrote {}", path.display());
  println!();
  println!("Next steps:");
  println!("  1. Set `repository` under [host] (or export GITHUB_REPOSITORY)");
  println!("  2. Trim [[targets]] to the platforms you ship");
  println!("  3. Preview a run: cargo ship release refs/tags/v0.1.0 --dry-run");

  Ok(())
}
