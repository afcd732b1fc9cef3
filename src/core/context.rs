//! Run context - built once in the command layer, passed by reference
//!
//! ```text
//! commands/release.rs:
//!   ShipContext::build(source) -> &ShipContext
//!   |
//!   v
//! registry(), checkout(), settings
//! ```

use crate::cargo::CheckoutMetadata;
use crate::core::config::ShipConfig;
use crate::core::error::{ShipResult, ResultExt};
use crate::release::targets::TargetRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared data for one invocation: where the source lives and how it is configured
#[derive(Clone)]
pub struct ShipContext {
  /// Source checkout root (absolute path)
  pub root: PathBuf,

  /// Configuration (ship.toml or defaults)
  pub config: Arc<ShipConfig>,

  /// Registry resolved from the config
  pub registry: TargetRegistry,
}

impl ShipContext {
  /// Load config and registry for the checkout at `source_root`.
  ///
  /// Cargo metadata is not loaded here; only commands that build need it.
  pub fn build(source_root: &Path) -> ShipResult<Self> {
    let root = source_root
      .canonicalize()
      .with_context(|| format!("Source checkout {} does not exist", source_root.display()))?;
    let config = ShipConfig::load_or_default(&root)?;
    let registry = config.registry()?;

    Ok(Self {
      root,
      config: Arc::new(config),
      registry,
    })
  }

  /// Resolve package, binary name, and target directory
  pub fn checkout(&self) -> ShipResult<CheckoutMetadata> {
    CheckoutMetadata::load(
      &self.root,
      self.config.program.package.as_deref(),
      self.config.program.name.as_deref(),
    )
  }

  /// Checkout metadata, or a best-effort stand-in when there is no manifest.
  /// Used by dry runs, which never invoke cargo.
  pub fn checkout_or_synthetic(&self) -> CheckoutMetadata {
    match self.checkout() {
      Ok(checkout) => checkout,
      Err(err) => {
        tracing::debug!(error = %err, "no cargo metadata, using synthetic checkout");
        let program = self
          .config
          .program
          .name
          .clone()
          .or_else(|| self.root.file_name().map(|n| n.to_string_lossy().into_owned()))
          .unwrap_or_else(|| "program".to_string());
        CheckoutMetadata::synthetic(&self.root, &program)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_build_without_config_uses_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ShipContext::build(dir.path()).unwrap();
    assert_eq!(ctx.registry, TargetRegistry::builtin());
    assert!(ctx.root.is_absolute());
  }

  #[test]
  fn test_synthetic_checkout_prefers_configured_name() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ship.toml"), "[program]\nname = \"tool\"\n").unwrap();
    let ctx = ShipContext::build(dir.path()).unwrap();
    assert_eq!(ctx.checkout_or_synthetic().program, "tool");
  }

  #[test]
  fn test_missing_source_root() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ShipContext::build(&dir.path().join("nope")).is_err());
  }
}
