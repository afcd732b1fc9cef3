//! Target registry
//!
//! Static description of every platform the release is built for. The
//! registry is built once at startup (from ship.toml or the built-in list),
//! validated, and then only ever read.

use crate::core::error::{ConfigError, ShipResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Operating-system family of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
  Linux,
  #[serde(alias = "darwin")]
  Macos,
  Windows,
}

impl Platform {
  /// Platform of the machine running cargo-ship
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Platform::Linux),
      "macos" => Some(Platform::Macos),
      "windows" => Some(Platform::Windows),
      _ => None,
    }
  }

  /// Executable file suffix on this platform
  pub fn exe_suffix(self) -> &'static str {
    match self {
      Platform::Windows => ".exe",
      Platform::Linux | Platform::Macos => "",
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Platform::Linux => "linux",
      Platform::Macos => "macos",
      Platform::Windows => "windows",
    }
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

fn default_toolchain() -> String {
  "stable".to_string()
}

/// One build target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
  pub platform: Platform,

  /// Rustup toolchain used for the build (e.g. "stable", "1.91.0")
  #[serde(default = "default_toolchain")]
  pub toolchain: String,

  /// Architecture triple, unique across the registry
  pub triple: String,

  /// Build through the containerized cross-compilation shim
  #[serde(default)]
  pub cross: bool,

  /// Wrap the binary in a platform installer before upload
  #[serde(default)]
  pub installer: bool,
}

impl TargetSpec {
  /// Target built with the host toolchain
  pub fn native(platform: Platform, triple: &str) -> Self {
    Self {
      platform,
      toolchain: default_toolchain(),
      triple: triple.to_string(),
      cross: false,
      installer: false,
    }
  }

  /// Target built through the cross shim
  pub fn cross(platform: Platform, triple: &str) -> Self {
    Self {
      cross: true,
      ..Self::native(platform, triple)
    }
  }

  pub fn with_installer(mut self) -> Self {
    self.installer = true;
    self
  }

  /// Whether a machine running `host` can build this target.
  ///
  /// Native targets need a matching host; cross targets need a Linux host
  /// with the container runtime.
  pub fn runs_on(&self, host: Platform) -> bool {
    if self.cross {
      host == Platform::Linux
    } else {
      self.platform == host
    }
  }
}

/// Validated, immutable set of targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRegistry {
  targets: Vec<TargetSpec>,
}

impl TargetRegistry {
  /// Build a registry, rejecting empty or duplicate triples
  pub fn new(targets: Vec<TargetSpec>) -> ShipResult<Self> {
    let mut seen = HashSet::new();
    for target in &targets {
      if target.triple.trim().is_empty() {
        return Err(
          ConfigError::InvalidField {
            field: "targets.triple".to_string(),
            reason: "triple must not be empty".to_string(),
          }
          .into(),
        );
      }
      if !seen.insert(target.triple.as_str()) {
        return Err(
          ConfigError::DuplicateTarget {
            triple: target.triple.clone(),
          }
          .into(),
        );
      }
    }
    Ok(Self { targets })
  }

  /// Built-in registry: Linux (native + cross ARM), macOS, and Windows with an installer
  pub fn builtin() -> Self {
    Self {
      targets: vec![
        TargetSpec::native(Platform::Linux, "x86_64-unknown-linux-gnu"),
        TargetSpec::cross(Platform::Linux, "aarch64-unknown-linux-gnu"),
        TargetSpec::cross(Platform::Linux, "arm-unknown-linux-gnueabi"),
        TargetSpec::cross(Platform::Linux, "armv7-unknown-linux-gnueabihf"),
        TargetSpec::native(Platform::Macos, "x86_64-apple-darwin"),
        TargetSpec::native(Platform::Windows, "x86_64-pc-windows-msvc").with_installer(),
      ],
    }
  }

  pub fn targets(&self) -> &[TargetSpec] {
    &self.targets
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }

  pub fn get(&self, triple: &str) -> Option<&TargetSpec> {
    self.targets.iter().find(|t| t.triple == triple)
  }

  pub fn needs_installer(&self) -> bool {
    self.targets.iter().any(|t| t.installer)
  }

  /// Keep only the listed triples. Unknown triples are an error so a typo
  /// never silently skips a target.
  pub fn select(&self, triples: &[String]) -> ShipResult<Self> {
    if let Some(unknown) = triples.iter().find(|t| self.get(t).is_none()) {
      return Err(
        ConfigError::InvalidField {
          field: "--only".to_string(),
          reason: format!("'{}' is not in the target registry", unknown),
        }
        .into(),
      );
    }
    Ok(Self {
      targets: self
        .targets
        .iter()
        .filter(|t| triples.contains(&t.triple))
        .cloned()
        .collect(),
    })
  }

  /// Keep only targets this host can build
  pub fn runnable_on(&self, host: Platform) -> Self {
    Self {
      targets: self.targets.iter().filter(|t| t.runs_on(host)).cloned().collect(),
    }
  }
}
