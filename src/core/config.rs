use crate::core::error::{ConfigError, ShipError, ShipResult, ResultExt};
use crate::host::github::DEFAULT_API_URL;
use crate::release::targets::{TargetRegistry, TargetSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for cargo-ship
/// Searched in order: ship.toml, .ship.toml, .cargo/ship.toml, .config/ship.toml
///
/// Every section is optional; with no file at all the built-in registry and
/// defaults are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipConfig {
  #[serde(default)]
  pub program: ProgramConfig,
  #[serde(default)]
  pub host: HostConfig,
  #[serde(default)]
  pub build: BuildConfig,
  #[serde(default)]
  pub upload: UploadConfig,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub installer: Option<InstallerConfig>,
  #[serde(default)]
  pub targets: Vec<TargetSpec>,
}

/// What is being released
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramConfig {
  /// Binary name used in asset names (default: first bin target of the package)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  /// Package to build in a multi-package workspace (default: root package)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub package: Option<String>,
}

/// Hosting service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
  /// `owner/repo` (default: $GITHUB_REPOSITORY)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub repository: Option<String>,

  /// REST API root
  #[serde(default = "default_api_url")]
  pub api_url: String,
}

fn default_api_url() -> String {
  DEFAULT_API_URL.to_string()
}

impl Default for HostConfig {
  fn default() -> Self {
    Self {
      repository: None,
      api_url: default_api_url(),
    }
  }
}

/// Toolchain settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
  /// Native toolchain driver
  #[serde(default = "default_cargo")]
  pub cargo: String,

  /// Cross-compilation shim
  #[serde(default = "default_cross")]
  pub cross: String,

  /// Per-target toolchain deadline in seconds
  #[serde(default = "default_build_timeout")]
  pub timeout_secs: u64,

  /// Concurrent pipelines (0 = one per target)
  #[serde(default)]
  pub jobs: usize,
}

fn default_cargo() -> String {
  "cargo".to_string()
}

fn default_cross() -> String {
  "cross".to_string()
}

fn default_build_timeout() -> u64 {
  3600
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      cargo: default_cargo(),
      cross: default_cross(),
      timeout_secs: default_build_timeout(),
      jobs: 0,
    }
  }
}

/// What to do when an asset with the same name is already on the release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingAssetPolicy {
  /// Keep the existing asset, report it as already present
  #[default]
  Skip,
  /// Delete the existing asset and upload again
  Overwrite,
}

/// Upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
  /// Per-asset upload deadline in seconds
  #[serde(default = "default_upload_timeout")]
  pub timeout_secs: u64,

  #[serde(default)]
  pub existing: ExistingAssetPolicy,
}

fn default_upload_timeout() -> u64 {
  600
}

impl Default for UploadConfig {
  fn default() -> Self {
    Self {
      timeout_secs: default_upload_timeout(),
      existing: ExistingAssetPolicy::default(),
    }
  }
}

/// Installer generator, used by targets with `installer = true`
///
/// `command` is a templated argv. Placeholders: `{binary}`, `{descriptor}`,
/// `{output}`, `{triple}`, `{program}`, `{version}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerConfig {
  #[serde(default = "default_installer_command")]
  pub command: Vec<String>,

  /// Platform-specific descriptor file, relative to the source root
  #[serde(default = "default_descriptor")]
  pub descriptor: PathBuf,

  /// Asset name for the installer (`{program}` and `{triple}` are substituted)
  #[serde(default = "default_installer_asset")]
  pub asset_name: String,

  /// File the generator writes, under `<target-dir>/<triple>/installer/`
  #[serde(default = "default_installer_output")]
  pub output_name: String,

  /// Per-invocation deadline in seconds
  #[serde(default = "default_installer_timeout")]
  pub timeout_secs: u64,
}

fn default_installer_command() -> Vec<String> {
  [
    "cargo",
    "wix",
    "--no-build",
    "--nocapture",
    "--target",
    "{triple}",
    "--output",
    "{output}",
    "{descriptor}",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

fn default_descriptor() -> PathBuf {
  PathBuf::from("wix").join("main.wxs")
}

fn default_installer_asset() -> String {
  "{program}-installer.msi".to_string()
}

fn default_installer_output() -> String {
  "{program}-{triple}.msi".to_string()
}

fn default_installer_timeout() -> u64 {
  900
}

impl Default for InstallerConfig {
  fn default() -> Self {
    Self {
      command: default_installer_command(),
      descriptor: default_descriptor(),
      asset_name: default_installer_asset(),
      output_name: default_installer_output(),
      timeout_secs: default_installer_timeout(),
    }
  }
}

impl InstallerConfig {
  /// Installer asset name for `program` built for `triple`
  pub fn asset_name_for(&self, program: &str, triple: &str) -> String {
    self.asset_name.replace("{program}", program).replace("{triple}", triple)
  }

  /// Local file name of the generated installer
  pub fn output_name_for(&self, program: &str, triple: &str) -> String {
    self.output_name.replace("{program}", program).replace("{triple}", triple)
  }
}

impl BuildConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

impl UploadConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

impl InstallerConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

impl ShipConfig {
  /// Find config file in search order: ship.toml, .ship.toml, .cargo/ship.toml, .config/ship.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("ship.toml"),
      path.join(".ship.toml"),
      path.join(".cargo").join("ship.toml"),
      path.join(".config").join("ship.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config if present, defaults otherwise
  pub fn load_or_default(path: &Path) -> ShipResult<Self> {
    match Self::find_config_path(path) {
      Some(config_path) => Self::load_from(&config_path),
      None => {
        tracing::debug!(root = %path.display(), "no ship.toml found, using defaults");
        Ok(Self::default())
      }
    }
  }

  /// Load and validate a specific config file
  pub fn load_from(config_path: &Path) -> ShipResult<Self> {
    let content = fs::read_to_string(config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config = Self::parse(&content).with_context(|| format!("Invalid config in {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), targets = config.targets.len(), "loaded config");
    Ok(config)
  }

  /// Parse and validate TOML content
  pub fn parse(content: &str) -> ShipResult<Self> {
    let config: ShipConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Save config to ship.toml (default location)
  pub fn save(&self, path: &Path) -> ShipResult<PathBuf> {
    let config_path = path.join("ship.toml");
    let content = toml_edit::ser::to_string_pretty(self).context("Failed to serialize config to TOML")?;
    fs::write(&config_path, content).with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(config_path)
  }

  /// Config with every default spelled out (what `cargo ship init` writes)
  pub fn scaffold() -> Self {
    Self {
      installer: Some(InstallerConfig::default()),
      targets: TargetRegistry::builtin().targets().to_vec(),
      ..Self::default()
    }
  }

  /// Registry from `[[targets]]`, or the built-in one when none are listed
  pub fn registry(&self) -> ShipResult<TargetRegistry> {
    if self.targets.is_empty() {
      Ok(TargetRegistry::builtin())
    } else {
      TargetRegistry::new(self.targets.clone())
    }
  }

  /// Installer settings, falling back to defaults when the registry needs one
  /// but the section is absent only if the built-in registry is in use.
  pub fn installer(&self) -> Option<InstallerConfig> {
    match &self.installer {
      Some(installer) => Some(installer.clone()),
      None if self.targets.is_empty() => Some(InstallerConfig::default()),
      None => None,
    }
  }

  /// Validate configuration
  pub fn validate(&self) -> ShipResult<()> {
    let registry = self.registry()?;

    if let Some(target) = registry.targets().iter().find(|t| t.installer)
      && self.installer().is_none()
    {
      return Err(
        ConfigError::MissingInstaller {
          triple: target.triple.clone(),
        }
        .into(),
      );
    }

    // A fixed installer name fits one installer target; more need `{triple}`
    let installer_targets = registry.targets().iter().filter(|t| t.installer).count();
    if installer_targets > 1
      && let Some(installer) = self.installer()
      && !installer.asset_name.contains("{triple}")
    {
      return Err(invalid(
        "installer.asset_name",
        &format!(
          "'{}' would name all {} installer targets alike; include {{triple}}",
          installer.asset_name, installer_targets
        ),
      ));
    }

    if self.build.timeout_secs == 0 {
      return Err(invalid("build.timeout_secs", "must be greater than zero"));
    }
    if self.upload.timeout_secs == 0 {
      return Err(invalid("upload.timeout_secs", "must be greater than zero"));
    }

    if let Some(installer) = &self.installer {
      if installer.command.is_empty() {
        return Err(invalid("installer.command", "must name a program"));
      }
      if installer.asset_name.trim().is_empty() {
        return Err(invalid("installer.asset_name", "must not be empty"));
      }
      if installer.output_name.trim().is_empty() {
        return Err(invalid("installer.output_name", "must not be empty"));
      }
      if installer.timeout_secs == 0 {
        return Err(invalid("installer.timeout_secs", "must be greater than zero"));
      }
    }

    if let Some(repo) = &self.host.repository
      && repo.split('/').filter(|s| !s.is_empty()).count() != 2
    {
      return Err(invalid("host.repository", "must be in owner/repo form"));
    }

    Ok(())
  }
}

fn invalid(field: &str, reason: &str) -> ShipError {
  ConfigError::InvalidField {
    field: field.to_string(),
    reason: reason.to_string(),
  }
  .into()
}
