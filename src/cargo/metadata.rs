use crate::core::error::{ConfigError, ShipError, ShipResult};
use cargo_metadata::{MetadataCommand, Package, TargetKind};
use std::path::{Path, PathBuf};

/// What the build needs to know about the source checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutMetadata {
  /// Workspace root reported by cargo
  pub workspace_root: PathBuf,

  /// Where `cargo build` places artifacts
  pub target_directory: PathBuf,

  /// Package being released
  pub package: String,

  /// Binary produced by the package (asset name prefix)
  pub program: String,
}

impl CheckoutMetadata {
  /// Load metadata for the checkout at `source_root`.
  ///
  /// `package` picks a workspace member, defaulting to the root package (or
  /// the only member). `program` overrides the binary name.
  pub fn load(source_root: &Path, package: Option<&str>, program: Option<&str>) -> ShipResult<Self> {
    let metadata = MetadataCommand::new()
      .manifest_path(source_root.join("Cargo.toml"))
      .no_deps()
      .exec()?;

    let members = metadata.workspace_packages();
    let selected: Option<&Package> = match package {
      Some(name) => members.iter().copied().find(|p| p.name.as_str() == name),
      None => metadata
        .root_package()
        .or_else(|| if members.len() == 1 { members.first().copied() } else { None }),
    };

    let Some(selected) = selected else {
      return Err(match package {
        Some(name) => ConfigError::InvalidField {
          field: "program.package".to_string(),
          reason: format!("'{}' is not a workspace member", name),
        }
        .into(),
        None => ShipError::with_help(
          "Cannot pick a package to release in a virtual workspace",
          "Set `package` under [program] in ship.toml.",
        ),
      });
    };

    let program = match program {
      Some(name) => name.to_string(),
      None => first_bin(selected).ok_or_else(|| ConfigError::NoProgram {
        source_root: source_root.to_path_buf(),
      })?,
    };

    tracing::debug!(package = selected.name.as_str(), %program, "resolved checkout metadata");

    Ok(Self {
      workspace_root: metadata.workspace_root.clone().into_std_path_buf(),
      target_directory: metadata.target_directory.clone().into_std_path_buf(),
      package: selected.name.to_string(),
      program,
    })
  }

  /// Metadata for runs that never invoke cargo (dry-run without a manifest, tests)
  pub fn synthetic(source_root: &Path, program: &str) -> Self {
    Self {
      workspace_root: source_root.to_path_buf(),
      target_directory: source_root.join("target"),
      package: program.to_string(),
      program: program.to_string(),
    }
  }

  /// `<target_dir>/<triple>/release/<program><suffix>`
  pub fn binary_path(&self, triple: &str, exe_suffix: &str) -> PathBuf {
    self
      .target_directory
      .join(triple)
      .join("release")
      .join(format!("{}{}", self.program, exe_suffix))
  }
}

fn first_bin(package: &Package) -> Option<String> {
  package
    .targets
    .iter()
    .find(|t| t.kind.contains(&TargetKind::Bin))
    .map(|t| t.name.clone())
}
