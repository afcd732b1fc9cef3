//! Asset uploader
//!
//! Attaches one artifact to the release under a deterministic name. Names are
//! checked against the release first so re-runs never duplicate an asset.

use crate::core::config::{ExistingAssetPolicy, InstallerConfig};
use crate::core::error::StageError;
use crate::host::{AssetUpload, HostError, OCTET_STREAM, ReleaseHandle, ReleaseHost, UploadDisposition, UploadReceipt};
use crate::release::build::{ArtifactKind, BuildArtifact};
use crate::release::targets::TargetSpec;
use std::time::Duration;

/// `<program>-<version>-<triple>[.exe]`
pub fn raw_asset_name(program: &str, version: &str, target: &TargetSpec) -> String {
  format!(
    "{}-{}-{}{}",
    program,
    version,
    target.triple,
    target.platform.exe_suffix()
  )
}

/// Asset name for an artifact: raw binaries are versioned per triple,
/// installers use the configured fixed name.
pub fn asset_name(program: &str, version: &str, artifact: &BuildArtifact, installer: Option<&InstallerConfig>) -> String {
  match (artifact.kind, installer) {
    (ArtifactKind::Installer, Some(installer)) => installer.asset_name_for(program, &artifact.target.triple),
    _ => raw_asset_name(program, version, &artifact.target),
  }
}

/// Uploads artifacts to one release
pub struct AssetUploader<'a> {
  host: &'a dyn ReleaseHost,
  release: &'a ReleaseHandle,
  policy: ExistingAssetPolicy,
  timeout: Duration,
}

impl<'a> AssetUploader<'a> {
  pub fn new(host: &'a dyn ReleaseHost, release: &'a ReleaseHandle, policy: ExistingAssetPolicy, timeout: Duration) -> Self {
    Self {
      host,
      release,
      policy,
      timeout,
    }
  }

  /// Attach `artifact` as `name`
  pub fn upload(&self, artifact: &BuildArtifact, name: &str) -> Result<UploadReceipt, StageError> {
    let failed = |err: HostError| StageError::UploadFailed {
      triple: artifact.target.triple.clone(),
      transport: err.to_string(),
    };

    let existing = self
      .host
      .list_assets(self.release)
      .map_err(failed)?
      .into_iter()
      .find(|a| a.name == name);

    let mut disposition = UploadDisposition::Uploaded;
    if let Some(asset) = existing {
      match self.policy {
        ExistingAssetPolicy::Skip => {
          tracing::info!(asset = name, "asset already attached, keeping it");
          return Ok(UploadReceipt {
            asset_name: name.to_string(),
            size_bytes: asset.size,
            disposition: UploadDisposition::AlreadyPresent,
            download_url: None,
          });
        }
        ExistingAssetPolicy::Overwrite => {
          tracing::info!(asset = name, "replacing existing asset");
          self.host.delete_asset(self.release, &asset).map_err(failed)?;
          disposition = UploadDisposition::Replaced;
        }
      }
    }

    let upload = AssetUpload {
      name: name.to_string(),
      path: artifact.path.clone(),
      content_type: OCTET_STREAM,
      timeout: self.timeout,
    };

    match self.host.upload_asset(self.release, &upload) {
      Ok(receipt) => Ok(UploadReceipt { disposition, ..receipt }),
      // Lost a race with a concurrent run for the same name
      Err(HostError::AlreadyExists { .. }) => Ok(UploadReceipt {
        asset_name: name.to_string(),
        size_bytes: artifact.size_bytes,
        disposition: UploadDisposition::AlreadyPresent,
        download_url: None,
      }),
      Err(err) => Err(failed(err)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::memory::{HostEvent, MemoryHost};
  use crate::release::targets::Platform;
  use std::path::Path;

  fn artifact(dir: &Path, target: TargetSpec, kind: ArtifactKind) -> BuildArtifact {
    let path = dir.join(&target.triple);
    std::fs::write(&path, b"payload").unwrap();
    BuildArtifact::from_file(&target, &path, kind).unwrap()
  }

  fn linux() -> TargetSpec {
    TargetSpec::native(Platform::Linux, "x86_64-unknown-linux-gnu")
  }

  #[test]
  fn test_asset_names() {
    assert_eq!(
      raw_asset_name("tool", "v2.0.0", &linux()),
      "tool-v2.0.0-x86_64-unknown-linux-gnu"
    );
    assert_eq!(
      raw_asset_name("tool", "v2.0.0", &TargetSpec::native(Platform::Windows, "x86_64-pc-windows-gnu")),
      "tool-v2.0.0-x86_64-pc-windows-gnu.exe"
    );
  }

  #[test]
  fn test_installer_uses_fixed_name() {
    let dir = tempfile::tempdir().unwrap();
    let target = TargetSpec::native(Platform::Windows, "x86_64-pc-windows-msvc").with_installer();
    let installer = InstallerConfig::default();

    let image = artifact(dir.path(), target.clone(), ArtifactKind::Installer);
    assert_eq!(asset_name("tool", "v2.0.0", &image, Some(&installer)), "tool-installer.msi");

    let raw = artifact(dir.path(), target, ArtifactKind::RawBinary);
    assert_eq!(
      asset_name("tool", "v2.0.0", &raw, Some(&installer)),
      "tool-v2.0.0-x86_64-pc-windows-msvc.exe"
    );
  }

  #[test]
  fn test_fresh_upload() {
    let dir = tempfile::tempdir().unwrap();
    let host = MemoryHost::new();
    let release = host.seed_release("v1.0.0");
    let uploader = AssetUploader::new(&host, &release, ExistingAssetPolicy::Skip, Duration::from_secs(5));

    let receipt = uploader
      .upload(&artifact(dir.path(), linux(), ArtifactKind::RawBinary), "tool-v1.0.0-x86_64-unknown-linux-gnu")
      .unwrap();
    assert_eq!(receipt.disposition, UploadDisposition::Uploaded);
    assert_eq!(receipt.size_bytes, 7);
    assert_eq!(host.asset_names("v1.0.0"), vec!["tool-v1.0.0-x86_64-unknown-linux-gnu"]);
  }

  #[test]
  fn test_existing_asset_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let host = MemoryHost::new();
    let release = host.seed_release("v1.0.0");
    host.seed_asset(&release, "tool-v1.0.0-x86_64-unknown-linux-gnu");
    let uploader = AssetUploader::new(&host, &release, ExistingAssetPolicy::Skip, Duration::from_secs(5));

    let receipt = uploader
      .upload(&artifact(dir.path(), linux(), ArtifactKind::RawBinary), "tool-v1.0.0-x86_64-unknown-linux-gnu")
      .unwrap();
    assert_eq!(receipt.disposition, UploadDisposition::AlreadyPresent);
    assert_eq!(host.upload_count(), 0);
    assert_eq!(host.asset_names("v1.0.0").len(), 1);
  }

  #[test]
  fn test_existing_asset_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let host = MemoryHost::new();
    let release = host.seed_release("v1.0.0");
    host.seed_asset(&release, "tool-v1.0.0-x86_64-unknown-linux-gnu");
    let uploader = AssetUploader::new(&host, &release, ExistingAssetPolicy::Overwrite, Duration::from_secs(5));

    let receipt = uploader
      .upload(&artifact(dir.path(), linux(), ArtifactKind::RawBinary), "tool-v1.0.0-x86_64-unknown-linux-gnu")
      .unwrap();
    assert_eq!(receipt.disposition, UploadDisposition::Replaced);
    assert_eq!(receipt.size_bytes, 7);
    assert!(
      host
        .events()
        .contains(&HostEvent::Delete("tool-v1.0.0-x86_64-unknown-linux-gnu".to_string()))
    );
    assert_eq!(host.asset_names("v1.0.0").len(), 1);
  }

  #[test]
  fn test_transport_error_is_upload_failed() {
    let dir = tempfile::tempdir().unwrap();
    let host = MemoryHost::failing_uploads(&["tool-v1.0.0-x86_64-unknown-linux-gnu"]);
    let release = host.seed_release("v1.0.0");
    let uploader = AssetUploader::new(&host, &release, ExistingAssetPolicy::Skip, Duration::from_secs(5));

    match uploader.upload(&artifact(dir.path(), linux(), ArtifactKind::RawBinary), "tool-v1.0.0-x86_64-unknown-linux-gnu") {
      Err(StageError::UploadFailed { triple, transport }) => {
        assert_eq!(triple, "x86_64-unknown-linux-gnu");
        assert!(transport.contains("connection reset"));
      }
      other => panic!("expected UploadFailed, got {:?}", other),
    }
  }
}
