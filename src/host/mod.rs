//! Hosting-service abstraction
//!
//! The orchestrator never talks to a hosting API directly. It goes through
//! [`ReleaseHost`], which keeps the contract small enough to be idempotent:
//!
//! - **find/create release**: read-then-create-or-reuse lives in the publisher
//! - **list/delete assets**: lets re-runs skip or replace assets by name
//! - **upload asset**: streams one file as an opaque octet stream
//!
//! - **github**: GitHub REST v3 implementation over `reqwest`
//! - **memory**: in-memory host used by the unit tests

pub mod github;
#[cfg(test)]
pub mod memory;

pub use github::GitHubHost;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Content type used for every binary asset
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Published release, shared read-only by every pipeline instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseHandle {
  pub release_id: u64,
  pub upload_endpoint: String,
  pub version_tag: String,
}

/// Parameters for creating a release record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
  pub name: String,
  pub tag: String,
  pub draft: bool,
  pub prerelease: bool,
}

impl NewRelease {
  /// Published (non-draft, non-prerelease) release named after its tag
  pub fn published(tag: &str) -> Self {
    Self {
      name: tag.to_string(),
      tag: tag.to_string(),
      draft: false,
      prerelease: false,
    }
  }
}

/// Asset already attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteAsset {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub size: u64,
}

/// One file to attach to a release
#[derive(Debug, Clone)]
pub struct AssetUpload {
  pub name: String,
  pub path: PathBuf,
  pub content_type: &'static str,
  pub timeout: Duration,
}

/// What happened to an asset on the release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadDisposition {
  /// Fresh upload
  Uploaded,
  /// Existing asset with the same name was deleted first
  Replaced,
  /// Asset with the same name was already attached and kept
  AlreadyPresent,
}

/// Receipt returned for every asset that ends up on the release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
  pub asset_name: String,
  pub size_bytes: u64,
  pub disposition: UploadDisposition,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub download_url: Option<String>,
}

/// Hosting-service errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
  /// A record with the same identity already exists
  AlreadyExists { what: String },

  /// Credentials missing or rejected
  Unauthorized { message: String },

  /// Request exceeded its deadline
  Timeout { operation: String },

  /// Service could not be reached or the connection broke
  Transport { message: String },

  /// Service answered with an error status
  Rejected { status: u16, message: String },
}

impl fmt::Display for HostError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HostError::AlreadyExists { what } => write!(f, "{} already exists", what),
      HostError::Unauthorized { message } => write!(f, "not authorized: {}", message),
      HostError::Timeout { operation } => write!(f, "{} timed out", operation),
      HostError::Transport { message } => write!(f, "transport error: {}", message),
      HostError::Rejected { status, message } => write!(f, "HTTP {}: {}", status, message),
    }
  }
}

impl std::error::Error for HostError {}

/// Hosting-service operations used by the publisher and the uploader.
///
/// Implementations must be safe to call from every pipeline thread at once.
pub trait ReleaseHost: Send + Sync {
  /// Look a release up by tag. `Ok(None)` when no release carries the tag.
  fn find_release(&self, tag: &str) -> Result<Option<ReleaseHandle>, HostError>;

  /// Create a release. Fails with [`HostError::AlreadyExists`] when the tag is taken.
  fn create_release(&self, release: &NewRelease) -> Result<ReleaseHandle, HostError>;

  /// List assets attached to a release
  fn list_assets(&self, release: &ReleaseHandle) -> Result<Vec<RemoteAsset>, HostError>;

  /// Remove one asset from a release
  fn delete_asset(&self, release: &ReleaseHandle, asset: &RemoteAsset) -> Result<(), HostError>;

  /// Attach a file to a release.
  /// Fails with [`HostError::AlreadyExists`] on a duplicate name.
  fn upload_asset(&self, release: &ReleaseHandle, upload: &AssetUpload) -> Result<UploadReceipt, HostError>;
}
