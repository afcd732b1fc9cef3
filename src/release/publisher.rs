//! Release publisher
//!
//! Creates the release record once per run, or reuses the one a previous run
//! left behind. Idempotency comes from the hosting service, not from any
//! process-local cache: look up by tag, create if absent, and re-read when a
//! concurrent run wins the creation race.

use crate::core::error::{ReleaseError, ShipResult};
use crate::host::{HostError, NewRelease, ReleaseHandle, ReleaseHost};

pub struct ReleasePublisher<'a> {
  host: &'a dyn ReleaseHost,
}

impl<'a> ReleasePublisher<'a> {
  pub fn new(host: &'a dyn ReleaseHost) -> Self {
    Self { host }
  }

  /// Return the release for `version_tag`, creating it if needed.
  ///
  /// The release is published (not draft, not prerelease) and named exactly
  /// after the tag. Any failure is `ReleaseCreationFailed`.
  pub fn create_release(&self, version_tag: &str) -> ShipResult<ReleaseHandle> {
    let creation_failed = |source: HostError| ReleaseError::ReleaseCreationFailed {
      tag: version_tag.to_string(),
      source,
    };

    if let Some(existing) = self.host.find_release(version_tag).map_err(creation_failed)? {
      tracing::info!(tag = version_tag, release_id = existing.release_id, "reusing existing release");
      return Ok(existing);
    }

    match self.host.create_release(&NewRelease::published(version_tag)) {
      Ok(handle) => {
        tracing::info!(tag = version_tag, release_id = handle.release_id, "created release");
        Ok(handle)
      }
      Err(HostError::AlreadyExists { what }) => {
        tracing::debug!(tag = version_tag, %what, "release created concurrently, re-reading");
        match self.host.find_release(version_tag).map_err(creation_failed)? {
          Some(handle) => Ok(handle),
          None => Err(creation_failed(HostError::AlreadyExists { what }).into()),
        }
      }
      Err(err) => Err(creation_failed(err).into()),
    }
  }
}
