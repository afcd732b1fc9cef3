//! Version resolution from the triggering tag ref

use crate::core::error::{ReleaseError, ShipResult};
use regex::Regex;
use std::sync::LazyLock;

/// Ref namespace that carries release tags
pub const TAG_NAMESPACE: &str = "refs/tags/";

/// `v` + dotted digits + optional suffix (`-rc.1`, `+build.5`, `.beta`)
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^v[0-9]+(\.[0-9]+)*([-+.][0-9A-Za-z][0-9A-Za-z.+-]*)?$").expect("version pattern is valid")
});

/// Resolve `refs/tags/v1.2.3` to `v1.2.3`.
///
/// The namespace prefix is stripped and nothing else is transformed. Refs
/// outside `refs/tags/` or tags not shaped like a version fail with
/// `InvalidVersionFormat`.
pub fn resolve_version(reference: &str) -> ShipResult<String> {
  let invalid = || ReleaseError::InvalidVersionFormat {
    reference: reference.to_string(),
  };

  let tag = reference.strip_prefix(TAG_NAMESPACE).ok_or_else(invalid)?;
  if !VERSION_PATTERN.is_match(tag) {
    return Err(invalid().into());
  }
  Ok(tag.to_string())
}
