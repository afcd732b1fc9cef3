//! In-memory release host for tests
//!
//! Records every call in order so tests can assert ordering invariants
//! (no upload before the release exists) and idempotency (one release per tag).

use super::{AssetUpload, HostError, NewRelease, ReleaseHandle, ReleaseHost, RemoteAsset, UploadDisposition, UploadReceipt};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Call log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
  Find(String),
  Create(String),
  List(u64),
  Delete(String),
  Upload(String),
}

#[derive(Default)]
struct State {
  next_id: u64,
  releases: BTreeMap<String, ReleaseHandle>,
  assets: BTreeMap<u64, Vec<RemoteAsset>>,
  events: Vec<HostEvent>,
}

/// Release host keeping everything in a mutex-guarded map
#[derive(Default)]
pub struct MemoryHost {
  state: Mutex<State>,
  fail_create: Option<HostError>,
  fail_uploads: HashSet<String>,
  /// Answer `AlreadyExists` on create even when the lookup saw nothing
  race_on_create: bool,
}

impl MemoryHost {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every `create_release` fails with `err`
  pub fn failing_create(err: HostError) -> Self {
    Self {
      fail_create: Some(err),
      ..Self::default()
    }
  }

  /// Uploads of these asset names fail with a transport error
  pub fn failing_uploads(names: &[&str]) -> Self {
    Self {
      fail_uploads: names.iter().map(|n| n.to_string()).collect(),
      ..Self::default()
    }
  }

  /// Simulate a concurrent run creating the release between lookup and create
  pub fn racing() -> Self {
    Self {
      race_on_create: true,
      ..Self::default()
    }
  }

  /// Seed an existing release (a previous run)
  pub fn seed_release(&self, tag: &str) -> ReleaseHandle {
    let mut state = self.state.lock().unwrap();
    insert_release(&mut state, tag)
  }

  /// Seed an asset onto a release
  pub fn seed_asset(&self, release: &ReleaseHandle, name: &str) {
    let mut state = self.state.lock().unwrap();
    state.next_id += 1;
    let id = state.next_id;
    state.assets.entry(release.release_id).or_default().push(RemoteAsset {
      id,
      name: name.to_string(),
      size: 1,
    });
  }

  pub fn events(&self) -> Vec<HostEvent> {
    self.state.lock().unwrap().events.clone()
  }

  pub fn release_count(&self) -> usize {
    self.state.lock().unwrap().releases.len()
  }

  /// Sorted asset names on the release carrying `tag`
  pub fn asset_names(&self, tag: &str) -> Vec<String> {
    let state = self.state.lock().unwrap();
    let Some(release) = state.releases.get(tag) else {
      return Vec::new();
    };
    let mut names: Vec<String> = state
      .assets
      .get(&release.release_id)
      .map(|assets| assets.iter().map(|a| a.name.clone()).collect())
      .unwrap_or_default();
    names.sort();
    names
  }

  pub fn upload_count(&self) -> usize {
    self
      .events()
      .iter()
      .filter(|e| matches!(e, HostEvent::Upload(_)))
      .count()
  }
}

fn insert_release(state: &mut State, tag: &str) -> ReleaseHandle {
  state.next_id += 1;
  let handle = ReleaseHandle {
    release_id: state.next_id,
    upload_endpoint: format!("memory://releases/{}/assets", state.next_id),
    version_tag: tag.to_string(),
  };
  state.releases.insert(tag.to_string(), handle.clone());
  handle
}

impl ReleaseHost for MemoryHost {
  fn find_release(&self, tag: &str) -> Result<Option<ReleaseHandle>, HostError> {
    let mut state = self.state.lock().unwrap();
    state.events.push(HostEvent::Find(tag.to_string()));
    Ok(state.releases.get(tag).cloned())
  }

  fn create_release(&self, release: &NewRelease) -> Result<ReleaseHandle, HostError> {
    let mut state = self.state.lock().unwrap();
    state.events.push(HostEvent::Create(release.tag.clone()));
    if let Some(err) = &self.fail_create {
      return Err(err.clone());
    }
    if self.race_on_create && !state.releases.contains_key(&release.tag) {
      insert_release(&mut state, &release.tag);
    }
    if state.releases.contains_key(&release.tag) {
      return Err(HostError::AlreadyExists {
        what: format!("release {}", release.tag),
      });
    }
    Ok(insert_release(&mut state, &release.tag))
  }

  fn list_assets(&self, release: &ReleaseHandle) -> Result<Vec<RemoteAsset>, HostError> {
    let mut state = self.state.lock().unwrap();
    state.events.push(HostEvent::List(release.release_id));
    Ok(state.assets.get(&release.release_id).cloned().unwrap_or_default())
  }

  fn delete_asset(&self, release: &ReleaseHandle, asset: &RemoteAsset) -> Result<(), HostError> {
    let mut state = self.state.lock().unwrap();
    state.events.push(HostEvent::Delete(asset.name.clone()));
    if let Some(assets) = state.assets.get_mut(&release.release_id) {
      assets.retain(|a| a.id != asset.id);
    }
    Ok(())
  }

  fn upload_asset(&self, release: &ReleaseHandle, upload: &AssetUpload) -> Result<UploadReceipt, HostError> {
    let size = std::fs::metadata(&upload.path)
      .map_err(|e| HostError::Transport { message: e.to_string() })?
      .len();

    let mut state = self.state.lock().unwrap();
    state.events.push(HostEvent::Upload(upload.name.clone()));
    if self.fail_uploads.contains(&upload.name) {
      return Err(HostError::Transport {
        message: "connection reset by peer".to_string(),
      });
    }
    if !state.releases.values().any(|r| r.release_id == release.release_id) {
      return Err(HostError::Rejected {
        status: 404,
        message: "release not found".to_string(),
      });
    }
    let exists = state
      .assets
      .get(&release.release_id)
      .is_some_and(|assets| assets.iter().any(|a| a.name == upload.name));
    if exists {
      return Err(HostError::AlreadyExists {
        what: format!("asset {}", upload.name),
      });
    }

    state.next_id += 1;
    let id = state.next_id;
    state.assets.entry(release.release_id).or_default().push(RemoteAsset {
      id,
      name: upload.name.clone(),
      size,
    });
    Ok(UploadReceipt {
      asset_name: upload.name.clone(),
      size_bytes: size,
      disposition: UploadDisposition::Uploaded,
      download_url: None,
    })
  }
}
