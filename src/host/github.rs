//! GitHub Releases over the REST v3 API
//!
//! Thin wrapper around `reqwest::blocking::Client`. Every request carries the
//! bearer token (when one is available) and maps HTTP failures onto
//! [`HostError`] so callers can tell "already exists" apart from real errors.

use super::{AssetUpload, HostError, NewRelease, ReleaseHandle, ReleaseHost, RemoteAsset, UploadDisposition, UploadReceipt};
use crate::core::error::{ShipError, ShipResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::time::Duration;

/// Default API root for github.com
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Deadline for metadata calls (lookups, creation, listing)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Page size for asset listing
const PER_PAGE: usize = 100;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CreateReleaseRequest<'a> {
  tag_name: &'a str,
  name: &'a str,
  draft: bool,
  prerelease: bool,
}

#[derive(Deserialize)]
struct ReleasePayload {
  id: u64,
  upload_url: String,
  tag_name: String,
}

#[derive(Deserialize)]
struct AssetPayload {
  name: String,
  #[serde(default)]
  size: u64,
  #[serde(default)]
  browser_download_url: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorPayload {
  #[serde(default)]
  message: Option<String>,
  #[serde(default)]
  errors: Vec<ErrorItem>,
}

#[derive(Deserialize)]
struct ErrorItem {
  #[serde(default)]
  code: Option<String>,
}

impl ReleasePayload {
  fn into_handle(self) -> ReleaseHandle {
    ReleaseHandle {
      release_id: self.id,
      upload_endpoint: strip_url_template(&self.upload_url),
      version_tag: self.tag_name,
    }
  }
}

// ---------------------------------------------------------------------------
// GitHubHost
// ---------------------------------------------------------------------------

/// Release host backed by the GitHub REST API
pub struct GitHubHost {
  client: reqwest::blocking::Client,
  api_url: String,
  repository: String,
  token: Option<String>,
}

impl GitHubHost {
  /// Create a client for `owner/repo`.
  ///
  /// `api_url` is trimmed of trailing slashes so endpoint joins stay clean.
  pub fn new(api_url: &str, repository: &str, token: Option<String>) -> anyhow::Result<Self> {
    let client = reqwest::blocking::Client::builder()
      .user_agent(concat!("cargo-ship/", env!("CARGO_PKG_VERSION")))
      .timeout(REQUEST_TIMEOUT)
      .build()
      .context("failed to build HTTP client")?;

    Ok(Self {
      client,
      api_url: api_url.trim().trim_end_matches('/').to_string(),
      repository: repository.trim().to_string(),
      token,
    })
  }

  /// Create a client from configuration, falling back to the CI environment
  /// (`GITHUB_REPOSITORY`, `GITHUB_TOKEN` / `GH_TOKEN`).
  pub fn from_env(api_url: &str, repository: Option<&str>) -> ShipResult<Self> {
    let repository = match repository {
      Some(repo) => repo.to_string(),
      None => std::env::var("GITHUB_REPOSITORY").map_err(|_| {
        ShipError::with_help(
          "No repository configured for releases",
          "Set `repository = \"owner/repo\"` under [host] in ship.toml or export GITHUB_REPOSITORY.",
        )
      })?,
    };

    if !repository.contains('/') {
      return Err(ShipError::message(format!(
        "Repository '{}' must be in owner/repo form",
        repository
      )));
    }

    let token = std::env::var("GITHUB_TOKEN")
      .or_else(|_| std::env::var("GH_TOKEN"))
      .ok()
      .filter(|t| !t.is_empty());
    if token.is_none() {
      tracing::warn!("no GITHUB_TOKEN or GH_TOKEN in environment; requests are unauthenticated");
    }

    Ok(Self::new(api_url, &repository, token)?)
  }

  fn repo_url(&self, path: &str) -> String {
    format!("{}/repos/{}{}", self.api_url, self.repository, path)
  }

  fn request(&self, method: reqwest::Method, url: &str) -> reqwest::blocking::RequestBuilder {
    let builder = self
      .client
      .request(method, url)
      .header("Accept", "application/vnd.github+json")
      .header("X-GitHub-Api-Version", "2022-11-28");
    match &self.token {
      Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
      None => builder,
    }
  }
}

impl ReleaseHost for GitHubHost {
  fn find_release(&self, tag: &str) -> Result<Option<ReleaseHandle>, HostError> {
    let url = self.repo_url(&format!("/releases/tags/{}", tag));
    let resp = self
      .request(reqwest::Method::GET, &url)
      .send()
      .map_err(|e| send_error(e, "release lookup"))?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !resp.status().is_success() {
      return Err(error_from_response(resp, &format!("release {}", tag)));
    }

    let payload: ReleasePayload = resp.json().map_err(|e| HostError::Transport {
      message: format!("malformed release payload: {}", e),
    })?;
    Ok(Some(payload.into_handle()))
  }

  fn create_release(&self, release: &NewRelease) -> Result<ReleaseHandle, HostError> {
    let url = self.repo_url("/releases");
    let body = CreateReleaseRequest {
      tag_name: &release.tag,
      name: &release.name,
      draft: release.draft,
      prerelease: release.prerelease,
    };
    let resp = self
      .request(reqwest::Method::POST, &url)
      .json(&body)
      .send()
      .map_err(|e| send_error(e, "release creation"))?;

    if !resp.status().is_success() {
      return Err(error_from_response(resp, &format!("release {}", release.tag)));
    }

    let payload: ReleasePayload = resp.json().map_err(|e| HostError::Transport {
      message: format!("malformed release payload: {}", e),
    })?;
    Ok(payload.into_handle())
  }

  fn list_assets(&self, release: &ReleaseHandle) -> Result<Vec<RemoteAsset>, HostError> {
    let mut assets = Vec::new();
    let mut page = 1;

    loop {
      let url = self.repo_url(&format!(
        "/releases/{}/assets?per_page={}&page={}",
        release.release_id, PER_PAGE, page
      ));
      let resp = self
        .request(reqwest::Method::GET, &url)
        .send()
        .map_err(|e| send_error(e, "asset listing"))?;

      if !resp.status().is_success() {
        return Err(error_from_response(resp, "asset list"));
      }

      let batch: Vec<RemoteAsset> = resp.json().map_err(|e| HostError::Transport {
        message: format!("malformed asset list: {}", e),
      })?;
      let done = batch.len() < PER_PAGE;
      assets.extend(batch);
      if done {
        return Ok(assets);
      }
      page += 1;
    }
  }

  fn delete_asset(&self, _release: &ReleaseHandle, asset: &RemoteAsset) -> Result<(), HostError> {
    let url = self.repo_url(&format!("/releases/assets/{}", asset.id));
    let resp = self
      .request(reqwest::Method::DELETE, &url)
      .send()
      .map_err(|e| send_error(e, "asset deletion"))?;

    if resp.status().is_success() || resp.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(());
    }
    Err(error_from_response(resp, &format!("asset {}", asset.name)))
  }

  fn upload_asset(&self, release: &ReleaseHandle, upload: &AssetUpload) -> Result<UploadReceipt, HostError> {
    let file = File::open(&upload.path).map_err(|e| HostError::Transport {
      message: format!("cannot read {}: {}", upload.path.display(), e),
    })?;
    let len = file
      .metadata()
      .map_err(|e| HostError::Transport {
        message: format!("cannot stat {}: {}", upload.path.display(), e),
      })?
      .len();

    let resp = self
      .request(reqwest::Method::POST, &release.upload_endpoint)
      .query(&[("name", upload.name.as_str())])
      .header("Content-Type", upload.content_type)
      .timeout(upload.timeout)
      .body(reqwest::blocking::Body::sized(file, len))
      .send()
      .map_err(|e| send_error(e, &format!("upload of {}", upload.name)))?;

    if !resp.status().is_success() {
      return Err(error_from_response(resp, &format!("asset {}", upload.name)));
    }

    let payload: AssetPayload = resp.json().map_err(|e| HostError::Transport {
      message: format!("malformed asset payload: {}", e),
    })?;
    Ok(UploadReceipt {
      asset_name: payload.name,
      size_bytes: if payload.size > 0 { payload.size } else { len },
      disposition: UploadDisposition::Uploaded,
      download_url: payload.browser_download_url,
    })
  }
}

// ---------------------------------------------------------------------------
// HTTP error mapping
// ---------------------------------------------------------------------------

/// `https://uploads.github.com/.../assets{?name,label}` -> `.../assets`
fn strip_url_template(url: &str) -> String {
  url.split('{').next().unwrap_or(url).to_string()
}

fn send_error(err: reqwest::Error, operation: &str) -> HostError {
  if err.is_timeout() {
    HostError::Timeout {
      operation: operation.to_string(),
    }
  } else {
    HostError::Transport {
      message: format!("{}: {}", operation, err),
    }
  }
}

fn error_from_response(resp: reqwest::blocking::Response, what: &str) -> HostError {
  let status = resp.status().as_u16();
  let body = resp.text().unwrap_or_default();
  classify_error(status, &body, what)
}

/// Map an error status and body onto [`HostError`].
///
/// GitHub reports duplicates as `422` with an `already_exists` error code,
/// both for release tags and for asset names.
fn classify_error(status: u16, body: &str, what: &str) -> HostError {
  let payload: ErrorPayload = serde_json::from_str(body).unwrap_or_default();

  if status == 422
    && payload
      .errors
      .iter()
      .any(|e| e.code.as_deref() == Some("already_exists"))
  {
    return HostError::AlreadyExists { what: what.to_string() };
  }

  let message = payload.message.unwrap_or_else(|| truncate(body.trim(), 200));
  match status {
    401 | 403 => HostError::Unauthorized { message },
    _ => HostError::Rejected { status, message },
  }
}

fn truncate(text: &str, max: usize) -> String {
  if text.is_empty() {
    return "no details provided".to_string();
  }
  match text.char_indices().nth(max) {
    Some((idx, _)) => format!("{}...", &text[..idx]),
    None => text.to_string(),
  }
}
