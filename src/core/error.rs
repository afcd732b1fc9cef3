//! Error types for cargo-ship with contextual messages and exit codes
//!
//! Two layers of failure exist in a release run:
//!
//! - [`ShipError`]: run-level errors. Anything raised before the release
//!   barrier (bad tag, release creation) aborts the whole run.
//! - [`StageError`]: target-level errors raised after the barrier. They are
//!   captured per target in the run summary and never abort sibling targets.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::host::HostError;

/// Exit codes for cargo-ship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid tag, invalid args)
  User = 1,
  /// System error (hosting service, I/O, collaborator processes)
  System = 2,
  /// The run finished but at least one target did not succeed
  TargetsFailed = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for cargo-ship
#[derive(Debug)]
pub enum ShipError {
  /// Configuration errors
  Config(ConfigError),

  /// Pre-barrier release errors (fatal for the run)
  Release(ReleaseError),

  /// The run completed with at least one failed target
  TargetsFailed {
    version: String,
    failed: Vec<String>,
    total: usize,
  },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ShipError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ShipError::Message { message, context, help } => ShipError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ShipError::Io(err) => ShipError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ShipError::Config(_) => ExitCode::User,
      ShipError::Release(ReleaseError::InvalidVersionFormat { .. }) => ExitCode::User,
      ShipError::Release(ReleaseError::ReleaseCreationFailed { .. }) => ExitCode::System,
      ShipError::TargetsFailed { .. } => ExitCode::TargetsFailed,
      ShipError::Io(_) => ExitCode::System,
      ShipError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ShipError::Config(e) => e.help_message(),
      ShipError::Release(e) => e.help_message(),
      ShipError::TargetsFailed { version, failed, .. } => Some(format!(
        "Fix the failing targets and re-run only them: cargo ship release refs/tags/{} --only {}",
        version,
        failed.join(",")
      )),
      ShipError::Message { help, .. } => help.clone(),
      ShipError::Io(_) => None,
    }
  }
}

impl fmt::Display for ShipError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ShipError::Config(e) => write!(f, "{}", e),
      ShipError::Release(e) => write!(f, "{}", e),
      ShipError::TargetsFailed { failed, total, .. } => {
        write!(f, "{} of {} target(s) failed: {}", failed.len(), total, failed.join(", "))
      }
      ShipError::Io(e) => write!(f, "I/O error: {}", e),
      ShipError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ShipError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ShipError::Io(e) => Some(e),
      ShipError::Release(ReleaseError::ReleaseCreationFailed { source, .. }) => Some(source),
      _ => None,
    }
  }
}

impl From<io::Error> for ShipError {
  fn from(err: io::Error) -> Self {
    ShipError::Io(err)
  }
}

impl From<String> for ShipError {
  fn from(msg: String) -> Self {
    ShipError::message(msg)
  }
}

impl From<&str> for ShipError {
  fn from(msg: &str) -> Self {
    ShipError::message(msg)
  }
}

impl From<ConfigError> for ShipError {
  fn from(err: ConfigError) -> Self {
    ShipError::Config(err)
  }
}

impl From<ReleaseError> for ShipError {
  fn from(err: ReleaseError) -> Self {
    ShipError::Release(err)
  }
}

impl From<cargo_metadata::Error> for ShipError {
  fn from(err: cargo_metadata::Error) -> Self {
    ShipError::message(format!("Cargo metadata error: {}", err))
  }
}

impl From<toml_edit::de::Error> for ShipError {
  fn from(err: toml_edit::de::Error) -> Self {
    ShipError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for ShipError {
  fn from(err: toml_edit::ser::Error) -> Self {
    ShipError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for ShipError {
  fn from(err: serde_json::Error) -> Self {
    ShipError::message(format!("JSON error: {}", err))
  }
}

impl From<rayon::ThreadPoolBuildError> for ShipError {
  fn from(err: rayon::ThreadPoolBuildError) -> Self {
    ShipError::message(format!("Failed to build worker pool: {}", err))
  }
}

/// Convert anyhow::Error from adapter code
impl From<anyhow::Error> for ShipError {
  fn from(err: anyhow::Error) -> Self {
    ShipError::message(format!("{:#}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Field holds a value we cannot use
  InvalidField { field: String, reason: String },

  /// Two registry entries share a target triple
  DuplicateTarget { triple: String },

  /// A target needs an installer but `[installer]` is missing
  MissingInstaller { triple: String },

  /// Registry ended up empty after filtering
  NoTargets { reason: String },

  /// Program name could not be derived from the checkout
  NoProgram { source_root: PathBuf },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::DuplicateTarget { .. } => {
        Some("Each [[targets]] entry in ship.toml must use a distinct triple.".to_string())
      }
      ConfigError::MissingInstaller { .. } => Some(
        "Add an [installer] section to ship.toml (run `cargo ship init` to see the defaults).".to_string(),
      ),
      ConfigError::NoTargets { .. } => Some("List the registry with `cargo ship targets`.".to_string()),
      ConfigError::NoProgram { .. } => Some(
        "Set `name` under [program] in ship.toml, or add a [[bin]] target to the package.".to_string(),
      ),
      ConfigError::InvalidField { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::InvalidField { field, reason } => {
        write!(f, "Invalid value for '{}': {}", field, reason)
      }
      ConfigError::DuplicateTarget { triple } => {
        write!(f, "Target '{}' is listed more than once in the registry", triple)
      }
      ConfigError::MissingInstaller { triple } => {
        write!(f, "Target '{}' requires an installer but no installer is configured", triple)
      }
      ConfigError::NoTargets { reason } => write!(f, "No targets to release: {}", reason),
      ConfigError::NoProgram { source_root } => {
        write!(f, "No binary target found in {}", source_root.display())
      }
    }
  }
}

/// Fatal release errors raised before any build starts
#[derive(Debug)]
pub enum ReleaseError {
  /// The trigger ref is not `refs/tags/v<version>`
  InvalidVersionFormat { reference: String },

  /// The hosting service could not create or return the release
  ReleaseCreationFailed { tag: String, source: HostError },
}

impl ReleaseError {
  fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::InvalidVersionFormat { .. } => {
        Some("Runs are triggered by tags such as refs/tags/v1.2.3.".to_string())
      }
      ReleaseError::ReleaseCreationFailed { source, .. } => match source {
        HostError::Unauthorized { .. } => {
          Some("Export GITHUB_TOKEN (or GH_TOKEN) with permission to write releases.".to_string())
        }
        HostError::Timeout { .. } | HostError::Transport { .. } => {
          Some("The hosting service is unreachable. Re-running is safe: an existing release is reused.".to_string())
        }
        _ => None,
      },
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::InvalidVersionFormat { reference } => {
        write!(f, "Invalid version format: '{}' is not a refs/tags/v<version> ref", reference)
      }
      ReleaseError::ReleaseCreationFailed { tag, source } => {
        write!(f, "Failed to create release {}: {}", tag, source)
      }
    }
  }
}

/// Target-local failures. Captured in the run summary, never propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
  /// Toolchain exited non-zero, timed out, or produced no binary
  BuildFailed { triple: String, stderr: String },

  /// Installer generation failed
  PackagingFailed { triple: String, detail: String },

  /// Upload to the release failed
  UploadFailed { triple: String, transport: String },
}

impl StageError {
  /// Target triple the failure belongs to
  pub fn triple(&self) -> &str {
    match self {
      StageError::BuildFailed { triple, .. }
      | StageError::PackagingFailed { triple, .. }
      | StageError::UploadFailed { triple, .. } => triple,
    }
  }

  /// Captured error detail (stderr snippet or transport error)
  pub fn detail(&self) -> &str {
    match self {
      StageError::BuildFailed { stderr, .. } => stderr,
      StageError::PackagingFailed { detail, .. } => detail,
      StageError::UploadFailed { transport, .. } => transport,
    }
  }
}

impl fmt::Display for StageError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StageError::BuildFailed { triple, stderr } => write!(f, "Build failed for {}:\n{}", triple, stderr),
      StageError::PackagingFailed { triple, detail } => {
        write!(f, "Packaging failed for {}:\n{}", triple, detail)
      }
      StageError::UploadFailed { triple, transport } => {
        write!(f, "Upload failed for {}: {}", triple, transport)
      }
    }
  }
}

impl std::error::Error for StageError {}

/// Result type alias for cargo-ship
pub type ShipResult<T> = Result<T, ShipError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ShipResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ShipError>,
{
  fn context(self, ctx: impl Into<String>) -> ShipResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ShipError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
