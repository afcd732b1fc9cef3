//! Release orchestration
//!
//! Publishes one hosted release per version tag and attaches a binary for
//! every registered target.
//!
//! # Invariants
//!
//! 1. **The release exists before anything is uploaded**
//!    - Version resolution and release creation are a barrier
//!    - Failing either aborts the run before any build starts
//!
//! 2. **Targets fail independently**
//!    - Each target runs its own Build -> Package -> Upload pipeline
//!    - A failure is recorded in the run summary and never cancels siblings
//!
//! 3. **Re-runs are safe**
//!    - An existing release for the tag is reused, never duplicated
//!    - Assets already attached under the same name are kept (or replaced
//!      with `existing = "overwrite"`)
//!
//! # Modules
//!
//! - **version**: `refs/tags/v1.2.3` -> `v1.2.3`
//! - **targets**: Target registry
//! - **publisher**: Read-then-create-or-reuse release creation
//! - **build**: Native and cross toolchain invocation
//! - **package**: Installer wrapping for targets that need it
//! - **upload**: Deterministic asset naming and upload
//! - **pipeline**: Per-target gated stages
//! - **orchestrator**: Barrier, fan-out, join
//! - **summary**: Run summary (text and JSON)

pub mod build;
pub mod orchestrator;
pub mod package;
pub mod pipeline;
pub mod publisher;
pub mod summary;
pub mod targets;
pub mod upload;
pub mod version;

pub use build::CargoToolchain;
pub use orchestrator::{Collaborators, Orchestrator, RunSettings};
pub use package::CommandInstaller;
pub use summary::RunSummary;
pub use targets::{Platform, TargetRegistry};
pub use version::resolve_version;
