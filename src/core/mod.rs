//! Core building blocks shared by every command
//!
//! - **config**: ship.toml parsing and validation
//! - **context**: Per-invocation context (source root, config, registry)
//! - **error**: Error types with contextual help messages and exit codes
//! - **process**: Collaborator process execution with deadlines
//! - **vcs**: Git operations on the source checkout (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod process;
pub mod vcs;
