//! CLI commands for cargo-ship
//!
//! - **release**: Publish a release and attach a binary for every target
//! - **targets**: List the target registry
//! - **resolve**: Print the version a tag ref resolves to
//! - **init**: Write a default ship.toml

pub mod init;
pub mod release;
pub mod resolve;
pub mod targets;

pub use init::run_init;
pub use release::{ReleaseOptions, run_release};
pub use resolve::run_resolve;
pub use targets::run_targets;
