//! Cargo integration
//!
//! - **metadata**: Resolve the package, binary name, and target directory of the checkout

pub mod metadata;

pub use metadata::CheckoutMetadata;
