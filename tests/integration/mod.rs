//! Integration tests: drive the `cargo-ship` binary against throwaway checkouts

mod helpers;
mod test_init;
mod test_release;
mod test_resolve;
mod test_targets;
