//! Integration test crate for the save-snapshot service.
//!
//! This crate has no library code. Its tests drive uploads, loads and
//! aggregate queries across the codec, auth, store, cache and service
//! crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p pusher-integration-tests
//! ```
