//! Shared test helpers for multiplexer integration tests.
//!
//! Note: We use `helpers/mod.rs` instead of `helpers.rs` because Cargo
//! auto-discovers top-level `.rs` files in `tests/` as integration tests.

#![allow(dead_code)]

pub mod recording_backend;

pub use recording_backend::{Call, CallKind, Journal, Pushers, RecordingBackend, calls, journal};

/// Install a test logger once per test binary. Safe to call repeatedly.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
