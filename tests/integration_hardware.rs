//! Hardware integration test suite.
//!
//! These tests require an attached flat-field device and are ignored by default.
//! Run with: TEST_PORT=/dev/ttyACM0 cargo test --features hardware-tests -- --ignored

#[path = "hardware/mod.rs"]
mod hardware;

pub use hardware::*;
