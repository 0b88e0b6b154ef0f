//! Hardware-specific tests requiring a real flat-field device.
//!
//! They should be run manually with the `--ignored` flag and `TEST_PORT` set.

pub mod real_port_tests;
