//! Common test utilities for all integration tests.
//!
//! Provides fixture loading, protobuf response builders and an in-memory
//! scripted transport for the streaming engine.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

pub mod responses;
pub mod transport;

use std::path::PathBuf;

/// Path of a file under `tests/fixtures/`
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(manifest_dir).join("tests").join("fixtures").join(name)
}

/// Contents of a file under `tests/fixtures/`
pub fn fixture(name: &str) -> String {
    let path = fixture_path(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {}", path.display(), e))
}
