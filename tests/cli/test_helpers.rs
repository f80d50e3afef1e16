//! CLI test helpers
//!
//! Provides utilities for testing CLI commands including:
//! - JSON-lines dump directories
//! - Arc<Services> wrappers matching CLI execute() signatures

use crate::common::create_test_services;
use catalog_search::core::services::Services;
use std::sync::Arc;
use tempfile::TempDir;

/// Create test services wrapped in Arc (matching CLI execute() signatures)
pub fn create_cli_test_services() -> (Arc<Services>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let services = Arc::new(create_test_services(temp_dir.path()));
    (services, temp_dir)
}

/// Write `<entity>.jsonl` files into a fresh dump directory
pub fn create_dump_dir(dumps: &[(&str, &[&str])]) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    for (entity, lines) in dumps {
        let path = temp.path().join(format!("{entity}.jsonl"));
        std::fs::write(&path, lines.join("\n")).expect("Failed to write dump");
    }
    temp
}

/// Release dump with the "Our Glorious 5 Year Plan" release and a few others
pub fn release_dump() -> Vec<&'static str> {
    vec![
        r#"{"id": 1, "gid": "2d5e8c1f-6a4b-4f8e-9a57-1f0c5c7d8e01", "name": "Our Glorious 5 Year Plan", "artist": "Farming Incident", "num_tracks": 10, "label": ["Cherry Red"]}"#,
        r#"{"id": 2, "name": "Five Year Plan Demos", "artist": "Farming Incident", "num_tracks": 4}"#,
        r#"{"id": 4, "name": "Harvest Songs", "artist": "Farming Incident", "num_tracks": 12, "catno": ["CR 101", "CR 101X"]}"#,
    ]
}
