// Common test utilities and fixtures

pub mod fixtures;

// Re-export commonly used items
// Note: These may appear unused in some test crates
#[allow(unused_imports)]
pub use fixtures::{
    artist_source, glorious_release, release_source, track_catalog, track_source,
};
#[allow(unused_imports)]
pub use helpers::{build, create_test_services, services_with_catalog, test_config};
