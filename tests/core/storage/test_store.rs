// Index store layout and build info

use crate::common::{build, create_test_services, release_source};
use catalog_search::core::error::CatalogError;
use catalog_search::core::source::MemorySource;
use catalog_search::core::types::Row;
use tempfile::TempDir;

#[test]
fn test_status_lists_built_entities_with_build_info() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());

    let mut source = release_source(6);
    source.insert("label", Row::new(1).column("name", "Cherry Red"));
    build(&services, source, &["release", "label"]);

    assert_eq!(services.store.list().unwrap(), vec!["label", "release"]);

    let status = services.store.status().unwrap();
    assert_eq!(status.len(), 2);
    let release = status.iter().find(|s| s.entity == "release").unwrap();
    assert!(release.size_bytes > 0);
    let info = release.build.as_ref().unwrap();
    assert_eq!(info.documents, 6);
    assert_eq!(info.expected_rows, 6);
    assert_eq!(info.max_id, 6);
    assert_eq!(info.chunk_size, 4);
    assert!(info.optimized);
    assert!(!info.test_mode);

    assert!(services.store.read_build_info("artist").unwrap().is_none());
    assert!(!services.store.index_exists("artist"));
}

#[test]
fn test_open_unbuilt_entity_is_not_found() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());

    let err = services.store.open("artist").unwrap_err();
    assert!(matches!(err, CatalogError::IndexNotFound(_)));
    assert!(err.is_not_found());
}

#[test]
fn test_rebuild_reuses_index_directory() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());

    let one = MemorySource::new().with_rows("label", [Row::new(1).column("name", "Warp")]);
    build(&services, one, &["label"]);
    let first = services.store.open("label").unwrap().committed_opstamp().unwrap();

    let two = MemorySource::new().with_rows(
        "label",
        [
            Row::new(1).column("name", "Warp"),
            Row::new(2).column("name", "Rephlex"),
        ],
    );
    build(&services, two, &["label"]);
    let second = services.store.open("label").unwrap().committed_opstamp().unwrap();

    assert!(second > first);
    assert_eq!(
        services.store.read_build_info("label").unwrap().unwrap().documents,
        2
    );
}
