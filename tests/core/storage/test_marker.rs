// Marker document handling on reload

use crate::common::{build, create_test_services};
use catalog_search::core::schema::{META_FIELD, META_VALUE};
use catalog_search::core::source::MemorySource;
use catalog_search::core::storage::MarkerLookup;
use catalog_search::core::types::Row;
use chrono::{Duration, Utc};
use tantivy::Term;
use tempfile::TempDir;

const HEAP: usize = 15_000_000;

fn labels(count: u64) -> MemorySource {
    MemorySource::new().with_rows(
        "label",
        (1..=count).map(|id| Row::new(id).column("name", format!("Label {id}"))),
    )
}

#[test]
fn test_marker_carries_build_time() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());
    build(&services, labels(2), &["label"]);

    let info = services.store.read_build_info("label").unwrap().unwrap();
    let server = services.server("label").unwrap();
    let last_updated = server.last_updated().unwrap();
    assert_eq!(
        last_updated.timestamp_millis(),
        info.built_at.timestamp_millis()
    );

    let snapshot = server.snapshot();
    assert!(matches!(
        snapshot.read_marker().unwrap(),
        MarkerLookup::Found(ts) if ts == last_updated
    ));
}

#[test]
fn test_duplicated_then_missing_marker_keeps_previous_timestamp() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());
    build(&services, labels(2), &["label"]);

    let server = services.server("label").unwrap();
    let original = server.last_updated().unwrap();

    // A second marker with a later timestamp
    let index = services.store.open("label").unwrap();
    let mut writer = index.writer(HEAP).unwrap();
    writer
        .add_document(index.marker_document(Utc::now() + Duration::hours(1)).unwrap())
        .unwrap();
    writer.commit().unwrap();

    assert!(server.reload().unwrap());
    assert!(matches!(
        server.snapshot().read_marker().unwrap(),
        MarkerLookup::Duplicated(2)
    ));
    assert_eq!(server.last_updated(), Some(original));
    assert_eq!(server.snapshot().version(), 2);

    // No marker at all
    let marker = Term::from_field_text(index.field(META_FIELD).unwrap(), META_VALUE);
    writer.delete_term(marker);
    writer.commit().unwrap();

    assert!(server.reload().unwrap());
    assert!(matches!(
        server.snapshot().read_marker().unwrap(),
        MarkerLookup::Missing
    ));
    assert_eq!(server.last_updated(), Some(original));

    // Searching is unaffected by either
    assert_eq!(services.search("label", "label", 0, None).unwrap().total_hits, 2);
}
