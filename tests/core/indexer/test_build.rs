// Integration tests for per-entity index builds

use crate::common::{build, create_test_services, release_source};
use catalog_search::core::error::Result;
use catalog_search::core::indexer::BuildState;
use catalog_search::core::source::{DataSource, MemorySource};
use catalog_search::core::types::Row;
use std::sync::Arc;
use tempfile::TempDir;

fn labels(ids: impl IntoIterator<Item = u64>) -> MemorySource {
    MemorySource::new().with_rows(
        "label",
        ids.into_iter()
            .map(|id| Row::new(id).column("name", format!("Label {id}"))),
    )
}

/// Reports one more row than it holds
struct OverCounting(MemorySource);

impl DataSource for OverCounting {
    fn max_id(&self, entity: &str) -> Result<u64> {
        self.0.max_id(entity)
    }

    fn fetch_range(&self, entity: &str, min: u64, max: u64) -> Result<Vec<Row>> {
        self.0.fetch_range(entity, min, max)
    }

    fn row_count(&self, entity: &str, max_id: u64) -> Result<u64> {
        Ok(self.0.row_count(entity, max_id)? + 1)
    }
}

#[test]
fn test_failed_entity_does_not_stop_the_others() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());

    // No release table: its build fails, label and artist still build
    let mut source = labels(1..=5);
    source.insert("artist", Row::new(1).column("name", "Björk"));

    let reports = build(&services, source, &["label", "release", "artist"]);
    assert_eq!(reports.len(), 3);

    assert!(reports[0].is_success());
    assert_eq!(reports[0].documents, 5);

    assert_eq!(reports[1].entity, "release");
    assert_eq!(reports[1].state, BuildState::Failed);
    assert_eq!(reports[1].failed_in, Some(BuildState::SchemaReady));
    assert!(reports[1].error.as_deref().unwrap().contains("release"));

    assert!(reports[2].is_success());
    assert_eq!(reports[2].documents, 1);

    let results = services.search("label", "label", 0, Some(10)).unwrap();
    assert_eq!(results.total_hits, 5);
}

#[test]
fn test_bad_row_fails_its_entity_and_keeps_previous_generation() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());

    let reports = build(&services, labels(1..=3), &["label"]);
    assert!(reports[0].is_success());
    assert_eq!(services.search("label", "label", 0, None).unwrap().total_hits, 3);

    // Row 7 has no name, which the label catalogue requires
    let mut broken = labels(1..=6);
    broken.insert("label", Row::new(7).column("comment", "unnamed"));
    let reports = build(&services, broken, &["label"]);

    assert_eq!(reports[0].state, BuildState::Failed);
    assert!(matches!(
        reports[0].failed_in,
        Some(BuildState::Scanning { .. }) | Some(BuildState::Flushing)
    ));
    assert!(reports[0].error.as_deref().unwrap().contains("row 7"));

    // Nothing of the failed build was committed
    services.reload("label").unwrap();
    assert_eq!(services.search("label", "label", 0, None).unwrap().total_hits, 3);
    let info = services.store.read_build_info("label").unwrap().unwrap();
    assert_eq!(info.documents, 3);
}

#[test]
fn test_rows_on_chunk_boundaries_are_indexed() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());

    // Chunk size 4: ids 0 and 8 sit on boundaries and 8 is the max id
    let reports = build(&services, labels([0, 3, 4, 7, 8]), &["label"]);
    let report = &reports[0];

    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.documents, 5);
    assert!(report.verified());
    assert_eq!(report.chunks, 3);
}

#[test]
fn test_count_mismatch_is_logged_not_fatal() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());

    let orchestrator = services.create_orchestrator(Arc::new(OverCounting(labels(1..=4))));
    let report = orchestrator.build_entity("label");

    assert!(report.is_success());
    assert_eq!(report.documents, 4);
    assert_eq!(report.expected_rows, Some(5));
    assert!(!report.verified());
}

#[test]
fn test_empty_entity_builds_marker_only_index() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());

    let mut source = MemorySource::new();
    source.register("label");
    let reports = build(&services, source, &["label"]);

    assert!(reports[0].is_success());
    assert_eq!(reports[0].documents, 0);
    assert!(reports[0].verified());

    let results = services.search("label", "anything", 0, None).unwrap();
    assert_eq!(results.total_hits, 0);
    assert!(services.server("label").unwrap().last_updated().is_some());
}

#[test]
fn test_release_build_covers_every_row() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());

    let reports = build(&services, release_source(23), &["release"]);
    assert!(reports[0].is_success());
    assert_eq!(reports[0].documents, 23);
    assert_eq!(reports[0].expected_rows, Some(23));
}
