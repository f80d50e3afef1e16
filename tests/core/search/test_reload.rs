// Reload consistency tests

use crate::common::{build, create_test_services};
use catalog_search::core::source::MemorySource;
use catalog_search::core::types::Row;
use std::sync::Arc;
use tempfile::TempDir;

fn labels(count: u64) -> MemorySource {
    MemorySource::new().with_rows(
        "label",
        (1..=count).map(|id| Row::new(id).column("name", format!("Label {id}"))),
    )
}

#[test]
fn test_held_snapshot_survives_rebuild_and_reload() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());
    build(&services, labels(3), &["label"]);

    let server = services.server("label").unwrap();
    let held = server.snapshot();
    assert_eq!(held.version(), 1);
    assert_eq!(held.num_docs(), 4); // 3 labels + marker
    let first_build = held.last_updated().unwrap();

    build(&services, labels(5), &["label"]);

    // Not visible until reload
    assert_eq!(services.search("label", "label", 0, None).unwrap().total_hits, 3);

    assert!(services.reload("label").unwrap());
    let current = server.snapshot();
    assert_eq!(current.version(), 2);
    assert!(current.opstamp() > held.opstamp());
    assert!(current.last_updated().unwrap() >= first_build);
    assert_eq!(services.search("label", "label", 0, None).unwrap().total_hits, 5);

    // The held generation is untouched
    assert_eq!(held.version(), 1);
    assert_eq!(held.num_docs(), 4);
    assert_eq!(held.last_updated(), Some(first_build));

    // Nothing newer on disk
    assert!(!services.reload("label").unwrap());
    assert_eq!(server.snapshot().version(), 2);
}

#[test]
fn test_reload_all_reports_each_open_entity() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());
    let mut source = labels(2);
    source.insert("artist", Row::new(1).column("name", "Björk"));
    build(&services, source, &["label", "artist"]);

    assert_eq!(services.open_all().unwrap(), vec!["artist", "label"]);
    build(&services, labels(4), &["label"]);

    let outcomes = services.reload_all();
    assert_eq!(outcomes.len(), 2);
    for (entity, outcome) in outcomes {
        let reloaded = outcome.unwrap();
        assert_eq!(reloaded, entity == "label", "{entity}");
    }
}

#[test]
fn test_concurrent_searches_see_whole_generations() {
    let temp = TempDir::new().unwrap();
    let services = Arc::new(create_test_services(temp.path()));
    build(&services, labels(3), &["label"]);
    services.server("label").unwrap();

    std::thread::scope(|scope| {
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let services = Arc::clone(&services);
                scope.spawn(move || {
                    for _ in 0..50 {
                        let results = services.search("label", "label", 0, Some(10)).unwrap();
                        // Total and page always come from the same generation
                        assert!(
                            results.total_hits == 3 || results.total_hits == 6,
                            "unexpected total {}",
                            results.total_hits
                        );
                        assert_eq!(results.results.len(), results.total_hits);
                    }
                })
            })
            .collect();

        build(&services, labels(6), &["label"]);
        services.reload("label").unwrap();

        for reader in readers {
            reader.join().expect("reader panicked");
        }
    });

    assert_eq!(services.search("label", "label", 0, None).unwrap().total_hits, 6);
}
