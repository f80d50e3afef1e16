// Integration tests for dismax ranking

use crate::common::{
    artist_source, build, create_test_services, services_with_catalog, test_config,
    track_catalog, track_source,
};
use catalog_search::core::search::{DismaxConfig, DismaxField};
use catalog_search::core::services::Services;
use std::path::Path;
use tempfile::TempDir;

fn ids(services: &Services, entity: &str, query: &str) -> Vec<String> {
    services
        .search(entity, query, 0, Some(25))
        .unwrap()
        .results
        .iter()
        .map(|hit| hit.document.get("_id").unwrap_or_default().to_string())
        .collect()
}

fn track_services(dir: &Path, title_boost: f32, alt_boost: f32) -> Services {
    let mut config = test_config(dir);
    config.search.dismax.insert(
        "track".to_string(),
        DismaxConfig {
            tie: 0.1,
            fields: vec![
                DismaxField::new("title", title_boost, true),
                DismaxField::new("alt", alt_boost, true),
            ],
        },
    );
    let services = services_with_catalog(dir, track_catalog(), Some(config));
    let reports = build(&services, track_source(), &["track"]);
    assert!(reports[0].is_success(), "{:?}", reports[0]);
    services
}

#[test]
fn test_higher_boost_ranks_higher() {
    let temp = TempDir::new().unwrap();
    let services = track_services(temp.path(), 2.0, 1.0);

    let results = services.search("track", "alpha", 0, None).unwrap();
    assert_eq!(results.total_hits, 2);
    assert_eq!(results.results[0].document.get("_id"), Some("1"));
    assert_eq!(results.results[0].score, 1.0);
    // Mirrored documents: only the boost differs
    assert!((results.results[1].score - 0.5).abs() < 1e-6);
}

#[test]
fn test_raising_a_boost_flips_the_ranking() {
    let temp = TempDir::new().unwrap();
    let services = track_services(temp.path(), 1.0, 3.0);

    assert_eq!(ids(&services, "track", "alpha"), vec!["2", "1"]);
    assert_eq!(ids(&services, "track", "omega"), vec!["1", "2"]);
}

#[test]
fn test_artist_search_prefers_exact_name() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());
    let reports = build(&services, artist_source(), &["artist"]);
    assert!(reports[0].is_success());

    let server = services.server("artist").unwrap();
    assert_eq!(server.parser_kind(), "dismax");

    let accented = services.search("artist", "Sigur Rós", 0, None).unwrap();
    assert_eq!(accented.total_hits, 3);
    assert_eq!(accented.results[0].document.get("_id"), Some("1"));
    assert_eq!(accented.results[0].score, 1.0);

    // Alias and folded name still find the band without the accent
    let plain = ids(&services, "artist", "sigur ros");
    assert_eq!(plain.first().map(String::as_str), Some("1"));
    assert!(plain.contains(&"5".to_string()));

    assert_eq!(ids(&services, "artist", "bjork"), vec!["2"]);
    assert!(ids(&services, "artist", "radiohead").is_empty());
}

#[test]
fn test_dismax_explain_breaks_down_fields() {
    let temp = TempDir::new().unwrap();
    let services = create_test_services(temp.path());
    build(&services, artist_source(), &["artist"]);

    let explanation = services.explain("artist", "Sigur Rós", 0, Some(1)).unwrap();
    assert!(explanation.contains("Entity: artist (dismax parser)"));
    assert!(explanation.contains("dismax[tie=0.1]"));
    assert!(explanation.contains("artistaccent"));
    assert!(explanation.contains("_id=1 | artist=Sigur Rós"));
}

#[test]
fn test_unknown_dismax_field_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path());
    config.search.dismax.insert(
        "track".to_string(),
        DismaxConfig {
            tie: 0.1,
            fields: vec![DismaxField::new("lyrics", 1.0, true)],
        },
    );
    let services = services_with_catalog(temp.path(), track_catalog(), Some(config));
    build(&services, track_source(), &["track"]);

    let err = services.search("track", "alpha", 0, None).unwrap_err();
    assert!(err.is_bad_request(), "{err:?}");
}
