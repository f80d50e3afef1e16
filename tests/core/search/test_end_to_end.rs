// End-to-end search tests over built indexes

use crate::common::{build, create_test_services, release_source};
use catalog_search::core::error::CatalogError;
use catalog_search::core::search::{Encoding, SchemaVersion};
use catalog_search::core::services::Services;
use tempfile::TempDir;

fn release_services(temp: &TempDir, count: u64) -> Services {
    let services = create_test_services(temp.path());
    let reports = build(&services, release_source(count), &["release"]);
    assert!(reports[0].is_success(), "{:?}", reports[0]);
    services
}

#[test]
fn test_exact_release_title_lookup() {
    let temp = TempDir::new().unwrap();
    let services = release_services(&temp, 12);

    let results = services
        .search("release", r#"release:"Our Glorious 5 Year Plan""#, 0, None)
        .unwrap();

    assert_eq!(results.total_hits, 1);
    assert_eq!(results.results.len(), 1);
    let hit = &results.results[0];
    assert_eq!(hit.score, 1.0);
    assert_eq!(hit.document.get("_id"), Some("1"));
    assert_eq!(hit.document.get("release"), Some("Our Glorious 5 Year Plan"));
    assert_eq!(hit.document.get("artist"), Some("Farming Incident"));
    assert_eq!(hit.document.get("tracks"), Some("10"));
    assert_eq!(hit.document.get_all("label"), vec!["Cherry Red"]);
}

#[test]
fn test_missing_title_returns_no_hits() {
    let temp = TempDir::new().unwrap();
    let services = release_services(&temp, 12);

    let results = services
        .search("release", r#"release:"Our Inglorious 6 Year Plan""#, 0, None)
        .unwrap();
    assert_eq!(results.total_hits, 0);
    assert!(results.results.is_empty());
}

#[test]
fn test_field_qualifiers_and_fallback() {
    let temp = TempDir::new().unwrap();
    let services = release_services(&temp, 12);

    let by_artist = services
        .search("release", r#"artist:"Farming Incident""#, 0, None)
        .unwrap();
    assert_eq!(by_artist.total_hits, 1);

    // Unknown qualifiers are dropped and the value searched in default fields
    let fallback = services.search("release", "planet:glorious", 0, None).unwrap();
    assert_eq!(fallback.total_hits, 1);
    assert_eq!(fallback.results[0].document.get("_id"), Some("1"));

    let chained = services.search("release", "a:b:glorious", 0, None).unwrap();
    assert_eq!(chained.total_hits, 1);
    assert_eq!(chained.results[0].document.get("_id"), Some("1"));

    // The marker document never matches
    let compilations = services.search("release", "compilation", 0, Some(100)).unwrap();
    assert_eq!(compilations.total_hits, 11);
    assert!(compilations
        .results
        .iter()
        .all(|hit| hit.document.get("_id").is_some()));
}

#[test]
fn test_scores_are_normalized_by_best_hit() {
    let temp = TempDir::new().unwrap();
    let services = release_services(&temp, 12);

    let results = services
        .search("release", "plan OR compilation OR glorious", 0, Some(20))
        .unwrap();

    assert_eq!(results.total_hits, 12);
    assert_eq!(results.results[0].score, 1.0);
    assert_eq!(results.results[0].document.get("_id"), Some("1"));
    for pair in results.results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!(results
        .results
        .iter()
        .all(|hit| hit.score > 0.0 && hit.score <= 1.0));
}

#[test]
fn test_pages_match_the_unpaginated_ranking() {
    let temp = TempDir::new().unwrap();
    let services = release_services(&temp, 30);
    let query = "compilation OR glorious";

    let full = services.search("release", query, 0, Some(100)).unwrap();
    assert_eq!(full.total_hits, 30);

    let ids = |results: &catalog_search::Results| -> Vec<String> {
        results
            .results
            .iter()
            .map(|hit| hit.document.get("_id").unwrap_or_default().to_string())
            .collect()
    };
    let all_ids = ids(&full);

    for offset in [0, 5, 10, 25, 28] {
        let page = services.search("release", query, offset, Some(5)).unwrap();
        let end = (offset + 5).min(all_ids.len());
        assert_eq!(page.offset, offset);
        assert_eq!(page.total_hits, 30);
        assert_eq!(ids(&page), all_ids[offset..end].to_vec(), "offset {offset}");
        for (hit, expected) in page.results.iter().zip(&full.results[offset..end]) {
            assert_eq!(hit.score, expected.score);
        }
    }

    let past_end = services.search("release", query, 40, Some(5)).unwrap();
    assert!(past_end.results.is_empty());
    assert_eq!(past_end.total_hits, 30);
}

#[test]
fn test_offset_past_total_returns_empty_page() {
    let temp = TempDir::new().unwrap();
    let services = release_services(&temp, 3);

    let results = services.search("release", "compilation", 5, Some(10)).unwrap();
    assert_eq!(results.offset, 5);
    assert_eq!(results.total_hits, 2);
    assert!(results.results.is_empty());
}

#[test]
fn test_huge_offset_does_not_overflow() {
    let temp = TempDir::new().unwrap();
    let services = release_services(&temp, 3);

    for offset in [usize::MAX - 5, usize::MAX, 10_000_000_000] {
        let results = services.search("release", "plan", offset, Some(10)).unwrap();
        assert_eq!(results.offset, offset);
        assert_eq!(results.total_hits, 1);
        assert!(results.results.is_empty());

        let explanation = services.explain("release", "plan", offset, Some(10)).unwrap();
        assert!(explanation.contains("Total hits: 1"));
        assert!(!explanation.contains("_id="));
    }

    // Dismax queries take the same window
    build(&services, crate::common::artist_source(), &["artist"]);
    let results = services
        .search("artist", "Sigur Rós", usize::MAX - 5, Some(10))
        .unwrap();
    assert_eq!(results.total_hits, 3);
    assert!(results.results.is_empty());
}

#[test]
fn test_limit_is_clamped_to_max_limit() {
    let temp = TempDir::new().unwrap();
    let mut config = crate::common::test_config(temp.path());
    config.search.max_limit = 3;
    config.search.default_limit = 3;
    let services = Services::new(config).unwrap();
    build(&services, release_source(10), &["release"]);

    let results = services.search("release", "compilation", 0, Some(50)).unwrap();
    assert_eq!(results.results.len(), 3);
    assert_eq!(results.total_hits, 9);
}

#[test]
fn test_bad_queries_are_rejected() {
    let temp = TempDir::new().unwrap();
    let services = release_services(&temp, 3);

    let err = services.search("release", "\"unterminated", 0, None).unwrap_err();
    assert!(err.is_bad_request(), "{err:?}");

    let long = "plan ".repeat(200);
    let err = services.search("release", &long, 0, None).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidQuery(_)));

    let empty = services.search("release", "   ", 0, None).unwrap();
    assert_eq!(empty.total_hits, 0);
}

#[test]
fn test_explain_shows_query_and_hits() {
    let temp = TempDir::new().unwrap();
    let services = release_services(&temp, 5);

    let explanation = services.explain("release", "glorious", 0, Some(3)).unwrap();
    assert!(explanation.contains("Entity: release (standard parser)"));
    assert!(explanation.contains("Total hits: 1"));
    assert!(explanation.contains("0: score 100.0%"));
    assert!(explanation.contains("_id=1 | release=Our Glorious 5 Year Plan"));
}

#[test]
fn test_render_both_schema_versions() {
    let temp = TempDir::new().unwrap();
    let services = release_services(&temp, 5);
    let results = services.search("release", "glorious", 0, None).unwrap();
    let server = services.server("release").unwrap();

    let v1: serde_json::Value = serde_json::from_str(
        &server
            .render(&results, SchemaVersion::V1, Encoding::Json)
            .unwrap(),
    )
    .unwrap();
    assert_eq!(v1["search_results"]["total"], 1);
    assert_eq!(v1["search_results"]["hits"][0]["score"], 100);
    assert_eq!(
        v1["search_results"]["hits"][0]["fields"]["release"],
        "Our Glorious 5 Year Plan"
    );

    let v2: serde_json::Value = serde_json::from_str(
        &server
            .render(&results, SchemaVersion::V2, Encoding::Json)
            .unwrap(),
    )
    .unwrap();
    assert_eq!(v2["count"], 1);
    assert_eq!(v2["offset"], 0);
    assert_eq!(v2["releases"][0]["artist"], "Farming Incident");
    assert!(v2["created"].is_string());
}
