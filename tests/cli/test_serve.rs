//! Tests for the line-delimited serve loop

use super::test_helpers::create_cli_test_services;
use crate::common::{artist_source, build, release_source};
use catalog_search::cli::commands::serve::{serve_lines, spawn_reloader};
use catalog_search::core::search::SchemaVersion;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

fn answers(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each answer is one JSON line"))
        .collect()
}

#[tokio::test]
async fn test_serve_answers_every_line() {
    let (services, _temp) = create_cli_test_services();
    build(&services, release_source(8), &["release"]);
    build(&services, artist_source(), &["artist"]);

    let input = concat!(
        "release\trelease:\"Our Glorious 5 Year Plan\"\n",
        "\n",
        "artist\tSigur Rós\t0\t1\n",
        "planet\tmars\n",
        "release with no tab\n",
        "release\t\"unbalanced\n",
    );
    let mut output = Vec::new();
    let answered = serve_lines(
        Arc::clone(&services),
        input.as_bytes(),
        &mut output,
        SchemaVersion::V2,
    )
    .await
    .unwrap();

    assert_eq!(answered, 5);
    let answers = answers(&output);
    assert_eq!(answers.len(), 5);

    assert_eq!(answers[0]["count"], 1);
    assert_eq!(answers[0]["releases"][0]["_id"], "1");
    assert_eq!(answers[0]["releases"][0]["score"], 100);

    assert_eq!(answers[1]["count"], 3);
    assert_eq!(answers[1]["artists"].as_array().unwrap().len(), 1);
    assert_eq!(answers[1]["artists"][0]["artist"], "Sigur Rós");

    assert_eq!(answers[2]["error"]["kind"], "not_found");
    assert_eq!(answers[2]["error"]["entity"], "planet");
    assert_eq!(answers[3]["error"]["kind"], "bad_request");
    assert_eq!(answers[4]["error"]["kind"], "bad_request");
}

#[tokio::test]
async fn test_serve_v1_schema() {
    let (services, _temp) = create_cli_test_services();
    build(&services, release_source(3), &["release"]);

    let mut output = Vec::new();
    serve_lines(
        Arc::clone(&services),
        "release\tglorious\n".as_bytes(),
        &mut output,
        SchemaVersion::V1,
    )
    .await
    .unwrap();

    let answers = answers(&output);
    assert_eq!(answers[0]["search_results"]["total"], 1);
    assert_eq!(answers[0]["search_results"]["entity"], "release");
}

#[tokio::test]
async fn test_serve_survives_huge_offsets() {
    let (services, _temp) = create_cli_test_services();
    build(&services, release_source(3), &["release"]);

    let input = format!(
        "release\tplan\t{}\t10\nrelease\tplan\t{}\nrelease\tplan\n",
        usize::MAX - 5,
        u128::MAX
    );
    let mut output = Vec::new();
    serve_lines(
        Arc::clone(&services),
        input.as_bytes(),
        &mut output,
        SchemaVersion::V2,
    )
    .await
    .unwrap();

    let answers = answers(&output);
    assert_eq!(answers.len(), 3);
    assert_eq!(answers[0]["count"], 1);
    assert!(answers[0]["releases"].as_array().unwrap().is_empty());
    assert_eq!(answers[1]["error"]["kind"], "bad_request");
    assert_eq!(answers[2]["releases"][0]["_id"], "1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reloader_picks_up_rebuilds() {
    let (services, _temp) = create_cli_test_services();
    build(&services, release_source(3), &["release"]);
    assert_eq!(services.search("release", "compilation", 0, None).unwrap().total_hits, 2);

    let reloader = spawn_reloader(Arc::clone(&services), Duration::from_millis(50));

    let rebuild = Arc::clone(&services);
    tokio::task::spawn_blocking(move || build(&rebuild, release_source(6), &["release"]))
        .await
        .unwrap();

    let mut total = 0;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        total = services.search("release", "compilation", 0, None).unwrap().total_hits;
        if total == 5 {
            break;
        }
    }
    reloader.abort();

    assert_eq!(total, 5);
    assert_eq!(services.server("release").unwrap().snapshot().version(), 2);
}
