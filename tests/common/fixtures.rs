// Test fixtures: small catalogues of rows

use catalog_search::core::schema::SchemaCatalog;
use catalog_search::core::source::MemorySource;
use catalog_search::core::types::Row;

/// The release used by the end-to-end lookup tests
#[allow(dead_code)] // Used in integration tests
pub fn glorious_release() -> Row {
    Row::new(1)
        .column("gid", "2d5e8c1f-6a4b-4f8e-9a57-1f0c5c7d8e01")
        .column("name", "Our Glorious 5 Year Plan")
        .column("artist", "Farming Incident")
        .column("num_tracks", "10")
        .child("label", "Cherry Red")
}

/// Releases 1..=`count`, release 1 being [`glorious_release`]
#[allow(dead_code)] // Used in integration tests
pub fn release_source(count: u64) -> MemorySource {
    let mut source = MemorySource::new().with_rows("release", [glorious_release()]);
    for id in 2..=count {
        source.insert(
            "release",
            Row::new(id)
                .column("gid", format!("00000000-0000-0000-0000-{id:012}"))
                .column("name", format!("Compilation Volume {id}"))
                .column("artist", "Various Artists")
                .column("num_tracks", (id % 20 + 1).to_string()),
        );
    }
    source
}

/// A handful of artists with accented and aliased names
#[allow(dead_code)] // Used in integration tests
pub fn artist_source() -> MemorySource {
    MemorySource::new().with_rows(
        "artist",
        [
            Row::new(1)
                .column("name", "Sigur Rós")
                .column("sortname", "Sigur Rós")
                .column("type", "Group")
                .column("country", "IS")
                .child("alias", "Sigur Ros"),
            Row::new(2)
                .column("name", "Björk")
                .column("sortname", "Björk")
                .column("type", "Person")
                .column("country", "IS")
                .child("alias", "Bjork"),
            Row::new(3)
                .column("name", "Sigur Rós Tribute Band")
                .column("sortname", "Sigur Rós Tribute Band")
                .column("type", "Group"),
            Row::new(5)
                .column("name", "Jónsi")
                .column("sortname", "Jónsi")
                .column("type", "Person")
                .child("alias", "Jon Thor Birgisson")
                .child("alias", "Jónsi of Sigur Rós"),
        ],
    )
}

/// Catalogue with one two-field entity used to probe dismax boosts
#[allow(dead_code)] // Used in integration tests
pub const TRACK_CATALOG: &str = r#"
[[entity]]
name = "track"
default_fields = ["title", "alt"]

[[entity.field]]
name = "_id"
source = "id"
stored = true
indexing = "not_analyzed"
required = true

[[entity.field]]
name = "title"
source = { column = "title" }
stored = true

[[entity.field]]
name = "alt"
source = { column = "alt" }
stored = true
"#;

#[allow(dead_code)] // Used in integration tests
pub fn track_catalog() -> SchemaCatalog {
    SchemaCatalog::from_toml_str(TRACK_CATALOG).expect("track catalogue should parse")
}

/// Two tracks that mirror each other: the query word sits in `title` of
/// one and in `alt` of the other, with identical field lengths
#[allow(dead_code)] // Used in integration tests
pub fn track_source() -> MemorySource {
    MemorySource::new().with_rows(
        "track",
        [
            Row::new(1).column("title", "alpha").column("alt", "omega"),
            Row::new(2).column("title", "omega").column("alt", "alpha"),
        ],
    )
}
