//! End-to-end tests for the SQLite catalog: persistence across reopen,
//! schema validation, search and statistics.

mod common;

use common::{bass_rack_xml, channel_strip_xml, gz_bytes, space_rack_xml};
use std::path::Path;
use tempfile::TempDir;

use rackdex::catalog_store::{RackRecord, RackStore, SearchFilters, SqliteRackStore};
use rackdex::decode::decode_rack_bytes;
use rackdex::features::FeatureVector;
use rackdex::rack::parse_rack;

fn ingest(store: &SqliteRackStore, name: &str, xml: &str) {
    let decoded = decode_rack_bytes(&gz_bytes(xml), Path::new(name)).unwrap();
    let parsed = parse_rack(&decoded, name).unwrap();
    let features = FeatureVector::from_rack(&parsed.rack);
    store
        .put(&RackRecord::from_rack(&parsed.rack, &features))
        .unwrap();
}

#[test]
fn test_catalog_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");

    {
        let store = SqliteRackStore::new(&db_path).unwrap();
        ingest(&store, "Channel Strip - Pump", &channel_strip_xml());
        ingest(&store, "Space - Wash", &space_rack_xml());
    }

    // A fresh handle validates the existing schema and sees the data.
    let reopened = SqliteRackStore::new(&db_path).unwrap();
    assert_eq!(reopened.rack_count().unwrap(), 2);
    let stored = reopened
        .get_by_name("Channel Strip - Pump")
        .unwrap()
        .unwrap();
    assert_eq!(stored.features.complexity, 3);
}

#[test]
fn test_open_rejects_foreign_database() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("other.db");

    {
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute("CREATE TABLE something_else (id INTEGER PRIMARY KEY)", [])
            .unwrap();
    }

    assert!(SqliteRackStore::new(&db_path).is_err());
}

#[test]
fn test_search_across_ingested_racks() {
    let dir = TempDir::new().unwrap();
    let store = SqliteRackStore::new(dir.path().join("catalog.db")).unwrap();
    ingest(&store, "Channel Strip - Pump", &channel_strip_xml());
    ingest(&store, "Space - Wash", &space_rack_xml());
    ingest(&store, "Bass - Growl", &bass_rack_xml());

    let with_eq = store
        .search(&SearchFilters {
            device_type: Some("Eq8".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(with_eq.len(), 2);

    let channel = store
        .search(&SearchFilters {
            category: Some("Channel".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(channel.len(), 1);
    assert_eq!(channel[0].name, "Channel Strip - Pump");

    let big = store
        .search(&SearchFilters {
            min_devices: Some(3),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(big.len(), 2);

    let air = store
        .search(&SearchFilters {
            macro_name: Some("Air".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(air.len(), 2);
}

#[test]
fn test_statistics_over_catalog() {
    let dir = TempDir::new().unwrap();
    let store = SqliteRackStore::new(dir.path().join("catalog.db")).unwrap();
    ingest(&store, "Channel Strip - Pump", &channel_strip_xml());
    ingest(&store, "Space - Wash", &space_rack_xml());
    ingest(&store, "Bass - Growl", &bass_rack_xml());

    let stats = store.statistics().unwrap();
    assert_eq!(stats.total_racks, 3);
    assert_eq!(stats.total_devices, 8);
    // Eq8 appears in two racks, everything else once.
    assert_eq!(stats.popular_devices[0], ("Eq8".to_string(), 2));
    assert_eq!(stats.complexity.minimum, 2);
    assert_eq!(stats.complexity.maximum, 3);
    // "Air" is the only macro name used twice.
    assert_eq!(stats.popular_macro_names[0], ("Air".to_string(), 2));
    assert_eq!(stats.categories.len(), 3);
}
