//! SQLite schema for the rack catalog database.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

const RACK_FK: ForeignKey = ForeignKey {
    foreign_table: "racks",
    foreign_column: "id",
    cascade_delete: true,
};

/// Racks table - one row per ingested preset. The feature vector is stored
/// as its canonical JSON form; the flattened rows below exist for querying.
const RACKS_TABLE: Table = Table {
    name: "racks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!("total_devices", &SqlType::Integer, non_null = true),
        sqlite_column!("total_chains", &SqlType::Integer, non_null = true),
        sqlite_column!("active_macros", &SqlType::Integer, non_null = true),
        sqlite_column!("complexity", &SqlType::Integer, non_null = true),
        sqlite_column!("features", &SqlType::Text, non_null = true),
        sqlite_column!("source_path", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        ("idx_racks_category", "category"),
        ("idx_racks_complexity", "complexity"),
    ],
};

/// Devices table - flattened recursive descent, chain-scoped positions.
const DEVICES_TABLE: Table = Table {
    name: "devices",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "rack_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&RACK_FK)
        ),
        sqlite_column!("chain_name", &SqlType::Text, non_null = true),
        sqlite_column!("device_type", &SqlType::Text, non_null = true),
        sqlite_column!("device_name", &SqlType::Text, non_null = true),
        sqlite_column!("is_on", &SqlType::Integer, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_devices_rack", "rack_id"),
        ("idx_devices_type", "device_type"),
    ],
};

/// Macro controls table - document order preserved in `position`.
const MACRO_CONTROLS_TABLE: Table = Table {
    name: "macro_controls",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "rack_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&RACK_FK)
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("value", &SqlType::Real, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!("mapped_params", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_macro_controls_rack", "rack_id")],
};

pub const CATALOG_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[RACKS_TABLE, DEVICES_TABLE, MACRO_CONTROLS_TABLE],
};
