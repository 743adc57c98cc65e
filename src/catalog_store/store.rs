//! SQLite-backed rack store implementation.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use super::models::{
    CatalogStatistics, ComplexityStats, RackDetails, RackRecord, RackSummary, SearchFilters,
    StoredDevice, StoredMacro, StoredRack,
};
use super::schema::CATALOG_SCHEMA;
use super::trait_def::RackStore;
use crate::features::FeatureVector;

/// Rack catalog backed by a single SQLite database file.
pub struct SqliteRackStore {
    conn: Mutex<Connection>,
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating rack catalog schema");
        CATALOG_SCHEMA.create(conn)?;
    } else {
        CATALOG_SCHEMA
            .validate(conn)
            .context("Existing database does not match the rack catalog schema")?;
    }
    Ok(())
}

impl SqliteRackStore {
    /// Open (or create) the catalog database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).with_context(|| {
            format!("Failed to open rack catalog at {:?}", db_path.as_ref())
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        init_schema(&conn)?;

        let rack_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM racks", [], |r| r.get(0))
            .unwrap_or(0);
        info!("Opened rack catalog: {} racks", rack_count);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory catalog, used by tests and one-shot pipelines.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl RackStore for SqliteRackStore {
    fn put(&self, record: &RackRecord) -> Result<i64> {
        let features_json =
            serde_json::to_string(&record.features).context("Failed to serialize features")?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // Replace-by-name; the cascade clears old device and macro rows.
        tx.execute("DELETE FROM racks WHERE name = ?1", params![record.name])?;

        tx.execute(
            "INSERT INTO racks (name, category, total_devices, total_chains, active_macros, \
             complexity, features, source_path) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.name,
                record.category,
                record.total_devices,
                record.total_chains,
                record.active_macros,
                record.complexity,
                features_json,
                record.source_path,
            ],
        )?;
        let rack_id = tx.last_insert_rowid();

        for device in &record.devices {
            tx.execute(
                "INSERT INTO devices (rack_id, chain_name, device_type, device_name, is_on, position) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    rack_id,
                    device.chain_name,
                    device.device_type,
                    device.device_name,
                    device.is_on,
                    device.position,
                ],
            )?;
        }

        for macro_row in &record.macros {
            tx.execute(
                "INSERT INTO macro_controls (rack_id, name, value, position, mapped_params) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    rack_id,
                    macro_row.name,
                    macro_row.value,
                    macro_row.position,
                    macro_row.mapped_params,
                ],
            )?;
        }

        tx.commit()?;
        Ok(rack_id)
    }

    fn get_all(&self) -> Result<Vec<(String, FeatureVector)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT name, features FROM racks ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (name, features_json) = row?;
            let features: FeatureVector = serde_json::from_str(&features_json)
                .with_context(|| format!("Corrupt feature vector for rack '{}'", name))?;
            result.push((name, features));
        }
        Ok(result)
    }

    fn get_by_name(&self, name: &str) -> Result<Option<StoredRack>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, name, features FROM racks WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, name, features_json)) => {
                let features: FeatureVector = serde_json::from_str(&features_json)
                    .with_context(|| format!("Corrupt feature vector for rack '{}'", name))?;
                Ok(Some(StoredRack { id, name, features }))
            }
            None => Ok(None),
        }
    }

    fn get_details(&self, id: i64) -> Result<Option<RackDetails>> {
        let conn = self.conn.lock().unwrap();
        let summary = conn
            .query_row(
                "SELECT id, name, category, total_devices, total_chains, active_macros, complexity \
                 FROM racks WHERE id = ?1",
                params![id],
                |row| {
                    Ok(RackSummary {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        category: row.get(2)?,
                        total_devices: row.get(3)?,
                        total_chains: row.get(4)?,
                        active_macros: row.get(5)?,
                        complexity: row.get(6)?,
                    })
                },
            )
            .optional()?;

        let Some(summary) = summary else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT chain_name, device_type, device_name, is_on, position \
             FROM devices WHERE rack_id = ?1 ORDER BY id",
        )?;
        let devices = stmt
            .query_map(params![id], |row| {
                Ok(StoredDevice {
                    chain_name: row.get(0)?,
                    device_type: row.get(1)?,
                    device_name: row.get(2)?,
                    is_on: row.get(3)?,
                    position: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT name, value, position, mapped_params \
             FROM macro_controls WHERE rack_id = ?1 ORDER BY position",
        )?;
        let macros = stmt
            .query_map(params![id], |row| {
                Ok(StoredMacro {
                    name: row.get(0)?,
                    value: row.get(1)?,
                    position: row.get(2)?,
                    mapped_params: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Some(RackDetails {
            summary,
            devices,
            macros,
        }))
    }

    fn search(&self, filters: &SearchFilters) -> Result<Vec<RackSummary>> {
        let mut sql = String::from(
            "SELECT id, name, category, total_devices, total_chains, active_macros, complexity \
             FROM racks WHERE 1=1",
        );
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(category) = &filters.category {
            sql.push_str(&format!(" AND category LIKE ?{}", bound.len() + 1));
            bound.push(Box::new(format!("%{}%", category)));
        }
        if let Some(min_devices) = filters.min_devices {
            sql.push_str(&format!(" AND total_devices >= ?{}", bound.len() + 1));
            bound.push(Box::new(min_devices));
        }
        if let Some(max_devices) = filters.max_devices {
            sql.push_str(&format!(" AND total_devices <= ?{}", bound.len() + 1));
            bound.push(Box::new(max_devices));
        }
        if let Some(device_type) = &filters.device_type {
            sql.push_str(&format!(
                " AND id IN (SELECT DISTINCT rack_id FROM devices WHERE device_type = ?{})",
                bound.len() + 1
            ));
            bound.push(Box::new(device_type.clone()));
        }
        if let Some(macro_name) = &filters.macro_name {
            sql.push_str(&format!(
                " AND id IN (SELECT DISTINCT rack_id FROM macro_controls WHERE name LIKE ?{})",
                bound.len() + 1
            ));
            bound.push(Box::new(format!("%{}%", macro_name)));
        }
        sql.push_str(" ORDER BY complexity DESC, name ASC");

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let bound_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(&bound_refs[..], |row| {
                Ok(RackSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                    total_devices: row.get(3)?,
                    total_chains: row.get(4)?,
                    active_macros: row.get(5)?,
                    complexity: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn statistics(&self) -> Result<CatalogStatistics> {
        let conn = self.conn.lock().unwrap();

        let total_racks: u32 = conn.query_row("SELECT COUNT(*) FROM racks", [], |r| r.get(0))?;
        let total_devices: u32 =
            conn.query_row("SELECT COUNT(*) FROM devices", [], |r| r.get(0))?;
        let total_macros: u32 =
            conn.query_row("SELECT COUNT(*) FROM macro_controls", [], |r| r.get(0))?;
        let empty_macros: u32 = conn.query_row(
            "SELECT COUNT(*) FROM macro_controls WHERE trim(name) = ''",
            [],
            |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT device_type, COUNT(*) as count FROM devices \
             GROUP BY device_type ORDER BY count DESC, device_type ASC LIMIT 10",
        )?;
        let popular_devices = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<(String, u32)>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT name, COUNT(*) as count FROM macro_controls WHERE trim(name) != '' \
             GROUP BY name ORDER BY count DESC, name ASC LIMIT 10",
        )?;
        let popular_macro_names = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<(String, u32)>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) as count FROM racks \
             GROUP BY category ORDER BY count DESC, category ASC",
        )?;
        let categories = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<(String, u32)>, _>>()?;

        let complexity = if total_racks == 0 {
            ComplexityStats {
                minimum: 0,
                maximum: 0,
                average: 0.0,
            }
        } else {
            conn.query_row(
                "SELECT MIN(complexity), MAX(complexity), AVG(complexity) FROM racks",
                [],
                |row| {
                    Ok(ComplexityStats {
                        minimum: row.get(0)?,
                        maximum: row.get(1)?,
                        average: row.get(2)?,
                    })
                },
            )?
        };

        Ok(CatalogStatistics {
            total_racks,
            total_devices,
            total_macros,
            empty_macros,
            popular_devices,
            popular_macro_names,
            categories,
            complexity,
        })
    }

    fn rack_count(&self) -> Result<u32> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row("SELECT COUNT(*) FROM racks", [], |r| r.get(0))?)
    }
}
