//! In-memory rack store implementation.
//!
//! Backs tests and one-shot runs that have no database on disk. Semantics
//! mirror the SQLite store: replace-by-name, name-ordered listings.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

use super::models::{
    CatalogStatistics, ComplexityStats, RackDetails, RackRecord, RackSummary, SearchFilters,
    StoredDevice, StoredMacro, StoredRack,
};
use super::trait_def::RackStore;
use crate::features::FeatureVector;

#[derive(Default)]
pub struct MemoryRackStore {
    racks: Mutex<HashMap<String, (i64, RackRecord)>>,
    next_id: Mutex<i64>,
}

impl MemoryRackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RackStore for MemoryRackStore {
    fn put(&self, record: &RackRecord) -> Result<i64> {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let id = *next_id;
        self.racks
            .lock()
            .unwrap()
            .insert(record.name.clone(), (id, record.clone()));
        Ok(id)
    }

    fn get_all(&self) -> Result<Vec<(String, FeatureVector)>> {
        let racks = self.racks.lock().unwrap();
        let mut all: Vec<(String, FeatureVector)> = racks
            .values()
            .map(|(_, r)| (r.name.clone(), r.features.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(all)
    }

    fn get_by_name(&self, name: &str) -> Result<Option<StoredRack>> {
        Ok(self.racks.lock().unwrap().get(name).map(|(id, r)| StoredRack {
            id: *id,
            name: r.name.clone(),
            features: r.features.clone(),
        }))
    }

    fn get_details(&self, id: i64) -> Result<Option<RackDetails>> {
        let racks = self.racks.lock().unwrap();
        let Some((stored_id, record)) = racks.values().find(|(i, _)| *i == id) else {
            return Ok(None);
        };
        Ok(Some(RackDetails {
            summary: summary_of(*stored_id, record),
            devices: record
                .devices
                .iter()
                .map(|d| StoredDevice {
                    chain_name: d.chain_name.clone(),
                    device_type: d.device_type.clone(),
                    device_name: d.device_name.clone(),
                    is_on: d.is_on,
                    position: d.position,
                })
                .collect(),
            macros: record
                .macros
                .iter()
                .map(|m| StoredMacro {
                    name: m.name.clone(),
                    value: m.value,
                    position: m.position,
                    mapped_params: m.mapped_params,
                })
                .collect(),
        }))
    }

    fn search(&self, filters: &SearchFilters) -> Result<Vec<RackSummary>> {
        let racks = self.racks.lock().unwrap();
        let mut hits: Vec<RackSummary> = racks
            .values()
            .filter(|(_, r)| {
                filters
                    .category
                    .as_ref()
                    .map_or(true, |c| r.category.contains(c.as_str()))
                    && filters.min_devices.map_or(true, |n| r.total_devices >= n)
                    && filters.max_devices.map_or(true, |n| r.total_devices <= n)
                    && filters.device_type.as_ref().map_or(true, |t| {
                        r.devices.iter().any(|d| d.device_type == *t)
                    })
                    && filters.macro_name.as_ref().map_or(true, |m| {
                        r.macros.iter().any(|row| row.name.contains(m.as_str()))
                    })
            })
            .map(|(id, r)| summary_of(*id, r))
            .collect();
        hits.sort_by(|a, b| b.complexity.cmp(&a.complexity).then(a.name.cmp(&b.name)));
        Ok(hits)
    }

    fn statistics(&self) -> Result<CatalogStatistics> {
        let racks = self.racks.lock().unwrap();

        let mut device_counts: HashMap<String, u32> = HashMap::new();
        let mut macro_counts: HashMap<String, u32> = HashMap::new();
        let mut category_counts: HashMap<String, u32> = HashMap::new();
        let mut total_macros = 0u32;
        let mut empty_macros = 0u32;
        let mut complexities = Vec::new();

        for (_, record) in racks.values() {
            complexities.push(record.complexity);
            *category_counts.entry(record.category.clone()).or_insert(0) += 1;
            for device in &record.devices {
                *device_counts.entry(device.device_type.clone()).or_insert(0) += 1;
            }
            for macro_row in &record.macros {
                total_macros += 1;
                if macro_row.name.trim().is_empty() {
                    empty_macros += 1;
                } else {
                    *macro_counts.entry(macro_row.name.clone()).or_insert(0) += 1;
                }
            }
        }

        let complexity = if complexities.is_empty() {
            ComplexityStats {
                minimum: 0,
                maximum: 0,
                average: 0.0,
            }
        } else {
            ComplexityStats {
                minimum: *complexities.iter().min().unwrap(),
                maximum: *complexities.iter().max().unwrap(),
                average: f64::from(complexities.iter().sum::<u32>())
                    / complexities.len() as f64,
            }
        };

        Ok(CatalogStatistics {
            total_racks: racks.len() as u32,
            total_devices: device_counts.values().sum(),
            total_macros,
            empty_macros,
            popular_devices: top_counts(device_counts, Some(10)),
            popular_macro_names: top_counts(macro_counts, Some(10)),
            categories: top_counts(category_counts, None),
            complexity,
        })
    }

    fn rack_count(&self) -> Result<u32> {
        Ok(self.racks.lock().unwrap().len() as u32)
    }
}

fn summary_of(id: i64, record: &RackRecord) -> RackSummary {
    RackSummary {
        id,
        name: record.name.clone(),
        category: record.category.clone(),
        total_devices: record.total_devices,
        total_chains: record.total_chains,
        active_macros: record.active_macros,
        complexity: record.complexity,
    }
}

fn top_counts(counts: HashMap<String, u32>, limit: Option<usize>) -> Vec<(String, u32)> {
    let mut sorted: Vec<(String, u32)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    if let Some(limit) = limit {
        sorted.truncate(limit);
    }
    sorted
}
