//! RackStore trait definition.
//!
//! The similarity engine and the reporting layer only ever talk to this
//! trait, so they can run against the SQLite store or an in-memory one.

use anyhow::Result;

use super::models::{
    CatalogStatistics, RackDetails, RackRecord, RackSummary, SearchFilters, StoredRack,
};
use crate::features::FeatureVector;

/// Storage boundary for parsed rack records.
pub trait RackStore: Send + Sync {
    /// Persist one parsed rack, all-or-nothing. A rack with the same name
    /// replaces the previous record. Returns the stored identifier.
    fn put(&self, record: &RackRecord) -> Result<i64>;

    /// `(identifier, feature vector)` for every stored rack. The identifier
    /// is the rack name, which is unique in the catalog.
    fn get_all(&self) -> Result<Vec<(String, FeatureVector)>>;

    /// Resolve one rack by its unique name.
    fn get_by_name(&self, name: &str) -> Result<Option<StoredRack>>;

    /// Full stored detail of one rack.
    fn get_details(&self, id: i64) -> Result<Option<RackDetails>>;

    /// Filtered summaries, most complex first.
    fn search(&self, filters: &SearchFilters) -> Result<Vec<RackSummary>>;

    /// Catalog-wide aggregates.
    fn statistics(&self) -> Result<CatalogStatistics>;

    /// Number of racks currently stored.
    fn rack_count(&self) -> Result<u32>;
}
