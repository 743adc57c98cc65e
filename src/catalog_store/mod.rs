mod memory_store;
mod models;
mod schema;
mod store;
mod trait_def;

pub use memory_store::MemoryRackStore;
pub use models::{
    CatalogStatistics, ComplexityStats, DeviceRow, MacroRow, RackDetails, RackRecord,
    RackSummary, SearchFilters, StoredDevice, StoredMacro, StoredRack,
};
pub use store::SqliteRackStore;
pub use trait_def::RackStore;
