//! Rackdex Library
//!
//! Parses compressed XML rack presets into a normalized domain model,
//! derives comparable feature vectors, and ranks racks by similarity.
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog_store;
pub mod config;
pub mod decode;
pub mod export;
pub mod features;
pub mod rack;
pub mod similarity;
pub mod sqlite_persistence;
pub mod stats;
pub mod summary;

// Re-export commonly used types for convenience
pub use catalog_store::{MemoryRackStore, RackRecord, RackStore, SqliteRackStore};
pub use config::{CliConfig, EngineConfig, FileConfig};
pub use decode::{decode_rack_bytes, decode_rack_file, DecodeError};
pub use features::FeatureVector;
pub use rack::{parse_rack, parse_rack_with_options, ParseError, ParsedRack, Rack};
pub use similarity::{rank, Recommendation, SimilarityWeights};
