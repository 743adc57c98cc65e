mod versioned_schema;

pub use versioned_schema::{
    Column, ForeignKey, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
