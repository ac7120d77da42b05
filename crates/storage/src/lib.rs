//! RocksDB-backed `PositionalIndex` and SQLite-backed relational
//! collaborator for corpusql.

mod encoding;
mod relational;
mod rocks_index;

pub use relational::{create_schema, SqliteRelationalStore};
pub use rocks_index::RocksPositionalIndex;
