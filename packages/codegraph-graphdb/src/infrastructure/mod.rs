//! Infrastructure layer - graph store adapters
//!
//! - `json`: Joern/Neo4j style JSON exports
//! - `sqlite`: persistent SQLite store

pub mod json;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteGraphStore;
