//! Graph-query port implementations
//!
//! - graphdb_adapter - code property graph store (JSON export or SQLite)
//! - memory          - canned samples and paths, with failure injection

pub mod graphdb_adapter;
pub mod memory;

pub use graphdb_adapter::GraphDbAdapter;
pub use memory::InMemoryAdapter;
