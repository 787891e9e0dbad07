//! Code property graph store
//!
//! Holds Joern-style program graphs (AST, CFG, data and control dependence)
//! and answers the three queries the feature extractor needs:
//!
//! 1. sample directories (`CodePropertyGraph::directories`)
//! 2. function entry points under a directory (`CodePropertyGraph::entry_points`)
//! 3. bounded flow paths from an entry point (`CodePropertyGraph::flow_paths`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use codegraph_graphdb::{infrastructure::json, FlowQuery, SamplePattern};
//!
//! let cpg = json::open_graph(Path::new("graph.json"))?;
//! for dir in cpg.directories(&SamplePattern::new(".*__[^/]*")?) {
//!     for entry in cpg.entry_points(dir.id, &[])? {
//!         let paths = cpg.flow_paths(entry, &FlowQuery::default())?;
//!     }
//! }
//! ```

pub mod domain;
pub mod error;
pub mod graph;
pub mod infrastructure;

pub use domain::{EdgeKind, EdgeRecord, GraphSnapshot, NodeRecord};
pub use error::{ErrorKind, GraphStoreError, Result};
pub use graph::{CodePropertyGraph, FlowPath, FlowQuery, HopRange, SamplePattern};

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteGraphStore;
