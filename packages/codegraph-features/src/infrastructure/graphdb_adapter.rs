//! Adapter over the code property graph store
//!
//! Samples are `Directory` nodes whose path matches the configured pattern;
//! the sample id is the full directory path.

use crate::config::{ConfigResult, SampleConfig, TraversalConfig};
use crate::ports::{AdapterError, GraphQueryAdapter};
use crate::shared::{EntryPoint, RawPathRecord, SampleDescriptor};
use codegraph_graphdb::{CodePropertyGraph, FlowQuery, GraphStoreError};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

pub struct GraphDbAdapter {
    graph: CodePropertyGraph,
    samples: SampleConfig,
    query: FlowQuery,
    /// sample id (directory path) -> directory node id, in path order
    directories: Vec<(String, i64)>,
    index: HashMap<String, i64>,
}

impl GraphDbAdapter {
    pub fn new(
        graph: CodePropertyGraph,
        samples: SampleConfig,
        traversal: &TraversalConfig,
    ) -> ConfigResult<Self> {
        let pattern = samples.sample_pattern()?;
        let directories: Vec<(String, i64)> = graph
            .directories(&pattern)
            .into_iter()
            .filter_map(|dir| {
                dir.property_str(codegraph_graphdb::domain::PROP_FILEPATH)
                    .map(|path| (path.to_string(), dir.id))
            })
            .collect();
        let index = directories.iter().cloned().collect();
        debug!(
            "Indexed {} sample directories matching '{}'",
            directories.len(),
            pattern.as_str()
        );

        Ok(Self {
            graph,
            samples,
            query: traversal.to_flow_query(),
            directories,
            index,
        })
    }

    /// Open a JSON graph export
    pub fn from_json(
        path: &Path,
        samples: SampleConfig,
        traversal: &TraversalConfig,
    ) -> Result<Self, AdapterError> {
        let graph = codegraph_graphdb::infrastructure::json::open_graph(path).map_err(map_store_error)?;
        Self::new(graph, samples, traversal).map_err(|e| AdapterError::Connection(e.to_string()))
    }

    /// Open an existing SQLite graph store
    #[cfg(feature = "sqlite")]
    pub fn from_sqlite(
        path: &Path,
        samples: SampleConfig,
        traversal: &TraversalConfig,
    ) -> Result<Self, AdapterError> {
        let store = codegraph_graphdb::SqliteGraphStore::open_existing(path).map_err(map_store_error)?;
        let graph = store.load_graph().map_err(map_store_error)?;
        Self::new(graph, samples, traversal).map_err(|e| AdapterError::Connection(e.to_string()))
    }

    pub fn graph(&self) -> &CodePropertyGraph {
        &self.graph
    }
}

impl GraphQueryAdapter for GraphDbAdapter {
    fn list_samples(&self) -> Result<Vec<SampleDescriptor>, AdapterError> {
        Ok(self
            .directories
            .iter()
            .map(|(path, _)| SampleDescriptor::new(path.clone(), self.samples.is_positive(path)))
            .collect())
    }

    fn list_entry_points(&self, sample_id: &str) -> Result<Vec<EntryPoint>, AdapterError> {
        let directory = self
            .index
            .get(sample_id)
            .ok_or_else(|| AdapterError::Query(format!("unknown sample '{}'", sample_id)))?;
        let entries = self
            .graph
            .entry_points(*directory, &self.samples.skip_functions)
            .map_err(map_store_error)?;
        Ok(entries.into_iter().map(EntryPoint).collect())
    }

    fn list_flow_patterns(&self, entry: EntryPoint) -> Result<Vec<RawPathRecord>, AdapterError> {
        let paths = self
            .graph
            .flow_paths(entry.0, &self.query)
            .map_err(map_store_error)?;
        Ok(paths
            .into_iter()
            .map(|path| RawPathRecord {
                source_shape: path.source_types,
                flow_edges: path.flow.into_iter().map(String::from).collect(),
                sink_shape: path.sink_types,
            })
            .collect())
    }
}

fn map_store_error(err: GraphStoreError) -> AdapterError {
    if err.is_connection() {
        AdapterError::Connection(err.to_string())
    } else {
        AdapterError::Query(err.to_string())
    }
}
