//! JSON graph exports
//!
//! File layout is the serde form of `GraphSnapshot`:
//!
//! ```json
//! {
//!   "nodes": [{"id": 1, "type": "CFGEntryNode", "labels": [], "properties": {}}],
//!   "edges": [{"src": 1, "dst": 2, "type": "FLOWS_TO"}]
//! }
//! ```

use crate::domain::GraphSnapshot;
use crate::error::{GraphStoreError, Result};
use crate::graph::CodePropertyGraph;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Read a snapshot from disk
///
/// A file that cannot be opened is reported as a connection failure: the
/// store is unreachable, not merely queried badly.
pub fn load_snapshot(path: &Path) -> Result<GraphSnapshot> {
    let file = File::open(path).map_err(|e| {
        GraphStoreError::connection(format!("cannot open graph export {}", path.display()))
            .with_source(e)
    })?;
    let snapshot: GraphSnapshot = serde_json::from_reader(BufReader::new(file))?;
    debug!(
        "Loaded graph export {} ({} nodes, {} edges)",
        path.display(),
        snapshot.nodes.len(),
        snapshot.edges.len()
    );
    Ok(snapshot)
}

/// Load and index a graph export
pub fn open_graph(path: &Path) -> Result<CodePropertyGraph> {
    CodePropertyGraph::from_snapshot(load_snapshot(path)?)
}

/// Write a snapshot to disk
pub fn save_snapshot(path: &Path, snapshot: &GraphSnapshot) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, snapshot)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EdgeKind, EdgeRecord, NodeRecord};
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.json");

        let snapshot = GraphSnapshot {
            nodes: vec![NodeRecord::new(1, "CFGEntryNode"), NodeRecord::new(2, "Condition")],
            edges: vec![EdgeRecord::new(1, 2, EdgeKind::FlowsTo)],
        };
        save_snapshot(&path, &snapshot).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, snapshot);

        let cpg = open_graph(&path).unwrap();
        assert_eq!(cpg.node_count(), 2);
    }

    #[test]
    fn test_missing_file_is_connection_failure() {
        let dir = TempDir::new().unwrap();
        let err = load_snapshot(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Connection);
    }

    #[test]
    fn test_malformed_file_is_serialization_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"nodes\": [").unwrap();
        let err = load_snapshot(&path).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }
}
