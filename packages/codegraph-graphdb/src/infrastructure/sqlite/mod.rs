//! SQLite adapter for graph snapshots
//!
//! Schema:
//! - `nodes(id, type, labels, properties)` with labels/properties as JSON text
//! - `edges(src, dst, type)`
//!
//! The store is a persistence format only: queries run on the
//! `CodePropertyGraph` built by `load_graph`.

use crate::domain::{EdgeKind, EdgeRecord, GraphSnapshot, NodeRecord};
use crate::error::{GraphStoreError, Result};
use crate::graph::CodePropertyGraph;
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id          INTEGER PRIMARY KEY,
    type        TEXT NOT NULL,
    labels      TEXT NOT NULL DEFAULT '[]',
    properties  TEXT NOT NULL DEFAULT '{}'
);
CREATE TABLE IF NOT EXISTS edges (
    src   INTEGER NOT NULL REFERENCES nodes(id),
    dst   INTEGER NOT NULL REFERENCES nodes(id),
    type  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_edges_src ON edges(src);
"#;

pub struct SqliteGraphStore {
    conn: Connection,
}

impl SqliteGraphStore {
    /// Open (or create) a writable store
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            GraphStoreError::connection(format!("cannot open graph database {}", path.display()))
                .with_source(e)
        })?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Open an existing store read-only
    ///
    /// # Errors
    ///
    /// `Connection` when the file is missing, unreadable, or lacks the schema.
    pub fn open_existing(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            GraphStoreError::connection(format!("cannot open graph database {}", path.display()))
                .with_source(e)
        })?;

        conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get::<_, i64>(0))
            .map_err(|e| {
                GraphStoreError::connection(format!(
                    "{} is not a graph database",
                    path.display()
                ))
                .with_source(e)
            })?;

        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Replace the stored graph with `snapshot` (single transaction)
    pub fn save_snapshot(&mut self, snapshot: &GraphSnapshot) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM edges", [])?;
        tx.execute("DELETE FROM nodes", [])?;
        {
            let mut insert_node = tx.prepare(
                "INSERT INTO nodes (id, type, labels, properties) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for node in &snapshot.nodes {
                insert_node.execute(params![
                    node.id,
                    node.node_type,
                    serde_json::to_string(&node.labels)?,
                    serde_json::to_string(&node.properties)?,
                ])?;
            }

            let mut insert_edge =
                tx.prepare("INSERT INTO edges (src, dst, type) VALUES (?1, ?2, ?3)")?;
            for edge in &snapshot.edges {
                insert_edge.execute(params![edge.src, edge.dst, edge.kind.as_str()])?;
            }
        }
        tx.commit()?;
        debug!(
            "Saved graph snapshot ({} nodes, {} edges)",
            snapshot.nodes.len(),
            snapshot.edges.len()
        );
        Ok(())
    }

    pub fn load_snapshot(&self) -> Result<GraphSnapshot> {
        let mut snapshot = GraphSnapshot::default();

        let mut stmt = self
            .conn
            .prepare("SELECT id, type, labels, properties FROM nodes ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        for row in rows {
            let (id, node_type, labels, properties) = row?;
            snapshot.nodes.push(NodeRecord {
                id,
                node_type,
                labels: serde_json::from_str(&labels)?,
                properties: serde_json::from_str(&properties)?,
            });
        }

        let mut stmt = self
            .conn
            .prepare("SELECT src, dst, type FROM edges ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (src, dst, kind) = row?;
            snapshot.edges.push(EdgeRecord::new(src, dst, EdgeKind::from(kind)));
        }

        Ok(snapshot)
    }

    pub fn load_graph(&self) -> Result<CodePropertyGraph> {
        CodePropertyGraph::from_snapshot(self.load_snapshot()?)
    }
}
