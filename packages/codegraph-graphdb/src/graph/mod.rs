/*
 * Code Property Graph
 *
 * Joern-style property graph held in memory:
 * - petgraph DiGraph for adjacency
 * - store node id -> NodeIndex map for O(1) lookup
 * - deterministic traversal order (always sorted by store node id)
 */

pub mod query;

use crate::domain::{
    EdgeKind, GraphSnapshot, NodeRecord, NODE_TYPE_CFG_ENTRY, NODE_TYPE_DIRECTORY, NODE_TYPE_FILE,
    NODE_TYPE_FUNCTION, PROP_CODE, PROP_FILEPATH,
};
use crate::error::{GraphStoreError, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

pub use query::{FlowPath, FlowQuery, HopRange, SamplePattern};

/// In-memory code property graph
#[derive(Debug, Default)]
pub struct CodePropertyGraph {
    graph: DiGraph<NodeRecord, EdgeKind>,
    node_map: HashMap<i64, NodeIndex>,
}

impl CodePropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a snapshot
    ///
    /// # Errors
    ///
    /// `InvalidGraph` on duplicate node ids or edges that reference unknown nodes.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let mut cpg = Self::new();
        for node in snapshot.nodes {
            cpg.add_node(node)?;
        }
        for edge in snapshot.edges {
            cpg.add_edge(edge.src, edge.dst, edge.kind)?;
        }
        Ok(cpg)
    }

    /// Export nodes (sorted by id) and edges (sorted by src, dst, kind)
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<NodeRecord> = self.graph.node_weights().cloned().collect();
        nodes.sort_by_key(|n| n.id);

        let mut edges: Vec<crate::domain::EdgeRecord> = self
            .graph
            .edge_references()
            .map(|e| {
                crate::domain::EdgeRecord::new(
                    self.graph[e.source()].id,
                    self.graph[e.target()].id,
                    e.weight().clone(),
                )
            })
            .collect();
        edges.sort_by(|a, b| (a.src, a.dst, &a.kind).cmp(&(b.src, b.dst, &b.kind)));

        GraphSnapshot { nodes, edges }
    }

    pub fn add_node(&mut self, node: NodeRecord) -> Result<NodeIndex> {
        if self.node_map.contains_key(&node.id) {
            return Err(GraphStoreError::invalid_graph(format!(
                "duplicate node id {}",
                node.id
            )));
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.node_map.insert(id, idx);
        Ok(idx)
    }

    pub fn add_edge(&mut self, src: i64, dst: i64, kind: EdgeKind) -> Result<()> {
        let (Some(&from), Some(&to)) = (self.node_map.get(&src), self.node_map.get(&dst)) else {
            return Err(GraphStoreError::invalid_graph(format!(
                "edge {} -[{}]-> {} references an unknown node",
                src, kind, dst
            )));
        };
        self.graph.add_edge(from, to, kind);
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: i64) -> Option<&NodeRecord> {
        self.node_map.get(&id).map(|&idx| &self.graph[idx])
    }

    fn index_of(&self, id: i64) -> Result<NodeIndex> {
        self.node_map
            .get(&id)
            .copied()
            .ok_or_else(|| GraphStoreError::node_not_found(id))
    }

    /// Successors over edges of one kind, sorted by node id
    fn successors_of_kind(&self, idx: NodeIndex, kind: &EdgeKind) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight() == kind)
            .map(|e| e.target())
            .collect();
        out.sort_by_key(|&n| self.graph[n].id);
        out.dedup();
        out
    }

    /// `Directory` nodes whose `filepath` matches `pattern`, sorted by path
    pub fn directories(&self, pattern: &SamplePattern) -> Vec<&NodeRecord> {
        let mut dirs: Vec<&NodeRecord> = self
            .graph
            .node_weights()
            .filter(|n| n.node_type == NODE_TYPE_DIRECTORY)
            .filter(|n| n.property_str(PROP_FILEPATH).is_some_and(|p| pattern.matches(p)))
            .collect();
        dirs.sort_by(|a, b| {
            a.property_str(PROP_FILEPATH)
                .cmp(&b.property_str(PROP_FILEPATH))
                .then(a.id.cmp(&b.id))
        });
        dirs
    }

    /// CFG entry nodes of every function under a directory
    ///
    /// Follows `Directory -IS_PARENT_DIR_OF-> File -IS_FILE_OF-> Function
    /// -IS_FUNCTION_OF_CFG-> CFGEntryNode`. Functions whose `code` is listed in
    /// `skip_functions` are ignored. Result is sorted by node id.
    pub fn entry_points(&self, directory_id: i64, skip_functions: &[String]) -> Result<Vec<i64>> {
        let dir = self.index_of(directory_id)?;
        let mut entries = Vec::new();

        for file in self.successors_of_kind(dir, &EdgeKind::IsParentDirOf) {
            if self.graph[file].node_type != NODE_TYPE_FILE {
                continue;
            }
            for function in self.successors_of_kind(file, &EdgeKind::IsFileOf) {
                let func = &self.graph[function];
                if func.node_type != NODE_TYPE_FUNCTION {
                    continue;
                }
                if func
                    .property_str(PROP_CODE)
                    .is_some_and(|name| skip_functions.iter().any(|s| s == name))
                {
                    continue;
                }
                for entry in self.successors_of_kind(function, &EdgeKind::IsFunctionOfCfg) {
                    if self.graph[entry].node_type == NODE_TYPE_CFG_ENTRY {
                        entries.push(self.graph[entry].id);
                    }
                }
            }
        }

        entries.sort_unstable();
        entries.dedup();
        Ok(entries)
    }

    /// Types of all strict AST descendants of a node, ordered by node id
    pub fn ast_subtree_types(&self, node_id: i64) -> Result<Vec<String>> {
        let root = self.index_of(node_id)?;
        Ok(self.subtree_types_from(root))
    }

    fn subtree_types_from(&self, root: NodeIndex) -> Vec<String> {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut stack = vec![root];
        let mut descendants = Vec::new();

        while let Some(idx) = stack.pop() {
            for child in self.successors_of_kind(idx, &EdgeKind::IsAstParent) {
                if child != root && visited.insert(child) {
                    descendants.push(child);
                    stack.push(child);
                }
            }
        }

        descendants.sort_by_key(|&n| self.graph[n].id);
        descendants
            .into_iter()
            .map(|n| self.graph[n].node_type.clone())
            .collect()
    }
}
