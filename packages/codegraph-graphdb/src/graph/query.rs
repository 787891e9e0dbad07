//! Bounded flow-path queries over the code property graph
//!
//! A flow path starts at an upstream anchor reachable from a function's CFG
//! entry node and ends at a different downstream anchor:
//!
//! ```text
//! (entry) -[FLOWS_TO|REACHES|CONTROLS * upstream]-> (u:UpstreamNode)
//! (u)     -[FLOWS_TO|REACHES|CONTROLS * downstream]-> (d:DownstreamNode), u <> d
//! ```
//!
//! Both legs only follow edge-unique paths. Each distinct `(u, d, flow types)`
//! yields one `FlowPath` carrying the AST subtree types of both anchors, no
//! matter how many paths realise that flow.

use super::CodePropertyGraph;
use crate::domain::{EdgeKind, LABEL_DOWNSTREAM, LABEL_UPSTREAM};
use crate::error::{GraphStoreError, Result};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Inclusive hop-count range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopRange {
    pub min: usize,
    pub max: usize,
}

impl HopRange {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, hops: usize) -> bool {
        hops >= self.min && hops <= self.max
    }
}

/// Flow-path query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowQuery {
    /// Relationship types a flow may traverse
    pub flow_kinds: Vec<EdgeKind>,
    /// Hops from the entry node to an upstream anchor
    pub upstream: HopRange,
    /// Hops from an upstream anchor to a downstream anchor
    pub downstream: HopRange,
    pub upstream_label: String,
    pub downstream_label: String,
}

impl Default for FlowQuery {
    fn default() -> Self {
        Self {
            flow_kinds: EdgeKind::flow_kinds(),
            upstream: HopRange::new(0, 5),
            downstream: HopRange::new(1, 3),
            upstream_label: LABEL_UPSTREAM.to_string(),
            downstream_label: LABEL_DOWNSTREAM.to_string(),
        }
    }
}

/// Whole-string regex over directory paths (Cypher `=~` semantics)
#[derive(Debug, Clone)]
pub struct SamplePattern {
    source: String,
    regex: Regex,
}

impl SamplePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            GraphStoreError::invalid_graph(format!("invalid sample pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// One flow path between two anchors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowPath {
    pub source_anchor: i64,
    pub sink_anchor: i64,
    /// AST subtree types of the source anchor, ordered by node id
    pub source_types: Vec<String>,
    /// Relationship types along the path, in traversal order
    pub flow: Vec<EdgeKind>,
    /// AST subtree types of the sink anchor, ordered by node id
    pub sink_types: Vec<String>,
}

impl CodePropertyGraph {
    /// Enumerate flow paths rooted at one CFG entry node
    ///
    /// Anchors are visited in node-id order and paths in depth-first order
    /// over edges sorted by target id, so the output order is deterministic.
    /// Anchors with an empty AST subtree produce no paths.
    pub fn flow_paths(&self, entry_id: i64, query: &FlowQuery) -> Result<Vec<FlowPath>> {
        let entry = self.index_of(entry_id)?;
        let upstream = self.upstream_anchors(entry, query);

        let mut subtree_cache: HashMap<NodeIndex, Vec<String>> = HashMap::new();
        let mut paths = Vec::new();

        for anchor in upstream {
            let source_types = subtree_cache
                .entry(anchor)
                .or_insert_with(|| self.subtree_types_from(anchor))
                .clone();
            if source_types.is_empty() {
                continue;
            }

            for (sink, flow) in self.downstream_paths(anchor, query) {
                let sink_types = subtree_cache
                    .entry(sink)
                    .or_insert_with(|| self.subtree_types_from(sink))
                    .clone();
                if sink_types.is_empty() {
                    continue;
                }
                paths.push(FlowPath {
                    source_anchor: self.graph[anchor].id,
                    sink_anchor: self.graph[sink].id,
                    source_types: source_types.clone(),
                    flow,
                    sink_types,
                });
            }
        }

        Ok(paths)
    }

    /// Outgoing flow edges, sorted by (target id, edge index)
    fn flow_edges_from(&self, idx: NodeIndex, query: &FlowQuery) -> Vec<(EdgeIndex, NodeIndex, EdgeKind)> {
        let mut edges: Vec<(EdgeIndex, NodeIndex, EdgeKind)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| query.flow_kinds.contains(e.weight()))
            .map(|e| (e.id(), e.target(), e.weight().clone()))
            .collect();
        edges.sort_by_key(|(eid, target, _)| (self.graph[*target].id, eid.index()));
        edges
    }

    /// Distinct upstream anchors within the upstream hop range, sorted by id
    fn upstream_anchors(&self, entry: NodeIndex, query: &FlowQuery) -> Vec<NodeIndex> {
        let mut anchors: HashSet<NodeIndex> = HashSet::new();
        if query.upstream.min == 0 {
            // a bounded walk always shortens to an edge-unique path within range
            self.reachable_anchors(entry, query, &mut anchors);
        } else {
            let mut used: Vec<EdgeIndex> = Vec::new();
            self.walk_upstream(entry, 0, query, &mut used, &mut anchors);
        }

        let mut anchors: Vec<NodeIndex> = anchors.into_iter().collect();
        anchors.sort_by_key(|&n| self.graph[n].id);
        anchors
    }

    /// Depth-bounded BFS keyed on `(node, depth)`
    fn reachable_anchors(&self, entry: NodeIndex, query: &FlowQuery, anchors: &mut HashSet<NodeIndex>) {
        let mut seen: HashSet<(NodeIndex, usize)> = HashSet::new();
        let mut queue = VecDeque::from([(entry, 0usize)]);
        seen.insert((entry, 0));

        while let Some((idx, depth)) = queue.pop_front() {
            if query.upstream.contains(depth) && self.graph[idx].has_label(&query.upstream_label) {
                anchors.insert(idx);
            }
            if depth == query.upstream.max {
                continue;
            }
            for (_, next, _) in self.flow_edges_from(idx, query) {
                if seen.insert((next, depth + 1)) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
    }

    fn walk_upstream(
        &self,
        at: NodeIndex,
        depth: usize,
        query: &FlowQuery,
        used: &mut Vec<EdgeIndex>,
        anchors: &mut HashSet<NodeIndex>,
    ) {
        if query.upstream.contains(depth) && self.graph[at].has_label(&query.upstream_label) {
            anchors.insert(at);
        }
        if depth == query.upstream.max {
            return;
        }
        for (eid, next, _) in self.flow_edges_from(at, query) {
            if used.contains(&eid) {
                continue;
            }
            used.push(eid);
            self.walk_upstream(next, depth + 1, query, used, anchors);
            used.pop();
        }
    }

    /// Distinct `(sink, flow)` pairs over edge-unique paths from `anchor`,
    /// in first-found order, excluding `anchor` itself as sink
    fn downstream_paths(&self, anchor: NodeIndex, query: &FlowQuery) -> Vec<(NodeIndex, Vec<EdgeKind>)> {
        let mut found = Vec::new();
        let mut used: Vec<EdgeIndex> = Vec::new();
        let mut flow: Vec<EdgeKind> = Vec::new();
        self.walk_downstream(anchor, anchor, query, &mut used, &mut flow, &mut found);

        let mut distinct: HashSet<(NodeIndex, Vec<EdgeKind>)> = HashSet::new();
        found.retain(|(sink, flow)| distinct.insert((*sink, flow.clone())));
        found
    }

    fn walk_downstream(
        &self,
        anchor: NodeIndex,
        at: NodeIndex,
        query: &FlowQuery,
        used: &mut Vec<EdgeIndex>,
        flow: &mut Vec<EdgeKind>,
        found: &mut Vec<(NodeIndex, Vec<EdgeKind>)>,
    ) {
        if flow.len() == query.downstream.max {
            return;
        }
        for (eid, next, kind) in self.flow_edges_from(at, query) {
            if used.contains(&eid) {
                continue;
            }
            used.push(eid);
            flow.push(kind);

            if query.downstream.contains(flow.len())
                && next != anchor
                && self.graph[next].has_label(&query.downstream_label)
            {
                found.push((next, flow.clone()));
            }
            self.walk_downstream(anchor, next, query, used, flow, found);

            flow.pop();
            used.pop();
        }
    }
}
