//! Domain layer for the code property graph store
//!
//! # Domain Models
//!
//! - `NodeRecord`: one graph node (Joern node type, Neo4j-style labels, properties)
//! - `EdgeRecord`: one typed, directed relationship
//! - `EdgeKind`: relationship types the extractor understands
//! - `GraphSnapshot`: serializable node/edge lists (JSON and SQLite share it)
//!
//! # Examples
//!
//! ```rust
//! use codegraph_graphdb::domain::{EdgeKind, EdgeRecord, GraphSnapshot, NodeRecord};
//!
//! let mut snapshot = GraphSnapshot::default();
//! snapshot.nodes.push(NodeRecord::new(1, "CFGEntryNode"));
//! snapshot.nodes.push(NodeRecord::new(2, "Condition").with_label("UpstreamNode"));
//! snapshot.edges.push(EdgeRecord::new(1, 2, EdgeKind::FlowsTo));
//! assert_eq!(snapshot.edges[0].kind.as_str(), "FLOWS_TO");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Node type of a sample directory
pub const NODE_TYPE_DIRECTORY: &str = "Directory";
/// Node type of a source file
pub const NODE_TYPE_FILE: &str = "File";
/// Node type of a function definition
pub const NODE_TYPE_FUNCTION: &str = "Function";
/// Node type marking the start of a function's CFG
pub const NODE_TYPE_CFG_ENTRY: &str = "CFGEntryNode";

/// Label marking candidate flow sources
pub const LABEL_UPSTREAM: &str = "UpstreamNode";
/// Label marking candidate flow sinks
pub const LABEL_DOWNSTREAM: &str = "DownstreamNode";

/// Directory path property
pub const PROP_FILEPATH: &str = "filepath";
/// Code property (function name for `Function` nodes)
pub const PROP_CODE: &str = "code";

// ═══════════════════════════════════════════════════════════════════════════
// Edge Kinds
// ═══════════════════════════════════════════════════════════════════════════

/// Relationship type
///
/// Serialized as the upper-case Joern relationship name. Unrecognized names
/// are kept verbatim in `Other` so foreign exports still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EdgeKind {
    /// Control flow successor
    FlowsTo,
    /// Data dependence (def reaches use)
    Reaches,
    /// Control dependence
    Controls,
    /// AST parent -> child
    IsAstParent,
    /// Directory -> File
    IsParentDirOf,
    /// File -> Function
    IsFileOf,
    /// Function -> CFG entry node
    IsFunctionOfCfg,
    Other(String),
}

impl EdgeKind {
    pub fn as_str(&self) -> &str {
        match self {
            EdgeKind::FlowsTo => "FLOWS_TO",
            EdgeKind::Reaches => "REACHES",
            EdgeKind::Controls => "CONTROLS",
            EdgeKind::IsAstParent => "IS_AST_PARENT",
            EdgeKind::IsParentDirOf => "IS_PARENT_DIR_OF",
            EdgeKind::IsFileOf => "IS_FILE_OF",
            EdgeKind::IsFunctionOfCfg => "IS_FUNCTION_OF_CFG",
            EdgeKind::Other(name) => name,
        }
    }

    /// The three relationship types that make up flow patterns
    pub fn flow_kinds() -> Vec<EdgeKind> {
        vec![EdgeKind::FlowsTo, EdgeKind::Reaches, EdgeKind::Controls]
    }
}

impl From<&str> for EdgeKind {
    fn from(s: &str) -> Self {
        match s {
            "FLOWS_TO" => EdgeKind::FlowsTo,
            "REACHES" => EdgeKind::Reaches,
            "CONTROLS" => EdgeKind::Controls,
            "IS_AST_PARENT" => EdgeKind::IsAstParent,
            "IS_PARENT_DIR_OF" => EdgeKind::IsParentDirOf,
            "IS_FILE_OF" => EdgeKind::IsFileOf,
            "IS_FUNCTION_OF_CFG" => EdgeKind::IsFunctionOfCfg,
            other => EdgeKind::Other(other.to_string()),
        }
    }
}

impl From<String> for EdgeKind {
    fn from(s: String) -> Self {
        EdgeKind::from(s.as_str())
    }
}

impl From<EdgeKind> for String {
    fn from(kind: EdgeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Nodes and Edges
// ═══════════════════════════════════════════════════════════════════════════

/// Graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Store-assigned node id (stable, used for ordering)
    pub id: i64,
    /// Joern node type (`Directory`, `CFGEntryNode`, `IdentifierDeclStatement`, ...)
    #[serde(rename = "type")]
    pub node_type: String,
    /// Extra labels (`UpstreamNode`, `DownstreamNode`)
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl NodeRecord {
    pub fn new(id: i64, node_type: impl Into<String>) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            labels: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// String property, `None` when missing or not a string
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }
}

/// Directed, typed relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub src: i64,
    pub dst: i64,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

impl EdgeRecord {
    pub fn new(src: i64, dst: i64, kind: EdgeKind) -> Self {
        Self { src, dst, kind }
    }
}

/// Serializable graph contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_names() {
        for kind in [
            EdgeKind::FlowsTo,
            EdgeKind::Reaches,
            EdgeKind::Controls,
            EdgeKind::IsAstParent,
            EdgeKind::IsParentDirOf,
            EdgeKind::IsFileOf,
            EdgeKind::IsFunctionOfCfg,
        ] {
            assert_eq!(EdgeKind::from(kind.as_str()), kind);
        }
    }

    #[test]
    fn test_edge_kind_other_preserved() {
        let kind = EdgeKind::from("POST_DOM");
        assert_eq!(kind, EdgeKind::Other("POST_DOM".to_string()));
        assert_eq!(kind.to_string(), "POST_DOM");
    }

    #[test]
    fn test_node_labels_and_properties() {
        let node = NodeRecord::new(7, NODE_TYPE_DIRECTORY)
            .with_label(LABEL_UPSTREAM)
            .with_property(PROP_FILEPATH, "/data/CWE121/good/tc__01");

        assert!(node.has_label(LABEL_UPSTREAM));
        assert!(!node.has_label(LABEL_DOWNSTREAM));
        assert_eq!(node.property_str(PROP_FILEPATH), Some("/data/CWE121/good/tc__01"));
        assert_eq!(node.property_str("missing"), None);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json = r#"{
            "nodes": [
                {"id": 1, "type": "CFGEntryNode"},
                {"id": 2, "type": "Condition", "labels": ["UpstreamNode"]}
            ],
            "edges": [{"src": 1, "dst": 2, "type": "FLOWS_TO"}]
        }"#;

        let snapshot: GraphSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert!(snapshot.nodes[1].has_label(LABEL_UPSTREAM));
        assert_eq!(snapshot.edges[0].kind, EdgeKind::FlowsTo);

        let back = serde_json::to_string(&snapshot).unwrap();
        assert!(back.contains("\"type\":\"FLOWS_TO\""));
    }
}
