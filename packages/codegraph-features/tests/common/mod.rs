//! Shared fixtures: a small Juliet-style code property graph
//!
//! ```text
//! /data/juliet/bad/CWE_02__b    entry 203 -> up 204 -REACHES-> down 205 -CONTROLS-> down 206
//! /data/juliet/good/CWE_01__a   entry 103 -> up 104 -REACHES-> down 105
//!                               main: entry 107 -> up 108 -FLOWS_TO-> down 109
//! /data/juliet/good/empty__c    no files
//! ```

#![allow(dead_code)]

use codegraph_graphdb::domain::{
    LABEL_DOWNSTREAM, LABEL_UPSTREAM, NODE_TYPE_CFG_ENTRY, NODE_TYPE_DIRECTORY, NODE_TYPE_FILE,
    NODE_TYPE_FUNCTION, PROP_CODE, PROP_FILEPATH,
};
use codegraph_graphdb::{EdgeKind, EdgeRecord, GraphSnapshot, NodeRecord};
use std::path::{Path, PathBuf};

pub const SAMPLE_A: &str = "/data/juliet/good/CWE_01__a";
pub const SAMPLE_B: &str = "/data/juliet/bad/CWE_02__b";
pub const SAMPLE_C: &str = "/data/juliet/good/empty__c";

pub const P_REACHES: &str = "Identifier-[REACHES]->CallExpression";
pub const P_REACHES_CONTROLS: &str = "Identifier-[REACHES:CONTROLS]->ReturnStatement";
pub const P_MAIN: &str = "Condition-[FLOWS_TO]->Identifier";

struct Builder {
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
}

impl Builder {
    fn node(&mut self, node: NodeRecord) -> &mut Self {
        self.nodes.push(node);
        self
    }

    fn edge(&mut self, src: i64, dst: i64, kind: EdgeKind) -> &mut Self {
        self.edges.push(EdgeRecord::new(src, dst, kind));
        self
    }

    /// Anchor node with a single AST child
    fn anchor(&mut self, id: i64, label: &str, child_type: &str) -> &mut Self {
        self.node(NodeRecord::new(id, "Statement").with_label(label))
            .node(NodeRecord::new(id * 10, child_type))
            .edge(id, id * 10, EdgeKind::IsAstParent)
    }

    /// dir -> file -> function -> entry
    fn function(&mut self, dir: i64, file: i64, func: i64, entry: i64, name: &str) -> &mut Self {
        self.node(NodeRecord::new(func, NODE_TYPE_FUNCTION).with_property(PROP_CODE, name))
            .node(NodeRecord::new(entry, NODE_TYPE_CFG_ENTRY))
            .edge(dir, file, EdgeKind::IsParentDirOf)
            .edge(file, func, EdgeKind::IsFileOf)
            .edge(func, entry, EdgeKind::IsFunctionOfCfg)
    }
}

fn directory(id: i64, path: &str) -> NodeRecord {
    NodeRecord::new(id, NODE_TYPE_DIRECTORY).with_property(PROP_FILEPATH, path)
}

pub fn juliet_snapshot() -> GraphSnapshot {
    let mut b = Builder {
        nodes: Vec::new(),
        edges: Vec::new(),
    };

    b.node(directory(1, "/data/juliet"))
        .node(directory(100, SAMPLE_A))
        .node(directory(200, SAMPLE_B))
        .node(directory(300, SAMPLE_C))
        .node(NodeRecord::new(101, NODE_TYPE_FILE))
        .node(NodeRecord::new(201, NODE_TYPE_FILE));

    // sample a
    b.function(100, 101, 102, 103, "good_fn")
        .anchor(104, LABEL_UPSTREAM, "Identifier")
        .anchor(105, LABEL_DOWNSTREAM, "CallExpression")
        .edge(103, 104, EdgeKind::FlowsTo)
        .edge(104, 105, EdgeKind::Reaches);
    b.function(100, 101, 106, 107, "main")
        .anchor(108, LABEL_UPSTREAM, "Condition")
        .anchor(109, LABEL_DOWNSTREAM, "Identifier")
        .edge(107, 108, EdgeKind::FlowsTo)
        .edge(108, 109, EdgeKind::FlowsTo);

    // sample b
    b.function(200, 201, 202, 203, "bad_fn")
        .anchor(204, LABEL_UPSTREAM, "Identifier")
        .anchor(205, LABEL_DOWNSTREAM, "CallExpression")
        .anchor(206, LABEL_DOWNSTREAM, "ReturnStatement")
        .edge(203, 204, EdgeKind::FlowsTo)
        .edge(204, 205, EdgeKind::Reaches)
        .edge(205, 206, EdgeKind::Controls);

    GraphSnapshot {
        nodes: b.nodes,
        edges: b.edges,
    }
}

/// Write the fixture as a JSON graph export under `dir`
pub fn write_json_graph(dir: &Path) -> PathBuf {
    let path = dir.join("cpg.json");
    codegraph_graphdb::infrastructure::json::save_snapshot(&path, &juliet_snapshot()).unwrap();
    path
}
