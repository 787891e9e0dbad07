//! Core data model: samples, entry points and raw path records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sample as reported by the graph store, before a row is assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleDescriptor {
    /// Stable sort key (directory path)
    pub id: String,
    pub is_positive: bool,
}

impl SampleDescriptor {
    pub fn new(id: impl Into<String>, is_positive: bool) -> Self {
        Self {
            id: id.into(),
            is_positive,
        }
    }
}

/// Discovered sample with its matrix row
///
/// `row_index` is assigned once from discovery order and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub id: String,
    pub label: bool,
    pub row_index: usize,
}

impl Sample {
    pub fn from_descriptor(descriptor: SampleDescriptor, row_index: usize) -> Self {
        Self {
            id: descriptor.id,
            label: descriptor.is_positive,
            row_index,
        }
    }
}

/// Opaque handle to a function's CFG entry node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryPoint(pub i64);

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry#{}", self.0)
    }
}

/// One traversal result: source subtree shape, flow edge types, sink subtree shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawPathRecord {
    pub source_shape: Vec<String>,
    pub flow_edges: Vec<String>,
    pub sink_shape: Vec<String>,
}

impl RawPathRecord {
    pub fn new<S, F, K>(source_shape: S, flow_edges: F, sink_shape: K) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self {
            source_shape: source_shape.into_iter().map(Into::into).collect(),
            flow_edges: flow_edges.into_iter().map(Into::into).collect(),
            sink_shape: sink_shape.into_iter().map(Into::into).collect(),
        }
    }
}
