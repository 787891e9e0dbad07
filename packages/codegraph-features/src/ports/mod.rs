//! Graph-query port
//!
//! The pipeline only ever talks to the graph store through
//! `GraphQueryAdapter`. Adapters are synchronous and shared across rayon
//! workers, hence `Send + Sync`.

use crate::shared::{EntryPoint, RawPathRecord, SampleDescriptor};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Store unreachable; aborts the run
    #[error("connection failed: {0}")]
    Connection(String),

    /// Single query failed or timed out; the caller recovers
    #[error("query failed: {0}")]
    Query(String),
}

pub trait GraphQueryAdapter: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // Discovery
    // ═══════════════════════════════════════════════════════════════════════

    /// All samples, sorted by id
    ///
    /// # Errors
    ///
    /// Any error here is fatal to the run: without the sample list there are
    /// no row indices to assign.
    fn list_samples(&self) -> Result<Vec<SampleDescriptor>, AdapterError>;

    /// Function entry points of one sample
    fn list_entry_points(&self, sample_id: &str) -> Result<Vec<EntryPoint>, AdapterError>;

    // ═══════════════════════════════════════════════════════════════════════
    // Traversal
    // ═══════════════════════════════════════════════════════════════════════

    /// Raw flow path records rooted at `entry`
    fn list_flow_patterns(&self, entry: EntryPoint) -> Result<Vec<RawPathRecord>, AdapterError>;
}
