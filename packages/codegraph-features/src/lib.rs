/*
 * Codegraph Features - flow-pattern feature extraction
 *
 * Turns labelled code samples into sparse count vectors:
 * - bounded flow paths from function entry points (graph-query port)
 * - canonical pattern keys in an append-only vocabulary
 * - per-sample counts in a growable sparse matrix
 * - aligned matrix / vocabulary / label artifacts, published atomically
 */

// Public modules
pub mod config;
pub mod errors;
pub mod features;
pub mod infrastructure;
pub mod pipeline;
pub mod ports;
pub mod shared;

// Re-exports
pub use config::{ConfigError, ExtractionConfig, Validatable};
pub use errors::{ErrorCategory, FeatureError, Result};
pub use features::canonical::{canonicalize, CanonicalKey};
pub use features::export::{load_artifacts, ExportManifest, Exporter};
pub use features::labels::{LabelStyle, SampleLabelRegistry};
pub use features::matrix::{CooMatrix, SparseCountMatrix};
pub use features::vocabulary::{Resolution, VocabularyIndex};
pub use infrastructure::{GraphDbAdapter, InMemoryAdapter};
pub use pipeline::{CancelHandle, ExtractionPipeline, ExtractionReport, ExtractionState};
pub use ports::{AdapterError, GraphQueryAdapter};
pub use shared::{EntryPoint, RawPathRecord, Sample, SampleDescriptor};
