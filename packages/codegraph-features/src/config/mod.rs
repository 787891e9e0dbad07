//! Extraction configuration
//!
//! Versioned YAML (`version: 1`) with one section per concern:
//!
//! ```yaml
//! version: 1
//! traversal:
//!   flow_kinds: [FLOWS_TO, REACHES, CONTROLS]
//!   upstream_min: 0
//!   upstream_max: 5
//!   downstream_min: 1
//!   downstream_max: 3
//! samples:
//!   path_pattern: ".*__[^/]*"
//!   label_segment: 3
//!   positive_marker: good
//! parallel:
//!   enabled: true
//!   num_workers: 0
//!   batch_size: 64
//! vocabulary:
//!   seed: previous/graphs.txt
//!   frozen: true
//! output:
//!   directory: features
//!   label_style: numeric
//! ```
//!
//! Every section has defaults, so an empty file with only `version: 1` is
//! valid. CLI flags are applied on top of the loaded values.

pub mod error;
pub mod extraction_config;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use extraction_config::{
    ExtractionConfig, OutputConfig, ParallelConfig, SampleConfig, TraversalConfig, VocabularyConfig,
    SUPPORTED_VERSIONS,
};
pub use validation::Validatable;
