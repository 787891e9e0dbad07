//! Extraction configuration sections and YAML loading

use super::error::{ConfigError, ConfigResult};
use super::validation::Validatable;
use crate::features::labels::LabelStyle;
use codegraph_graphdb::{EdgeKind, FlowQuery, HopRange, SamplePattern};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

const MAX_HOPS: usize = 16;
const MAX_WORKERS: usize = 256;
const MAX_BATCH_SIZE: usize = 10_000;

// ═══════════════════════════════════════════════════════════════════════════
// Traversal
// ═══════════════════════════════════════════════════════════════════════════

/// Flow path shape: which edges, how many hops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraversalConfig {
    /// Relationship names a flow may traverse
    pub flow_kinds: Vec<String>,
    pub upstream_min: usize,
    pub upstream_max: usize,
    pub downstream_min: usize,
    pub downstream_max: usize,
    pub upstream_label: String,
    pub downstream_label: String,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        let query = FlowQuery::default();
        Self {
            flow_kinds: query.flow_kinds.iter().map(|k| k.as_str().to_string()).collect(),
            upstream_min: query.upstream.min,
            upstream_max: query.upstream.max,
            downstream_min: query.downstream.min,
            downstream_max: query.downstream.max,
            upstream_label: query.upstream_label,
            downstream_label: query.downstream_label,
        }
    }
}

impl TraversalConfig {
    pub fn to_flow_query(&self) -> FlowQuery {
        FlowQuery {
            flow_kinds: self.flow_kinds.iter().map(|k| EdgeKind::from(k.as_str())).collect(),
            upstream: HopRange::new(self.upstream_min, self.upstream_max),
            downstream: HopRange::new(self.downstream_min, self.downstream_max),
            upstream_label: self.upstream_label.clone(),
            downstream_label: self.downstream_label.clone(),
        }
    }
}

impl Validatable for TraversalConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.flow_kinds.is_empty() || self.flow_kinds.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "traversal.flow_kinds must list at least one non-empty relationship name".to_string(),
            ));
        }
        if self.upstream_max > MAX_HOPS {
            return Err(ConfigError::range_with_hint(
                "upstream_max",
                self.upstream_max,
                0,
                MAX_HOPS,
                "Path enumeration grows exponentially with hop count",
            ));
        }
        if self.upstream_min > self.upstream_max {
            return Err(ConfigError::range_with_hint(
                "upstream_min",
                self.upstream_min,
                0,
                self.upstream_max,
                "upstream_min must not exceed upstream_max",
            ));
        }
        if self.downstream_max > MAX_HOPS {
            return Err(ConfigError::range_with_hint(
                "downstream_max",
                self.downstream_max,
                1,
                MAX_HOPS,
                "Path enumeration grows exponentially with hop count",
            ));
        }
        if self.downstream_min < 1 || self.downstream_min > self.downstream_max {
            return Err(ConfigError::range_with_hint(
                "downstream_min",
                self.downstream_min,
                1,
                self.downstream_max,
                "A flow needs at least one edge between its anchors",
            ));
        }
        if self.upstream_label.is_empty() || self.downstream_label.is_empty() {
            return Err(ConfigError::Validation(
                "traversal anchor labels must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "traversal"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Samples
// ═══════════════════════════════════════════════════════════════════════════

/// Which directories are samples and how they are labelled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleConfig {
    /// Whole-path regex over `Directory.filepath`
    pub path_pattern: String,
    /// Index into `filepath.split('/')` holding the class marker
    pub label_segment: usize,
    /// Segment value that makes a sample positive
    pub positive_marker: String,
    /// Function names whose CFGs are not entry points
    pub skip_functions: Vec<String>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            path_pattern: ".*__[^/]*".to_string(),
            label_segment: 3,
            positive_marker: "good".to_string(),
            skip_functions: Vec::new(),
        }
    }
}

impl SampleConfig {
    pub fn sample_pattern(&self) -> ConfigResult<SamplePattern> {
        SamplePattern::new(&self.path_pattern).map_err(|e| ConfigError::InvalidPattern {
            field: "samples.path_pattern".to_string(),
            pattern: self.path_pattern.clone(),
            reason: e.message,
        })
    }

    /// Label of a sample path
    pub fn is_positive(&self, path: &str) -> bool {
        path.split('/').nth(self.label_segment) == Some(self.positive_marker.as_str())
    }
}

impl Validatable for SampleConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.sample_pattern()?;
        if self.positive_marker.is_empty() {
            return Err(ConfigError::Validation(
                "samples.positive_marker must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "samples"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Parallel
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParallelConfig {
    /// Use the rayon batch scheduler (requires the `parallel` feature)
    pub enabled: bool,
    /// Number of workers (0=auto)
    pub num_workers: usize,
    /// Samples decoded per batch
    pub batch_size: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            num_workers: 0,
            batch_size: 64,
        }
    }
}

impl ParallelConfig {
    /// Resolved worker count (75% of cores when auto)
    pub fn effective_workers(&self) -> usize {
        if self.num_workers == 0 {
            (num_cpus::get() * 3 / 4).max(1)
        } else {
            self.num_workers
        }
    }
}

impl Validatable for ParallelConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.num_workers > MAX_WORKERS {
            return Err(ConfigError::range_with_hint(
                "num_workers",
                self.num_workers,
                0,
                MAX_WORKERS,
                "Number of workers must be reasonable (0=auto)",
            ));
        }
        if self.batch_size < 1 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::range_with_hint(
                "batch_size",
                self.batch_size,
                1,
                MAX_BATCH_SIZE,
                "Batch size must be reasonable",
            ));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "parallel"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Vocabulary and output
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VocabularyConfig {
    /// Vocabulary artifact of a previous run
    pub seed: Option<PathBuf>,
    /// Skip keys missing from the seed instead of adding columns
    pub frozen: bool,
}

impl Validatable for VocabularyConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.frozen && self.seed.is_none() {
            return Err(ConfigError::Validation(
                "vocabulary.frozen requires vocabulary.seed".to_string(),
            ));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "vocabulary"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub label_style: LabelStyle,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("features"),
            label_style: LabelStyle::Numeric,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Top level
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionConfig {
    pub traversal: TraversalConfig,
    pub samples: SampleConfig,
    pub parallel: ParallelConfig,
    pub vocabulary: VocabularyConfig,
    pub output: OutputConfig,
}

/// YAML schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFileV1 {
    /// Schema version (always 1 for v1)
    version: Option<u32>,
    #[serde(default)]
    traversal: TraversalConfig,
    #[serde(default)]
    samples: SampleConfig,
    #[serde(default)]
    parallel: ParallelConfig,
    #[serde(default)]
    vocabulary: VocabularyConfig,
    #[serde(default)]
    output: OutputConfig,
}

impl ExtractionConfig {
    pub fn from_yaml(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse, version-check and validate
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;

        let version = file.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let config = Self {
            traversal: file.traversal,
            samples: file.samples,
            parallel: file.parallel,
            vocabulary: file.vocabulary,
            output: file.output,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: Some(1),
            traversal: self.traversal.clone(),
            samples: self.samples.clone(),
            parallel: self.parallel.clone(),
            vocabulary: self.vocabulary.clone(),
            output: self.output.clone(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }
}

impl Validatable for ExtractionConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.traversal.validate()?;
        self.samples.validate()?;
        self.parallel.validate()?;
        self.vocabulary.validate()
    }

    fn config_name(&self) -> &'static str {
        "extraction"
    }
}
