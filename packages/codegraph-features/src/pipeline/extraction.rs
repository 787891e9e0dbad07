//! Extraction pipeline
//!
//! Drives one run: discover samples, assign rows in discovery order, query
//! each sample's flow paths, canonicalize them and accumulate counts. The
//! vocabulary, matrix and label registry are owned by the run and only ever
//! mutated by the single accumulating writer, so column numbering is
//! first-seen order in row order whether decoding ran sequentially or on the
//! rayon pool.

use super::state::{ExtractionState, ExtractionStateMachine};
use crate::config::{ExtractionConfig, ParallelConfig, Validatable};
use crate::errors::{FeatureError, Result};
use crate::features::canonical::CanonicalKey;
use crate::features::export::{ExportManifest, Exporter};
use crate::features::labels::SampleLabelRegistry;
use crate::features::matrix::SparseCountMatrix;
use crate::features::vocabulary::{Resolution, VocabularyIndex};
use crate::ports::{AdapterError, GraphQueryAdapter};
use crate::shared::Sample;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Cooperative cancellation flag, checked between samples
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub samples_discovered: usize,
    pub samples_processed: usize,
    pub vocabulary_size: usize,
    pub nnz: usize,
    /// Total path records counted into the matrix
    pub patterns_counted: u64,
    /// Entry points whose flow query failed
    pub entry_point_failures: usize,
    /// Samples whose entry point listing failed
    pub sample_failures: usize,
    /// Records skipped because a frozen vocabulary lacked their key
    pub unknown_patterns: u64,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl ExtractionReport {
    pub fn recoverable_failures(&self) -> usize {
        self.entry_point_failures + self.sample_failures
    }
}

/// Everything a run produced, ready for export
#[derive(Debug)]
pub struct ExtractionOutput {
    pub samples: Vec<Sample>,
    pub vocabulary: VocabularyIndex,
    pub matrix: SparseCountMatrix,
    pub labels: SampleLabelRegistry,
    pub report: ExtractionReport,
}

/// Result of `ExtractionPipeline::run`
#[derive(Debug)]
pub struct ExtractionRun {
    pub output: ExtractionOutput,
    pub manifest: ExportManifest,
}

/// Keys decoded for one sample, before accumulation
#[derive(Debug, Default)]
struct SampleOutcome {
    keys: Vec<CanonicalKey>,
    entry_point_failures: usize,
    sample_failed: bool,
}

pub struct ExtractionPipeline<A: GraphQueryAdapter> {
    adapter: A,
    parallel: ParallelConfig,
    seed: Option<VocabularyIndex>,
    cancel: CancelHandle,
    state: ExtractionStateMachine,
}

impl<A: GraphQueryAdapter> ExtractionPipeline<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            parallel: ParallelConfig::default(),
            seed: None,
            cancel: CancelHandle::default(),
            state: ExtractionStateMachine::new(),
        }
    }

    /// Pipeline with the parallel and vocabulary settings of `config`
    ///
    /// # Errors
    ///
    /// Fails if `config` does not validate or the configured vocabulary seed
    /// cannot be read.
    pub fn from_config(adapter: A, config: &ExtractionConfig) -> Result<Self> {
        config.validate()?;
        let mut pipeline = Self::new(adapter).with_parallel(config.parallel.clone());
        if let Some(seed) = &config.vocabulary.seed {
            let vocabulary = VocabularyIndex::load(seed, config.vocabulary.frozen)?;
            info!(
                "Seeded vocabulary with {} keys from {}{}",
                vocabulary.len(),
                seed.display(),
                if vocabulary.is_frozen() { " (frozen)" } else { "" }
            );
            pipeline = pipeline.with_vocabulary(vocabulary);
        }
        Ok(pipeline)
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Start from an existing vocabulary instead of an empty one
    pub fn with_vocabulary(mut self, vocabulary: VocabularyIndex) -> Self {
        self.seed = Some(vocabulary);
        self
    }

    /// Share an externally owned cancellation flag
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> &ExtractionState {
        self.state.state()
    }

    /// Extract and export in one go
    pub fn run(&mut self, exporter: &Exporter) -> Result<ExtractionRun> {
        let output = self.extract()?;
        let manifest = self.export(&output, exporter)?;
        Ok(ExtractionRun { output, manifest })
    }

    /// Discover and accumulate every sample
    ///
    /// # Errors
    ///
    /// Connection failures and consistency violations abort the run; query
    /// failures are logged and counted in the report.
    pub fn extract(&mut self) -> Result<ExtractionOutput> {
        let started = Instant::now();
        match self.extract_inner(started) {
            Ok(output) => Ok(output),
            Err(e) => Err(self.abort(e)),
        }
    }

    /// Publish the artifacts of a finished `extract`
    pub fn export(&mut self, output: &ExtractionOutput, exporter: &Exporter) -> Result<ExportManifest> {
        self.state.begin_export(output.report.cancelled)?;
        let manifest = exporter
            .export(&output.matrix, &output.vocabulary, &output.labels)
            .map_err(|e| self.abort(e))?;
        self.state.finish()?;
        Ok(manifest)
    }

    fn abort(&mut self, e: FeatureError) -> FeatureError {
        error!("Extraction failed ({}): {}", e.category(), e);
        // already terminal means the failure came from the state machine itself
        let _ = self.state.fail(&e);
        e
    }

    fn extract_inner(&mut self, started: Instant) -> Result<ExtractionOutput> {
        self.state.discover()?;
        let samples = self.discover_samples()?;
        let total = samples.len();
        info!("Found {} samples", total);

        let mut acc = Accumulator::new(self.seed.take().unwrap_or_default(), total);

        if self.use_parallel() {
            self.process_parallel(&samples, &mut acc)?;
        } else {
            self.process_sequential(&samples, &mut acc)?;
        }

        let mut report = acc.report;
        report.samples_processed = acc.labels.len();
        report.vocabulary_size = acc.vocabulary.len();
        report.nnz = acc.matrix.nnz();
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            "Analyzed {} samples, extracting {} unique features ({} recoverable failures{})",
            report.samples_processed,
            report.vocabulary_size,
            report.recoverable_failures(),
            if report.cancelled { ", cancelled" } else { "" }
        );
        if report.unknown_patterns > 0 {
            warn!(
                "{} patterns were not in the frozen vocabulary and were skipped",
                report.unknown_patterns
            );
        }

        Ok(ExtractionOutput {
            samples,
            vocabulary: acc.vocabulary,
            matrix: acc.matrix,
            labels: acc.labels,
            report,
        })
    }

    /// Samples sorted by id, rows assigned in that order
    fn discover_samples(&self) -> Result<Vec<Sample>> {
        let mut descriptors = self
            .adapter
            .list_samples()
            .map_err(|e| FeatureError::Connection(format!("sample discovery failed: {}", e)))?;
        descriptors.sort_by(|a, b| a.id.cmp(&b.id));

        if let Some(pair) = descriptors.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(FeatureError::consistency(format!(
                "sample '{}' discovered twice",
                pair[0].id
            )));
        }

        Ok(descriptors
            .into_iter()
            .enumerate()
            .map(|(row, d)| Sample::from_descriptor(d, row))
            .collect())
    }

    #[cfg(feature = "parallel")]
    fn use_parallel(&self) -> bool {
        self.parallel.enabled
    }

    #[cfg(not(feature = "parallel"))]
    fn use_parallel(&self) -> bool {
        if self.parallel.enabled {
            warn!("Parallel extraction requested but the `parallel` feature is disabled");
        }
        false
    }

    fn process_sequential(&mut self, samples: &[Sample], acc: &mut Accumulator) -> Result<()> {
        for sample in samples {
            if self.cancel.is_cancelled() {
                acc.report.cancelled = true;
                info!("Cancelled after {} of {} samples", sample.row_index, samples.len());
                break;
            }
            self.state.begin_sample(sample.row_index, samples.len())?;
            let outcome = decode_sample(&self.adapter, sample)?;
            self.state.accumulate()?;
            acc.add(sample, outcome)?;
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn process_parallel(&mut self, samples: &[Sample], acc: &mut Accumulator) -> Result<()> {
        use rayon::prelude::*;

        let workers = self.parallel.effective_workers();
        let batch_size = self.parallel.batch_size.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| FeatureError::Config(crate::config::ConfigError::Validation(e.to_string())))?;
        info!(
            "Decoding samples on {} workers in batches of {}",
            workers, batch_size
        );

        for batch in samples.chunks(batch_size) {
            if self.cancel.is_cancelled() {
                acc.report.cancelled = true;
                info!("Cancelled after {} of {} samples", batch[0].row_index, samples.len());
                break;
            }

            let adapter = &self.adapter;
            let outcomes: Vec<Result<SampleOutcome>> =
                pool.install(|| batch.par_iter().map(|s| decode_sample(adapter, s)).collect());

            // single writer, row order
            for (sample, outcome) in batch.iter().zip(outcomes) {
                self.state.begin_sample(sample.row_index, samples.len())?;
                let outcome = outcome?;
                self.state.accumulate()?;
                acc.add(sample, outcome)?;
            }
        }
        Ok(())
    }

    #[cfg(not(feature = "parallel"))]
    fn process_parallel(&mut self, samples: &[Sample], acc: &mut Accumulator) -> Result<()> {
        self.process_sequential(samples, acc)
    }
}

/// Query one sample. Only connection failures escape.
///
/// An entry point whose result holds a record without flow edges is
/// malformed and counts as a failed query with zero paths.
fn decode_sample<A: GraphQueryAdapter + ?Sized>(adapter: &A, sample: &Sample) -> Result<SampleOutcome> {
    let mut outcome = SampleOutcome::default();

    let entries = match adapter.list_entry_points(&sample.id) {
        Ok(entries) => entries,
        Err(AdapterError::Connection(msg)) => return Err(FeatureError::Connection(msg)),
        Err(e) => {
            let err = FeatureError::from_adapter(format!("sample {}", sample.id), e);
            warn!("{}; sample row {} stays empty", err, sample.row_index);
            outcome.sample_failed = true;
            return Ok(outcome);
        }
    };

    for entry in entries {
        match adapter.list_flow_patterns(entry) {
            Ok(records) if records.iter().any(|r| r.flow_edges.is_empty()) => {
                let err = FeatureError::query(
                    format!("{} of {}", entry, sample.id),
                    "path record without flow edges",
                );
                warn!("{}; counted as zero paths", err);
                outcome.entry_point_failures += 1;
            }
            Ok(records) => {
                debug!("{} in {}: {} paths", entry, sample.id, records.len());
                outcome.keys.extend(records.into_iter().map(CanonicalKey::from));
            }
            Err(AdapterError::Connection(msg)) => return Err(FeatureError::Connection(msg)),
            Err(e) => {
                let err = FeatureError::from_adapter(format!("{} of {}", entry, sample.id), e);
                warn!("{}; counted as zero paths", err);
                outcome.entry_point_failures += 1;
            }
        }
    }
    Ok(outcome)
}

/// Single writer over the run's vocabulary, matrix and labels
struct Accumulator {
    vocabulary: VocabularyIndex,
    matrix: SparseCountMatrix,
    labels: SampleLabelRegistry,
    report: ExtractionReport,
    total: usize,
}

impl Accumulator {
    fn new(vocabulary: VocabularyIndex, total: usize) -> Self {
        Self {
            vocabulary,
            matrix: SparseCountMatrix::new(),
            labels: SampleLabelRegistry::new(),
            report: ExtractionReport {
                samples_discovered: total,
                ..Default::default()
            },
            total,
        }
    }

    fn add(&mut self, sample: &Sample, outcome: SampleOutcome) -> Result<()> {
        let row = sample.row_index;
        self.matrix.open_row(row);

        for key in outcome.keys {
            match self.vocabulary.resolve_or_create(key) {
                Resolution::Existing(col) | Resolution::Created(col) => {
                    self.matrix.increment(row, col, 1)?;
                    self.report.patterns_counted += 1;
                }
                Resolution::Rejected => self.report.unknown_patterns += 1,
            }
        }
        self.labels.record(row, sample.label, sample.id.as_str())?;

        self.report.entry_point_failures += outcome.entry_point_failures;
        if outcome.sample_failed {
            self.report.sample_failures += 1;
        }

        let done = row + 1;
        let (rows, cols) = self.matrix.shape();
        info!(
            "Processed {}/{} ({:.1}%) {} -> matrix {}x{}",
            done,
            self.total,
            done as f64 * 100.0 / self.total.max(1) as f64,
            sample.id,
            rows,
            cols
        );
        Ok(())
    }
}
