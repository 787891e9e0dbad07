//! Flow-pattern feature extraction CLI
//!
//! # Usage
//!
//! ```bash
//! # JSON graph export, default traversal
//! extract-flow-features --graph cpg.json --output features/
//!
//! # SQLite graph store, YAML config, 8 workers
//! extract-flow-features --sqlite cpg.db --config extract.yaml --workers 8
//!
//! # Column-aligned with a previous run
//! extract-flow-features --graph test.json --vocabulary train/graphs.txt --frozen
//! ```
//!
//! Logging follows `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use codegraph_features::config::{ExtractionConfig, Validatable};
use codegraph_features::{Exporter, ExtractionPipeline, GraphDbAdapter, LabelStyle};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "extract-flow-features")]
#[command(about = "Extract flow-pattern count features from a code property graph", long_about = None)]
#[command(group(ArgGroup::new("store").required(true).args(["graph", "sqlite"])))]
struct Cli {
    /// JSON graph export
    #[arg(long)]
    graph: Option<PathBuf>,

    /// SQLite graph store
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// YAML configuration (version: 1)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Decode samples on N workers (0=auto); enables parallel mode
    #[arg(short, long)]
    workers: Option<usize>,

    /// Samples per parallel batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// numeric (1/0) or boolean (True/False)
    #[arg(long)]
    label_style: Option<LabelStyle>,

    /// Seed vocabulary from a previous graphs.txt
    #[arg(long)]
    vocabulary: Option<PathBuf>,

    /// Skip patterns missing from the seed vocabulary
    #[arg(long, requires = "vocabulary")]
    frozen: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
}

impl Cli {
    fn effective_config(&self) -> Result<ExtractionConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractionConfig::from_yaml(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ExtractionConfig::default(),
        };

        if let Some(output) = &self.output {
            config.output.directory = output.clone();
        }
        if let Some(workers) = self.workers {
            config.parallel.enabled = true;
            config.parallel.num_workers = workers;
        }
        if let Some(batch_size) = self.batch_size {
            config.parallel.batch_size = batch_size;
        }
        if let Some(style) = self.label_style {
            config.output.label_style = style;
        }
        if let Some(seed) = &self.vocabulary {
            config.vocabulary.seed = Some(seed.clone());
            config.vocabulary.frozen = self.frozen;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.effective_config()?;

    if cli.dump_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let adapter = match (&cli.graph, &cli.sqlite) {
        (Some(path), _) => GraphDbAdapter::from_json(path, config.samples.clone(), &config.traversal)
            .with_context(|| format!("opening graph export {}", path.display()))?,
        (None, Some(path)) => open_sqlite(path, &config)?,
        (None, None) => bail!("one of --graph or --sqlite is required"),
    };

    let exporter = Exporter::new(&config.output.directory, config.output.label_style);
    let mut pipeline = ExtractionPipeline::from_config(adapter, &config)?;
    let run = pipeline.run(&exporter)?;

    let report = &run.output.report;
    info!(
        "Wrote {}x{} matrix ({} non-zero) to {} in {} ms",
        run.manifest.rows,
        run.manifest.cols,
        run.manifest.nnz,
        exporter.out_dir().display(),
        report.duration_ms
    );
    if report.recoverable_failures() > 0 {
        info!(
            "{} entry point and {} sample queries failed and were counted as empty",
            report.entry_point_failures, report.sample_failures
        );
    }
    Ok(())
}

#[cfg(feature = "sqlite")]
fn open_sqlite(path: &std::path::Path, config: &ExtractionConfig) -> Result<GraphDbAdapter> {
    GraphDbAdapter::from_sqlite(path, config.samples.clone(), &config.traversal)
        .with_context(|| format!("opening SQLite graph store {}", path.display()))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_path: &std::path::Path, _config: &ExtractionConfig) -> Result<GraphDbAdapter> {
    bail!("this build has no SQLite support (enable the `sqlite` feature)")
}
