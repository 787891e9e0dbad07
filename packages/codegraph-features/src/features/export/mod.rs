//! Artifact export
//!
//! Writes the three aligned artifacts as one unit:
//!
//! | File | Content |
//! |------|---------|
//! | `features.mtx` | count matrix, Matrix Market coordinate format |
//! | `graphs.txt` | rendered vocabulary key per column |
//! | `labels.txt` | `<label>,<sample_id>` per row |
//! | `manifest.json` | run id, shape, file names |
//!
//! Files are written into a staging directory inside the output directory,
//! synced, renamed into place, and only then is `manifest.json` published.
//! An output directory without a manifest is incomplete.

use crate::errors::{FeatureError, Result};
use crate::features::canonical::CanonicalKey;
use crate::features::labels::{LabelEntry, LabelStyle, SampleLabelRegistry};
use crate::features::matrix::market::{read_matrix_market, write_matrix_market};
use crate::features::matrix::{CooMatrix, SparseCountMatrix};
use crate::features::vocabulary::VocabularyIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

pub const MATRIX_FILE: &str = "features.mtx";
pub const VOCABULARY_FILE: &str = "graphs.txt";
pub const LABELS_FILE: &str = "labels.txt";
pub const MANIFEST_FILE: &str = "manifest.json";

const STAGING_PREFIX: &str = ".staging-";

/// Published last; its presence marks a complete export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub rows: usize,
    pub cols: usize,
    pub nnz: usize,
    pub label_style: LabelStyle,
    pub matrix_file: String,
    pub vocabulary_file: String,
    pub labels_file: String,
}

/// Artifacts read back from a complete export directory
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedArtifacts {
    pub manifest: ExportManifest,
    pub matrix: CooMatrix,
    pub vocabulary: Vec<CanonicalKey>,
    pub labels: Vec<LabelEntry>,
}

#[derive(Debug, Clone)]
pub struct Exporter {
    out_dir: PathBuf,
    label_style: LabelStyle,
}

impl Exporter {
    pub fn new(out_dir: impl Into<PathBuf>, label_style: LabelStyle) -> Self {
        Self {
            out_dir: out_dir.into(),
            label_style,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Export matrix, vocabulary and labels
    ///
    /// # Errors
    ///
    /// - `Consistency` if the three structures are misaligned or a sample id
    ///   would span several label lines (nothing is written)
    /// - `Export` on any filesystem failure (no manifest is published)
    pub fn export(
        &self,
        matrix: &SparseCountMatrix,
        vocabulary: &VocabularyIndex,
        labels: &SampleLabelRegistry,
    ) -> Result<ExportManifest> {
        let (rows, cols) = check_alignment(matrix, vocabulary, labels)?;
        let coo = matrix.export(rows, cols);
        let keys = vocabulary.export_order();

        fs::create_dir_all(&self.out_dir)
            .map_err(|e| export_error("create output directory", &self.out_dir, e))?;

        let manifest_path = self.out_dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            fs::remove_file(&manifest_path)
                .map_err(|e| export_error("remove stale manifest", &manifest_path, e))?;
        }

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.out_dir)
            .map_err(|e| export_error("create staging directory", &self.out_dir, e))?;
        debug!("Staging export in {}", staging.path().display());

        write_synced(&staging.path().join(MATRIX_FILE), |out| {
            write_matrix_market(out, &coo)
        })?;
        write_synced(&staging.path().join(VOCABULARY_FILE), |out| {
            for key in &keys {
                writeln!(out, "{}", key.render())?;
            }
            Ok(())
        })?;
        write_synced(&staging.path().join(LABELS_FILE), |out| {
            for entry in labels.export() {
                writeln!(out, "{},{}", self.label_style.format(entry.label), entry.sample_id)?;
            }
            Ok(())
        })?;

        for name in [MATRIX_FILE, VOCABULARY_FILE, LABELS_FILE] {
            let target = self.out_dir.join(name);
            fs::rename(staging.path().join(name), &target)
                .map_err(|e| export_error("publish artifact", &target, e))?;
        }

        let manifest = ExportManifest {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            rows,
            cols,
            nnz: coo.nnz(),
            label_style: self.label_style,
            matrix_file: MATRIX_FILE.to_string(),
            vocabulary_file: VOCABULARY_FILE.to_string(),
            labels_file: LABELS_FILE.to_string(),
        };
        let staged_manifest = staging.path().join(MANIFEST_FILE);
        write_synced(&staged_manifest, |out| {
            serde_json::to_writer_pretty(&mut *out, &manifest)?;
            writeln!(out)
        })?;
        fs::rename(&staged_manifest, &manifest_path)
            .map_err(|e| export_error("publish manifest", &manifest_path, e))?;

        info!(
            "Exported {}x{} matrix ({} non-zero) to {} [run {}]",
            rows,
            cols,
            manifest.nnz,
            self.out_dir.display(),
            manifest.run_id
        );
        Ok(manifest)
    }
}

/// Logical export shape, after checking the cross-artifact invariants
pub fn check_alignment(
    matrix: &SparseCountMatrix,
    vocabulary: &VocabularyIndex,
    labels: &SampleLabelRegistry,
) -> Result<(usize, usize)> {
    vocabulary.check_consistency()?;

    let (matrix_rows, matrix_cols) = matrix.shape();
    let rows = labels.len();
    let cols = vocabulary.len();

    if matrix_rows != rows {
        return Err(FeatureError::consistency(format!(
            "{} labels for {} matrix rows",
            rows, matrix_rows
        )));
    }
    // a frozen vocabulary may hold columns no sample has touched
    if matrix_cols > cols {
        return Err(FeatureError::consistency(format!(
            "matrix has {} columns but vocabulary has {} keys",
            matrix_cols, cols
        )));
    }
    // one label line per row
    if let Some(entry) = labels
        .export()
        .iter()
        .find(|e| e.sample_id.contains(['\n', '\r']))
    {
        return Err(FeatureError::consistency(format!(
            "sample id {:?} contains a line break",
            entry.sample_id
        )));
    }
    Ok((rows, cols))
}

/// Manifest of `dir`, or `None` if the export there is incomplete
pub fn read_manifest(dir: &Path) -> Result<Option<ExportManifest>> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let manifest = serde_json::from_reader(BufReader::new(File::open(&path)?))
        .map_err(|e| FeatureError::parse(format!("{}: {}", path.display(), e)))?;
    Ok(Some(manifest))
}

/// Read a complete export back and re-check its alignment
pub fn load_artifacts(dir: &Path) -> Result<ExportedArtifacts> {
    let manifest = read_manifest(dir)?.ok_or_else(|| {
        FeatureError::consistency(format!("{} has no {}", dir.display(), MANIFEST_FILE))
    })?;

    let matrix = read_matrix_market(BufReader::new(File::open(dir.join(&manifest.matrix_file))?))?;

    let mut vocabulary = Vec::new();
    for line in BufReader::new(File::open(dir.join(&manifest.vocabulary_file))?).lines() {
        vocabulary.push(CanonicalKey::parse(&line?)?);
    }

    let mut labels = Vec::new();
    for line in BufReader::new(File::open(dir.join(&manifest.labels_file))?).lines() {
        let line = line?;
        let (label, sample_id) = line
            .split_once(',')
            .ok_or_else(|| FeatureError::parse(format!("bad label line '{}'", line)))?;
        let label = LabelStyle::parse_label(label)
            .ok_or_else(|| FeatureError::parse(format!("bad label '{}'", label)))?;
        labels.push(LabelEntry {
            label,
            sample_id: sample_id.to_string(),
        });
    }

    if matrix.rows != labels.len() || matrix.cols != vocabulary.len() {
        return Err(FeatureError::consistency(format!(
            "matrix is {}x{} but there are {} labels and {} vocabulary keys",
            matrix.rows,
            matrix.cols,
            labels.len(),
            vocabulary.len()
        )));
    }

    Ok(ExportedArtifacts {
        manifest,
        matrix,
        vocabulary,
        labels,
    })
}

fn write_synced<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path).map_err(|e| export_error("create", path, e))?;
    let mut out = BufWriter::new(file);
    write(&mut out).map_err(|e| export_error("write", path, e))?;
    let file = out
        .into_inner()
        .map_err(|e| export_error("flush", path, e.into_error()))?;
    file.sync_all().map_err(|e| export_error("sync", path, e))
}

fn export_error(action: &str, path: &Path, err: impl std::fmt::Display) -> FeatureError {
    FeatureError::export(format!("{} {}: {}", action, path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::canonical::canonicalize;
    use crate::shared::RawPathRecord;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn key(name: &str) -> CanonicalKey {
        canonicalize(&RawPathRecord::new([name], ["FLOWS_TO"], ["CallExpression"]))
    }

    /// The two-sample example: A -> [P1, P1, P2], B -> [P2, P3]
    fn worked_example() -> (SparseCountMatrix, VocabularyIndex, SampleLabelRegistry) {
        let vocabulary = VocabularyIndex::new();
        let mut matrix = SparseCountMatrix::new();
        let mut labels = SampleLabelRegistry::new();

        for (row, (id, label, patterns)) in [
            ("/data/x/good/A__1", true, vec!["P1", "P1", "P2"]),
            ("/data/x/bad/B__2", false, vec!["P2", "P3"]),
        ]
        .into_iter()
        .enumerate()
        {
            matrix.open_row(row);
            for p in patterns {
                let col = vocabulary.resolve_or_create(key(p)).column().unwrap();
                matrix.increment(row, col, 1).unwrap();
            }
            labels.record(row, label, id).unwrap();
        }
        (matrix, vocabulary, labels)
    }

    #[test]
    fn test_export_writes_aligned_artifacts() {
        let dir = TempDir::new().unwrap();
        let (matrix, vocabulary, labels) = worked_example();

        let manifest = Exporter::new(dir.path(), LabelStyle::Numeric)
            .export(&matrix, &vocabulary, &labels)
            .unwrap();
        assert_eq!((manifest.rows, manifest.cols, manifest.nnz), (2, 3, 4));

        let mtx = fs::read_to_string(dir.path().join(MATRIX_FILE)).unwrap();
        assert_eq!(
            mtx,
            "%%MatrixMarket matrix coordinate integer general\n2 3 4\n1 1 2\n1 2 1\n2 2 1\n2 3 1\n"
        );
        let vocab = fs::read_to_string(dir.path().join(VOCABULARY_FILE)).unwrap();
        assert_eq!(
            vocab,
            "P1-[FLOWS_TO]->CallExpression\nP2-[FLOWS_TO]->CallExpression\nP3-[FLOWS_TO]->CallExpression\n"
        );
        let labels_txt = fs::read_to_string(dir.path().join(LABELS_FILE)).unwrap();
        assert_eq!(labels_txt, "1,/data/x/good/A__1\n0,/data/x/bad/B__2\n");
    }

    #[test]
    fn test_load_artifacts_round_trip() {
        let dir = TempDir::new().unwrap();
        let (matrix, vocabulary, labels) = worked_example();
        let manifest = Exporter::new(dir.path(), LabelStyle::Boolean)
            .export(&matrix, &vocabulary, &labels)
            .unwrap();

        let loaded = load_artifacts(dir.path()).unwrap();
        assert_eq!(loaded.manifest, manifest);
        assert_eq!(loaded.matrix.to_dense(), vec![vec![2, 1, 0], vec![0, 1, 1]]);
        assert_eq!(loaded.vocabulary, vocabulary.export_order());
        assert_eq!(loaded.labels, labels.export().to_vec());
    }

    #[test]
    fn test_no_staging_left_behind() {
        let dir = TempDir::new().unwrap();
        let (matrix, vocabulary, labels) = worked_example();
        Exporter::new(dir.path(), LabelStyle::Numeric)
            .export(&matrix, &vocabulary, &labels)
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_misaligned_labels_rejected_before_writing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let (mut matrix, vocabulary, labels) = worked_example();
        matrix.open_row(2);

        let err = Exporter::new(&out, LabelStyle::Numeric)
            .export(&matrix, &vocabulary, &labels)
            .unwrap_err();
        assert!(matches!(err, FeatureError::Consistency(_)));
        assert!(!out.exists());
    }

    #[test]
    fn test_line_breaks_in_type_labels_keep_one_key_per_line() {
        let dir = TempDir::new().unwrap();
        let vocabulary = VocabularyIndex::new();
        let mut matrix = SparseCountMatrix::new();
        let mut labels = SampleLabelRegistry::new();

        matrix.open_row(0);
        let odd = canonicalize(&RawPathRecord::new(["S\nX"], ["FLOWS_TO"], ["T\r"]));
        let col = vocabulary.resolve_or_create(odd.clone()).column().unwrap();
        matrix.increment(0, col, 1).unwrap();
        labels.record(0, true, "/data/x/good/A__1").unwrap();

        let manifest = Exporter::new(dir.path(), LabelStyle::Numeric)
            .export(&matrix, &vocabulary, &labels)
            .unwrap();
        let vocab = fs::read_to_string(dir.path().join(VOCABULARY_FILE)).unwrap();
        assert_eq!(vocab.lines().count(), manifest.cols);

        let loaded = load_artifacts(dir.path()).unwrap();
        assert_eq!(loaded.vocabulary, vec![odd]);
    }

    #[test]
    fn test_sample_id_with_line_break_rejected() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let mut matrix = SparseCountMatrix::new();
        let mut labels = SampleLabelRegistry::new();
        matrix.open_row(0);
        labels.record(0, false, "/data/x/bad/B\n__2").unwrap();

        let err = Exporter::new(&out, LabelStyle::Numeric)
            .export(&matrix, &VocabularyIndex::new(), &labels)
            .unwrap_err();
        assert!(matches!(err, FeatureError::Consistency(_)));
        assert!(!out.exists());
    }

    #[test]
    fn test_reexport_replaces_manifest() {
        let dir = TempDir::new().unwrap();
        let (matrix, vocabulary, labels) = worked_example();
        let exporter = Exporter::new(dir.path(), LabelStyle::Numeric);

        let first = exporter.export(&matrix, &vocabulary, &labels).unwrap();
        let second = exporter.export(&matrix, &vocabulary, &labels).unwrap();
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(read_manifest(dir.path()).unwrap().unwrap().run_id, second.run_id);
    }

    #[test]
    fn test_missing_manifest_means_incomplete() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MATRIX_FILE), "partial").unwrap();
        assert_eq!(read_manifest(dir.path()).unwrap(), None);
        assert!(load_artifacts(dir.path()).is_err());
    }

    #[test]
    fn test_empty_run_exports_empty_artifacts() {
        let dir = TempDir::new().unwrap();
        let manifest = Exporter::new(dir.path(), LabelStyle::Numeric)
            .export(
                &SparseCountMatrix::new(),
                &VocabularyIndex::new(),
                &SampleLabelRegistry::new(),
            )
            .unwrap();
        assert_eq!((manifest.rows, manifest.cols), (0, 0));
        let loaded = load_artifacts(dir.path()).unwrap();
        assert!(loaded.labels.is_empty());
    }
}
