//! Sample label registry
//!
//! One `(label, sample_id)` entry per matrix row, recorded strictly in row
//! order. The registry length is what the exporter checks against the matrix
//! row count.

use crate::errors::{FeatureError, Result};
use serde::{Deserialize, Serialize};

/// How labels are written to the labels artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelStyle {
    /// `1` / `0`
    #[default]
    Numeric,
    /// `True` / `False`
    Boolean,
}

impl LabelStyle {
    pub fn format(&self, label: bool) -> &'static str {
        match (self, label) {
            (LabelStyle::Numeric, true) => "1",
            (LabelStyle::Numeric, false) => "0",
            (LabelStyle::Boolean, true) => "True",
            (LabelStyle::Boolean, false) => "False",
        }
    }

    /// Inverse of `format`, accepting either style
    pub fn parse_label(text: &str) -> Option<bool> {
        match text {
            "1" | "True" | "true" => Some(true),
            "0" | "False" | "false" => Some(false),
            _ => None,
        }
    }
}

impl std::str::FromStr for LabelStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "numeric" => Ok(LabelStyle::Numeric),
            "boolean" => Ok(LabelStyle::Boolean),
            other => Err(format!("unknown label style '{}' (expected numeric or boolean)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub label: bool,
    pub sample_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct SampleLabelRegistry {
    entries: Vec<LabelEntry>,
}

impl SampleLabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the label of `row_index`
    ///
    /// # Errors
    ///
    /// `Consistency` unless `row_index` is exactly the next row.
    pub fn record(&mut self, row_index: usize, label: bool, sample_id: impl Into<String>) -> Result<()> {
        let expected = self.entries.len();
        if row_index != expected {
            let sample_id = sample_id.into();
            return Err(FeatureError::consistency(if row_index < expected {
                format!("row {} ('{}') already has a label", row_index, sample_id)
            } else {
                format!(
                    "label for row {} ('{}') recorded before row {}",
                    row_index, sample_id, expected
                )
            }));
        }
        self.entries.push(LabelEntry {
            label,
            sample_id: sample_id.into(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in row order
    pub fn export(&self) -> &[LabelEntry] {
        &self.entries
    }
}
