//! Append-only vocabulary: canonical key <-> column index
//!
//! Columns are handed out in first-seen order starting at 0 and are never
//! renumbered. The index guards its own state with a `RwLock`, so it can be
//! shared by reference between workers: lookups of known keys take the read
//! lock only, and creation re-checks under the write lock so two racing
//! callers can never mint two columns for one key or one column for two keys.

use crate::errors::{FeatureError, Result};
use crate::features::canonical::CanonicalKey;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Outcome of `resolve_or_create`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Key was already known
    Existing(usize),
    /// Key was added with a fresh column
    Created(usize),
    /// Frozen vocabulary and unknown key
    Rejected,
}

impl Resolution {
    pub fn column(&self) -> Option<usize> {
        match self {
            Resolution::Existing(c) | Resolution::Created(c) => Some(*c),
            Resolution::Rejected => None,
        }
    }
}

#[derive(Debug, Default)]
struct VocabularyState {
    index: AHashMap<CanonicalKey, usize>,
    order: Vec<CanonicalKey>,
}

#[derive(Debug, Default)]
pub struct VocabularyIndex {
    state: RwLock<VocabularyState>,
    frozen: bool,
}

impl VocabularyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from keys in column order
    ///
    /// # Errors
    ///
    /// `Consistency` if a key appears twice.
    pub fn from_keys(keys: impl IntoIterator<Item = CanonicalKey>, frozen: bool) -> Result<Self> {
        let mut state = VocabularyState::default();
        for key in keys {
            let column = state.order.len();
            if state.index.insert(key.clone(), column).is_some() {
                return Err(FeatureError::consistency(format!(
                    "duplicate vocabulary key '{}' at column {}",
                    key, column
                )));
            }
            state.order.push(key);
        }
        Ok(Self {
            state: RwLock::new(state),
            frozen,
        })
    }

    /// Load a vocabulary artifact (one rendered key per line)
    pub fn load(path: &Path, frozen: bool) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut keys = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let key = CanonicalKey::parse(&line).map_err(|e| {
                FeatureError::parse(format!("{}:{}: {}", path.display(), line_no + 1, e))
            })?;
            keys.push(key);
        }
        Self::from_keys(keys, frozen)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Column of `key`, creating one unless the vocabulary is frozen
    pub fn resolve_or_create(&self, key: CanonicalKey) -> Resolution {
        if let Some(&column) = self.state.read().index.get(&key) {
            return Resolution::Existing(column);
        }
        if self.frozen {
            return Resolution::Rejected;
        }

        let mut state = self.state.write();
        if let Some(&column) = state.index.get(&key) {
            return Resolution::Existing(column);
        }
        let column = state.order.len();
        state.order.push(key.clone());
        state.index.insert(key, column);
        Resolution::Created(column)
    }

    pub fn resolve(&self, key: &CanonicalKey) -> Option<usize> {
        self.state.read().index.get(key).copied()
    }

    pub fn key_at(&self, column: usize) -> Option<CanonicalKey> {
        self.state.read().order.get(column).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys indexed by column
    pub fn export_order(&self) -> Vec<CanonicalKey> {
        self.state.read().order.clone()
    }

    /// Verify the key <-> column bijection
    pub fn check_consistency(&self) -> Result<()> {
        let state = self.state.read();
        if state.index.len() != state.order.len() {
            return Err(FeatureError::consistency(format!(
                "vocabulary has {} keys but {} columns",
                state.index.len(),
                state.order.len()
            )));
        }
        for (column, key) in state.order.iter().enumerate() {
            match state.index.get(key) {
                Some(&c) if c == column => {}
                other => {
                    return Err(FeatureError::consistency(format!(
                        "column index collision: key '{}' at column {} maps to {:?}",
                        key, column, other
                    )))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::canonical::canonicalize;
    use crate::shared::RawPathRecord;
    use std::sync::Arc;

    fn key(name: &str) -> CanonicalKey {
        canonicalize(&RawPathRecord::new([name], ["FLOWS_TO"], ["Sink"]))
    }

    #[test]
    fn test_first_seen_order() {
        let vocab = VocabularyIndex::new();
        assert_eq!(vocab.resolve_or_create(key("P1")), Resolution::Created(0));
        assert_eq!(vocab.resolve_or_create(key("P2")), Resolution::Created(1));
        assert_eq!(vocab.resolve_or_create(key("P1")), Resolution::Existing(0));
        assert_eq!(vocab.resolve_or_create(key("P3")), Resolution::Created(2));

        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.export_order(), vec![key("P1"), key("P2"), key("P3")]);
        assert!(vocab.check_consistency().is_ok());
    }

    #[test]
    fn test_index_stability() {
        let vocab = VocabularyIndex::new();
        let first = vocab.resolve_or_create(key("stable")).column().unwrap();
        for i in 0..1000 {
            vocab.resolve_or_create(key(&format!("k{}", i)));
        }
        assert_eq!(vocab.resolve(&key("stable")), Some(first));
        assert_eq!(vocab.key_at(first), Some(key("stable")));
    }

    #[test]
    fn test_frozen_rejects_unknown() {
        let vocab = VocabularyIndex::from_keys(vec![key("A"), key("B")], true).unwrap();
        assert!(vocab.is_frozen());
        assert_eq!(vocab.resolve_or_create(key("B")), Resolution::Existing(1));
        assert_eq!(vocab.resolve_or_create(key("C")), Resolution::Rejected);
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn test_duplicate_seed_rejected() {
        let err = VocabularyIndex::from_keys(vec![key("A"), key("A")], false).unwrap_err();
        assert!(matches!(err, FeatureError::Consistency(_)));
    }

    #[test]
    fn test_concurrent_resolution_assigns_unique_columns() {
        let vocab = Arc::new(VocabularyIndex::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let vocab = Arc::clone(&vocab);
                std::thread::spawn(move || {
                    (0..200)
                        .map(|i| {
                            // half the keys are shared between all threads
                            let name = if i % 2 == 0 { format!("shared{}", i) } else { format!("t{}_{}", t, i) };
                            (name.clone(), vocab.resolve_or_create(key(&name)).column().unwrap())
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for handle in handles {
            for (name, column) in handle.join().unwrap() {
                let prev = seen.insert(name, column);
                if let Some(prev) = prev {
                    assert_eq!(prev, column);
                }
            }
        }

        assert_eq!(vocab.len(), 100 + 8 * 100);
        assert!(vocab.check_consistency().is_ok());
        let mut columns: Vec<usize> = seen.values().copied().collect();
        columns.sort_unstable();
        assert_eq!(columns, (0..vocab.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_load_artifact() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graphs.txt");
        std::fs::write(&path, "A-[FLOWS_TO]->Sink\nB-[FLOWS_TO]->Sink\n").unwrap();

        let vocab = VocabularyIndex::load(&path, false).unwrap();
        assert_eq!(vocab.resolve(&key("B")), Some(1));
        assert!(!vocab.is_frozen());
    }

    #[test]
    fn test_load_reports_bad_line() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graphs.txt");
        std::fs::write(&path, "A-[FLOWS_TO]->Sink\nnot a key\n").unwrap();

        let err = VocabularyIndex::load(&path, true).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }
}
