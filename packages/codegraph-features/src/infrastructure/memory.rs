//! In-memory graph-query adapter
//!
//! Serves canned samples and path records. Failures can be injected per
//! sample or per entry point to drive the recovery paths of the pipeline.

use crate::ports::{AdapterError, GraphQueryAdapter};
use crate::shared::{EntryPoint, RawPathRecord, SampleDescriptor};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct InMemoryAdapter {
    samples: Vec<SampleDescriptor>,
    entry_points: HashMap<String, Vec<EntryPoint>>,
    patterns: HashMap<EntryPoint, Vec<RawPathRecord>>,
    failing_samples: HashSet<String>,
    failing_entry_points: HashSet<EntryPoint>,
    disconnected_samples: HashSet<String>,
    next_entry: i64,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample with one entry point per record list
    pub fn with_sample(
        mut self,
        id: impl Into<String>,
        is_positive: bool,
        entries: Vec<Vec<RawPathRecord>>,
    ) -> Self {
        let id = id.into();
        let mut points = Vec::with_capacity(entries.len());
        for records in entries {
            let entry = EntryPoint(self.next_entry);
            self.next_entry += 1;
            self.patterns.insert(entry, records);
            points.push(entry);
        }
        self.entry_points.insert(id.clone(), points);
        self.samples.push(SampleDescriptor::new(id, is_positive));
        self
    }

    /// `list_entry_points` fails with a query error for this sample
    pub fn with_failing_sample(mut self, id: impl Into<String>) -> Self {
        self.failing_samples.insert(id.into());
        self
    }

    /// `list_flow_patterns` fails with a query error for this entry point
    pub fn with_failing_entry_point(mut self, entry: EntryPoint) -> Self {
        self.failing_entry_points.insert(entry);
        self
    }

    /// `list_entry_points` reports a lost connection for this sample
    pub fn with_disconnect_at(mut self, id: impl Into<String>) -> Self {
        self.disconnected_samples.insert(id.into());
        self
    }

    pub fn entry_points_of(&self, id: &str) -> &[EntryPoint] {
        self.entry_points.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl GraphQueryAdapter for InMemoryAdapter {
    fn list_samples(&self) -> Result<Vec<SampleDescriptor>, AdapterError> {
        let mut samples = self.samples.clone();
        samples.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(samples)
    }

    fn list_entry_points(&self, sample_id: &str) -> Result<Vec<EntryPoint>, AdapterError> {
        if self.disconnected_samples.contains(sample_id) {
            return Err(AdapterError::Connection(format!(
                "store went away while listing '{}'",
                sample_id
            )));
        }
        if self.failing_samples.contains(sample_id) {
            return Err(AdapterError::Query(format!("entry point query failed for '{}'", sample_id)));
        }
        Ok(self.entry_points_of(sample_id).to_vec())
    }

    fn list_flow_patterns(&self, entry: EntryPoint) -> Result<Vec<RawPathRecord>, AdapterError> {
        if self.failing_entry_points.contains(&entry) {
            return Err(AdapterError::Query(format!("flow query timed out for {}", entry)));
        }
        Ok(self.patterns.get(&entry).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_sorted_by_id() {
        let adapter = InMemoryAdapter::new()
            .with_sample("b", false, vec![])
            .with_sample("a", true, vec![]);
        let ids: Vec<String> = adapter.list_samples().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_injected_failures() {
        let record = RawPathRecord::new(["A"], ["FLOWS_TO"], ["B"]);
        let adapter = InMemoryAdapter::new()
            .with_sample("s", true, vec![vec![record.clone()], vec![record]])
            .with_failing_entry_point(EntryPoint(1))
            .with_failing_sample("t")
            .with_disconnect_at("u");

        assert_eq!(adapter.list_entry_points("s").unwrap(), vec![EntryPoint(0), EntryPoint(1)]);
        assert_eq!(adapter.list_flow_patterns(EntryPoint(0)).unwrap().len(), 1);
        assert!(matches!(
            adapter.list_flow_patterns(EntryPoint(1)),
            Err(AdapterError::Query(_))
        ));
        assert!(matches!(adapter.list_entry_points("t"), Err(AdapterError::Query(_))));
        assert!(matches!(adapter.list_entry_points("u"), Err(AdapterError::Connection(_))));
    }
}
