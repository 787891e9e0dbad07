//! Shared models used across the extraction features

pub mod models;

pub use models::{EntryPoint, RawPathRecord, Sample, SampleDescriptor};
