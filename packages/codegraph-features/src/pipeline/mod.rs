//! Extraction run orchestration

pub mod extraction;
pub mod state;

pub use extraction::{
    CancelHandle, ExtractionOutput, ExtractionPipeline, ExtractionReport, ExtractionRun,
};
pub use state::{ExtractionState, ExtractionStateMachine};
