use crate::errors::{ErrorCategory, FeatureError, Result};
use serde::{Deserialize, Serialize};

/// Extraction run state
///
/// ```text
/// Idle -> DiscoveringSamples -> ProcessingSample(i) -> Accumulating(i)
///                                      ^                     |
///                                      +---- next sample ----+-> Exporting -> Done | Cancelled
/// ```
///
/// Any non-terminal state may move to `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractionState {
    Idle,
    DiscoveringSamples,
    ProcessingSample { index: usize, total: usize },
    Accumulating { index: usize, total: usize },
    Exporting { cancelled: bool },
    Done { samples_processed: usize },
    Failed { error: String, error_category: ErrorCategory },
    Cancelled { samples_processed: usize },
}

impl ExtractionState {
    pub fn state_name(&self) -> &'static str {
        match self {
            ExtractionState::Idle => "idle",
            ExtractionState::DiscoveringSamples => "discovering_samples",
            ExtractionState::ProcessingSample { .. } => "processing_sample",
            ExtractionState::Accumulating { .. } => "accumulating",
            ExtractionState::Exporting { .. } => "exporting",
            ExtractionState::Done { .. } => "done",
            ExtractionState::Failed { .. } => "failed",
            ExtractionState::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExtractionState::Done { .. } | ExtractionState::Failed { .. } | ExtractionState::Cancelled { .. }
        )
    }
}

/// Guards the legal transitions of one run
#[derive(Debug)]
pub struct ExtractionStateMachine {
    state: ExtractionState,
    samples_accumulated: usize,
}

impl Default for ExtractionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStateMachine {
    pub fn new() -> Self {
        Self {
            state: ExtractionState::Idle,
            samples_accumulated: 0,
        }
    }

    pub fn state(&self) -> &ExtractionState {
        &self.state
    }

    /// Samples that reached `Accumulating`
    pub fn samples_accumulated(&self) -> usize {
        self.samples_accumulated
    }

    fn invalid(&self, to: &str) -> FeatureError {
        FeatureError::InvalidStateTransition {
            from: self.state.state_name().to_string(),
            to: to.to_string(),
        }
    }

    /// Transition: IDLE → DISCOVERING_SAMPLES
    pub fn discover(&mut self) -> Result<()> {
        match self.state {
            ExtractionState::Idle => {
                self.state = ExtractionState::DiscoveringSamples;
                Ok(())
            }
            _ => Err(self.invalid("discovering_samples")),
        }
    }

    /// Transition: DISCOVERING_SAMPLES | ACCUMULATING(index - 1) → PROCESSING_SAMPLE(index)
    pub fn begin_sample(&mut self, index: usize, total: usize) -> Result<()> {
        let allowed = match self.state {
            ExtractionState::DiscoveringSamples => index == 0,
            ExtractionState::Accumulating { index: prev, .. } => index == prev + 1,
            _ => false,
        };
        if !allowed || index >= total {
            return Err(self.invalid("processing_sample"));
        }
        self.state = ExtractionState::ProcessingSample { index, total };
        Ok(())
    }

    /// Transition: PROCESSING_SAMPLE(i) → ACCUMULATING(i)
    pub fn accumulate(&mut self) -> Result<()> {
        match self.state {
            ExtractionState::ProcessingSample { index, total } => {
                self.state = ExtractionState::Accumulating { index, total };
                self.samples_accumulated += 1;
                Ok(())
            }
            _ => Err(self.invalid("accumulating")),
        }
    }

    /// Transition: DISCOVERING_SAMPLES | ACCUMULATING → EXPORTING
    ///
    /// Without cancellation every discovered sample must have been accumulated.
    pub fn begin_export(&mut self, cancelled: bool) -> Result<()> {
        let allowed = match self.state {
            ExtractionState::DiscoveringSamples => true,
            ExtractionState::Accumulating { index, total } => cancelled || index + 1 == total,
            _ => false,
        };
        if !allowed {
            return Err(self.invalid("exporting"));
        }
        self.state = ExtractionState::Exporting { cancelled };
        Ok(())
    }

    /// Transition: EXPORTING → DONE | CANCELLED
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            ExtractionState::Exporting { cancelled } => {
                let samples_processed = self.samples_accumulated;
                self.state = if cancelled {
                    ExtractionState::Cancelled { samples_processed }
                } else {
                    ExtractionState::Done { samples_processed }
                };
                Ok(())
            }
            _ => Err(self.invalid("done")),
        }
    }

    /// Transition: * → FAILED
    pub fn fail(&mut self, error: &FeatureError) -> Result<()> {
        if self.state.is_terminal() {
            return Err(self.invalid("failed"));
        }
        self.state = ExtractionState::Failed {
            error: error.to_string(),
            error_category: error.category(),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_run() {
        let mut sm = ExtractionStateMachine::new();
        sm.discover().unwrap();
        for i in 0..3 {
            sm.begin_sample(i, 3).unwrap();
            sm.accumulate().unwrap();
        }
        sm.begin_export(false).unwrap();
        sm.finish().unwrap();

        assert_eq!(sm.state(), &ExtractionState::Done { samples_processed: 3 });
        assert!(sm.state().is_terminal());
    }

    #[test]
    fn test_no_samples_goes_straight_to_export() {
        let mut sm = ExtractionStateMachine::new();
        sm.discover().unwrap();
        sm.begin_export(false).unwrap();
        sm.finish().unwrap();
        assert_eq!(sm.state(), &ExtractionState::Done { samples_processed: 0 });
    }

    #[test]
    fn test_cancel_exports_prefix() {
        let mut sm = ExtractionStateMachine::new();
        sm.discover().unwrap();
        sm.begin_sample(0, 5).unwrap();
        sm.accumulate().unwrap();
        sm.begin_export(true).unwrap();
        sm.finish().unwrap();
        assert_eq!(sm.state(), &ExtractionState::Cancelled { samples_processed: 1 });
    }

    #[test]
    fn test_invalid_transitions() {
        let mut sm = ExtractionStateMachine::new();
        assert!(matches!(
            sm.begin_sample(0, 1),
            Err(FeatureError::InvalidStateTransition { .. })
        ));

        sm.discover().unwrap();
        assert!(sm.begin_sample(1, 3).is_err());
        sm.begin_sample(0, 3).unwrap();
        assert!(sm.begin_export(false).is_err());
        sm.accumulate().unwrap();
        // samples 1 and 2 still pending
        assert!(sm.begin_export(false).is_err());
        assert!(sm.begin_sample(2, 3).is_err());
    }

    #[test]
    fn test_fail_from_any_running_state() {
        let mut sm = ExtractionStateMachine::new();
        sm.discover().unwrap();
        sm.fail(&FeatureError::Connection("refused".into())).unwrap();

        match sm.state() {
            ExtractionState::Failed { error_category, .. } => {
                assert_eq!(*error_category, ErrorCategory::Fatal)
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert!(sm.fail(&FeatureError::export("x")).is_err());
    }

    #[test]
    fn test_state_serialization() {
        let state = ExtractionState::ProcessingSample { index: 2, total: 9 };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"type":"processing_sample","index":2,"total":9}"#);
    }
}
