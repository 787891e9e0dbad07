//! Error types for codegraph-features
//!
//! Every failure is classified as recoverable (logged, the run continues) or
//! fatal (the run aborts and nothing is exported).

use crate::config::ConfigError;
use crate::ports::AdapterError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeatureError>;

#[derive(Error, Debug)]
pub enum FeatureError {
    /// Graph store unreachable
    #[error("Connection failure: {0}")]
    Connection(String),

    /// One query failed (entry point or sample scope)
    #[error("Query failure ({scope}): {message}")]
    Query { scope: String, message: String },

    /// Internal invariant broken (misaligned rows, index collision)
    #[error("Consistency violation: {0}")]
    Consistency(String),

    /// Artifact write failed
    #[error("Export failure: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeatureError {
    pub fn query(scope: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Query {
            scope: scope.into(),
            message: message.to_string(),
        }
    }

    pub fn consistency<E: std::fmt::Display>(e: E) -> Self {
        Self::Consistency(e.to_string())
    }

    pub fn export<E: std::fmt::Display>(e: E) -> Self {
        Self::Export(e.to_string())
    }

    pub fn parse<E: std::fmt::Display>(e: E) -> Self {
        Self::Parse(e.to_string())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            FeatureError::Query { .. } => ErrorCategory::Recoverable,
            _ => ErrorCategory::Fatal,
        }
    }

    /// Convert an adapter error raised while serving `scope`
    pub fn from_adapter(scope: impl Into<String>, err: AdapterError) -> Self {
        match err {
            AdapterError::Connection(msg) => FeatureError::Connection(msg),
            AdapterError::Query(msg) => FeatureError::query(scope, msg),
        }
    }
}

/// Error category for run control
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Logged and treated as zero contribution
    Recoverable,
    /// Aborts the run before export
    Fatal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Recoverable => "recoverable",
            ErrorCategory::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
