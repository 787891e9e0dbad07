//! Error types for codegraph-graphdb

use std::fmt;
use thiserror::Error;

/// Graph store error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Store could not be reached or opened
    Connection,
    /// Database errors (SQLite)
    Database,
    /// Serialization/deserialization errors
    Serialization,
    /// Node id not present in the graph
    NodeNotFound,
    /// Snapshot violates a structural rule (dangling edge, duplicate id)
    InvalidGraph,
    /// I/O errors
    IO,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::NodeNotFound => "node_not_found",
            ErrorKind::InvalidGraph => "invalid_graph",
            ErrorKind::IO => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Graph store error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct GraphStoreError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl GraphStoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn node_not_found(node_id: i64) -> Self {
        Self::new(
            ErrorKind::NodeNotFound,
            format!("Node not found: {}", node_id),
        )
    }

    pub fn invalid_graph(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGraph, message)
    }

    /// True when the store itself is unusable, as opposed to a single bad query
    pub fn is_connection(&self) -> bool {
        self.kind == ErrorKind::Connection
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for GraphStoreError {
    fn from(err: rusqlite::Error) -> Self {
        GraphStoreError::database(format!("SQLite error: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for GraphStoreError {
    fn from(err: serde_json::Error) -> Self {
        GraphStoreError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<std::io::Error> for GraphStoreError {
    fn from(err: std::io::Error) -> Self {
        GraphStoreError::new(ErrorKind::IO, format!("IO error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GraphStoreError>;
