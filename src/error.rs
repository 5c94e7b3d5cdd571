//! Error types for the orchestration core.

use std::path::PathBuf;
use thiserror::Error;

/// Error type returned by provider implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for provider calls.
pub type ProviderResult<T> = std::result::Result<T, BoxError>;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Error, Debug)]
pub enum Error {
    /// The appfile has no active infrastructure matching its project
    #[error("infrastructure not found in appfile: {name}")]
    NoInfrastructure {
        /// Infrastructure name the project selects
        name: String,
    },

    /// No factory registered for a lookup key
    #[error("{kind} implementation for tuple not found: {key}")]
    NoImplementation {
        /// Provider family
        kind: &'static str,
        /// Display form of the lookup key
        key: String,
    },

    /// A factory failed to construct its provider
    #[error("{kind} failed to start properly for {key}: {source}")]
    ProviderStart {
        /// Provider family
        kind: &'static str,
        /// Display form of the lookup key
        key: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// A provider call failed
    #[error("error {stage} '{target}': {source}")]
    Provider {
        /// Pipeline stage, e.g. "compiling"
        stage: &'static str,
        /// Infra type, foundation name or application name
        target: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// Preparing a graph vertex failed before its provider was called
    #[error("error {stage} for '{name}': {source}")]
    Vertex {
        /// What was being loaded, e.g. "loading appfile"
        stage: &'static str,
        /// Application name of the vertex
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// Unknown task for `Execute`
    #[error("unknown task: {0}")]
    UnknownTask(String),

    /// Filesystem error with the operation that caused it
    #[error("{context}: {source}")]
    Io {
        /// What was being done
        context: String,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// The persisted compile metadata could not be decoded
    #[error("invalid compile metadata {}: {message}", path.display())]
    Metadata {
        /// Metadata file
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// JSON encoding error
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Compiled graph precondition violation
    #[error("graph error: {0}")]
    Graph(String),

    /// Directory backend failure
    #[error("directory error: {0}")]
    Directory(String),

    /// Dev address allocation failure
    #[error("address allocation error: {0}")]
    Address(String),

    /// Compiled appfile document could not be read
    #[error("appfile error: {0}")]
    Appfile(String),
}

impl Error {
    /// Create an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a provider error for a stage and target
    pub fn provider(stage: &'static str, target: impl Into<String>, source: BoxError) -> Self {
        Self::Provider {
            stage,
            target: target.into(),
            source,
        }
    }

    /// Attach the vertex being prepared to an error
    pub fn vertex(stage: &'static str, name: impl Into<String>, source: Error) -> Self {
        Self::Vertex {
            stage,
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Create a graph error
    pub fn graph(message: impl Into<String>) -> Self {
        Self::Graph(message.into())
    }
}
