//! Error types for repository operations

use chartdex_core::{CoreError, ValidationError};
use thiserror::Error;

use crate::index::IndexFile;

/// Repository operation errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Index Errors ============
    #[error("no API version specified")]
    NoApiVersion,

    #[error("empty index.yaml file")]
    EmptyIndex,

    #[error("Index parse error: {message}")]
    IndexParseError { message: String },

    #[error("error loading {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: Box<RepoError>,
    },

    // ============ Lookup Errors ============
    #[error("no chart name found: {name}")]
    ChartNotFound { name: String },

    #[error("no chart version found for {name}")]
    NoChartVersions { name: String },

    #[error("no chart version found for {name}-{constraint}")]
    VersionNotFound { name: String, constraint: String },

    #[error("invalid version constraint '{constraint}': {message}")]
    InvalidConstraint { constraint: String, message: String },

    // ============ Chart Errors ============
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("validate failed for {filename}: {source}")]
    InvalidEntry {
        filename: String,
        #[source]
        source: ValidationError,
    },

    #[error("{context}: {source}")]
    Chart {
        context: String,
        #[source]
        source: CoreError,
    },

    // ============ Configuration Errors ============
    #[error("Invalid repository configuration: {message}")]
    InvalidConfig { message: String },

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to access {path}: {message}")]
    FileAccess { path: String, message: String },

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    /// Wrap a core error with a description of what was being attempted
    pub fn chart(context: impl Into<String>, source: CoreError) -> Self {
        RepoError::Chart {
            context: context.into(),
            source,
        }
    }
}

impl RepoError {
    /// Attach the path of the index being loaded
    pub fn load(path: impl Into<String>, source: impl Into<RepoError>) -> Self {
        RepoError::Load {
            path: path.into(),
            source: Box::new(source.into()),
        }
    }
}

impl From<CoreError> for RepoError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(v) => RepoError::Validation(v),
            CoreError::InvalidConstraint {
                constraint,
                message,
            } => RepoError::InvalidConstraint {
                constraint,
                message,
            },
            CoreError::FileAccess { path, message } => RepoError::FileAccess { path, message },
            CoreError::Io(e) => RepoError::Io(e),
            other => RepoError::chart("chart operation failed", other),
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<PartialIndex> for RepoError {
    fn from(e: PartialIndex) -> Self {
        e.error
    }
}

/// A failure that still produced a usable, possibly incomplete, index
///
/// Returned when an index loads but lacks its `apiVersion`, when decoding
/// fails outright (the index is then empty), and when a directory scan
/// aborts after indexing some archives.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PartialIndex {
    pub index: IndexFile,
    #[source]
    pub error: RepoError,
}

impl PartialIndex {
    pub fn new(index: IndexFile, error: impl Into<RepoError>) -> Self {
        Self {
            index,
            error: error.into(),
        }
    }

    /// Split into the partial index and the error
    pub fn into_parts(self) -> (IndexFile, RepoError) {
        (self.index, self.error)
    }
}
