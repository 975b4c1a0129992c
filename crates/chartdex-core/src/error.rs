//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid chart archive {path}: {message}")]
    InvalidArchive { path: String, message: String },

    #[error("Failed to parse Chart.yaml: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: {message}")]
    FileAccess { path: String, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid version constraint '{constraint}': {message}")]
    InvalidConstraint { constraint: String, message: String },

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Chart metadata validation failure
///
/// The rendered messages match the ones chart tooling has always printed,
/// since repository operators grep their logs for them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("validation: chart.metadata.apiVersion is required")]
    MissingApiVersion,

    #[error("validation: chart.metadata.name is required")]
    MissingName,

    #[error("validation: chart.metadata.name {0:?} is invalid")]
    InvalidName(String),

    #[error("validation: chart.metadata.version is required")]
    MissingVersion,

    #[error("validation: chart.metadata.version {0:?} is invalid")]
    InvalidVersion(String),

    #[error("validation: chart.metadata.type must be application or library")]
    InvalidType(String),

    #[error("validation: maintainers must not contain empty or null nodes")]
    EmptyMaintainer,

    #[error("validation: dependencies must not contain empty or null nodes")]
    EmptyDependency,

    #[error("validation: dependency {0:?} has disallowed characters in the alias")]
    InvalidAlias(String),

    #[error("validation: more than one dependency with name or alias {0:?}")]
    DuplicateDependency(String),
}
