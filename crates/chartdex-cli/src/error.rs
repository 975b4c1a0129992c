//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use chartdex_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// User provided invalid input
    #[error("{message}")]
    #[diagnostic(code(chartdex::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Repository, chart or version could not be found
    #[error("{message}")]
    #[diagnostic(code(chartdex::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Index parsing, building or validation failed
    #[error("Index error: {message}")]
    #[diagnostic(code(chartdex::cli::index))]
    Index {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Repository configuration could not be loaded
    #[error("Configuration error: {message}")]
    #[diagnostic(code(chartdex::cli::config))]
    Config { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartdex::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(chartdex::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::USAGE_ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Index { .. } => exit_codes::INDEX_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an input error (user provided invalid input)
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a not-found error with help text
    pub fn not_found_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Attach help text to an error that carries one
    pub fn with_help(self, text: impl Into<String>) -> Self {
        match self {
            Self::Input { message, .. } => Self::Input {
                message,
                help: Some(text.into()),
            },
            Self::NotFound { message, .. } => Self::NotFound {
                message,
                help: Some(text.into()),
            },
            Self::Index { message, .. } => Self::Index {
                message,
                help: Some(text.into()),
            },
            other => other,
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        let message = err.to_string();
        match err {
            RepoError::ChartNotFound { .. }
            | RepoError::NoChartVersions { .. }
            | RepoError::VersionNotFound { .. } => CliError::NotFound {
                message,
                help: None,
            },
            RepoError::InvalidConstraint { .. } => CliError::input_with_help(
                message,
                "Use a constraint such as '1.2.3', '^1.2', '~1.2.0' or '>= 1.0, < 2.0'",
            ),
            RepoError::InvalidConfig { .. } => CliError::Config { message },
            RepoError::Io(_) | RepoError::FileAccess { .. } => CliError::Io { message },
            _ => CliError::Index {
                message,
                help: None,
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
