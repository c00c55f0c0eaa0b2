//! Error handling module
//!
//! Provides unified error types for the comparison engine.

use crate::connection::ConnectionLabel;
use std::path::PathBuf;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The database could not be reached at all
    #[error("Connection error ({label}): {message}")]
    Connection {
        label: ConnectionLabel,
        message: String,
    },

    /// A catalog query failed or came back with an unexpected shape
    #[error("Query error ({label}) while {context}: {message}")]
    Query {
        label: ConnectionLabel,
        context: String,
        message: String,
    },

    /// A migration script could not be written
    #[error("Persistence error for {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Create a Connection error for one side of the comparison
    pub fn connection(label: ConnectionLabel, message: impl ToString) -> Self {
        AppError::Connection {
            label,
            message: message.to_string(),
        }
    }

    /// Create a Query error with context about where it occurred
    pub fn query(label: ConnectionLabel, context: impl Into<String>, message: impl ToString) -> Self {
        AppError::Query {
            label,
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Connection label this error belongs to, if any
    pub fn label(&self) -> Option<ConnectionLabel> {
        match self {
            AppError::Connection { label, .. } | AppError::Query { label, .. } => Some(*label),
            AppError::Persistence { .. } | AppError::Config(_) => None,
        }
    }

    /// Stage of the comparison that produced this error
    pub fn stage(&self) -> &'static str {
        match self {
            AppError::Connection { .. } => "connect",
            AppError::Query { .. } => "introspect",
            AppError::Persistence { .. } => "emit",
            AppError::Config(_) => "configure",
        }
    }
}

/// Result type alias for engine operations
pub type AppResult<T> = Result<T, AppError>;
