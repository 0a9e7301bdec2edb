//! Error types for labsql.

use std::fmt;

use thiserror::Error;

/// Broad category of a translation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The construct is recognized but the embedded dialect rewrite is not implemented.
    UnsupportedConstruct,
    /// The construct is recognized but its text does not have the expected shape.
    MalformedInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnsupportedConstruct => write!(f, "unsupported construct"),
            ErrorKind::MalformedInput => write!(f, "malformed input"),
        }
    }
}

/// A failure raised by a single translation stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// Construct the embedded dialect rewrite does not handle.
    #[error("Unsupported construct `{fragment}`: {reason}")]
    Unsupported { fragment: String, reason: String },

    /// Construct whose text could not be decomposed.
    #[error("Malformed input `{fragment}`: {reason}")]
    Malformed { fragment: String, reason: String },
}

impl TranslateError {
    pub fn unsupported(fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unsupported { .. } => ErrorKind::UnsupportedConstruct,
            Self::Malformed { .. } => ErrorKind::MalformedInput,
        }
    }

    /// The offending substring of the query.
    pub fn fragment(&self) -> &str {
        match self {
            Self::Unsupported { fragment, .. } | Self::Malformed { fragment, .. } => fragment,
        }
    }
}

/// Result of a single translation stage.
pub type TranslateResult<T> = Result<T, TranslateError>;

/// The main error type for labsql operations.
#[derive(Debug, Error)]
pub enum LabError {
    /// A query could not be ported to the embedded dialect.
    #[error("Translation error: {source}\n  in query: {query}")]
    Translation {
        query: String,
        #[source]
        source: TranslateError,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LabError {
    /// Attach the untranslated query to a stage failure.
    pub fn translation(query: impl Into<String>, source: TranslateError) -> Self {
        Self::Translation {
            query: query.into(),
            source,
        }
    }
}

impl From<rusqlite::Error> for LabError {
    fn from(e: rusqlite::Error) -> Self {
        LabError::Database(e.to_string())
    }
}

/// Result type alias for labsql operations.
pub type LabResult<T> = Result<T, LabError>;
