//! Error types for the search core.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`SearchError`] enum. Conditions the engine considers recoverable (a term
//! that is not in the dictionary, a member index whose open failure may be
//! ignored) are still represented here so components can classify them, but
//! callers typically turn them into report lines instead of failing.
//!
//! # Examples
//!
//! ```
//! use searchcore::error::{Result, SearchError};
//!
//! fn lookup() -> Result<()> {
//!     Err(SearchError::term_not_found("zebra"))
//! }
//!
//! let err = lookup().unwrap_err();
//! assert!(err.is_recoverable_term_error());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// I/O errors (configuration files, index files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index-related errors (open failures, corrupt metadata).
    #[error("Index error: {0}")]
    Index(String),

    /// Query-related errors (invalid structure, unusable modifiers).
    #[error("Query error: {0}")]
    Query(String),

    /// The term is not present in the dictionary.
    #[error("Term not found: {0}")]
    TermNotFound(String),

    /// The term is in the dictionary but has no occurrences.
    #[error("Term does not occur: {0}")]
    TermDoesNotOccur(String),

    /// Any other dictionary failure.
    #[error("Dictionary error: {0}")]
    Dictionary(String),

    /// Character set conversion failure.
    #[error("Character set conversion error: {0}")]
    Charset(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller-level search timeout elapsed.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// An operation the collaborator does not provide.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Broken internal invariant.
    #[error("Internal error: {0}")]
    Internal(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error.
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with [`SearchError`].
pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        SearchError::Index(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        SearchError::Query(msg.into())
    }

    /// Create a new term-not-found error.
    pub fn term_not_found<S: Into<String>>(term: S) -> Self {
        SearchError::TermNotFound(term.into())
    }

    /// Create a new term-does-not-occur error.
    pub fn term_does_not_occur<S: Into<String>>(term: S) -> Self {
        SearchError::TermDoesNotOccur(term.into())
    }

    /// Create a new dictionary error.
    pub fn dictionary<S: Into<String>>(msg: S) -> Self {
        SearchError::Dictionary(msg.into())
    }

    /// Create a new character set conversion error.
    pub fn charset<S: Into<String>>(msg: S) -> Self {
        SearchError::Charset(msg.into())
    }

    /// Create a new invalid config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        SearchError::Config(msg.into())
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        SearchError::Timeout(msg.into())
    }

    /// Create a new unsupported-operation error.
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        SearchError::Unsupported(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        SearchError::Internal(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SearchError::Other(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        SearchError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Whether this is one of the dictionary outcomes that yield an empty
    /// postings list rather than aborting the query.
    pub fn is_recoverable_term_error(&self) -> bool {
        matches!(
            self,
            SearchError::TermNotFound(_) | SearchError::TermDoesNotOccur(_)
        )
    }
}
