//! Error types for the aktstk pipeline.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`AktstkError`] enum. Most stages of the pipeline are total; the variants
//! here cover the places where a run can actually fail: reading the corpus,
//! assigning identifiers, calling the external tagger and touching the cache.
//!
//! # Examples
//!
//! ```
//! use aktstk::error::{AktstkError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(AktstkError::invalid_config("min_length exceeds max_length"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for aktstk operations.
#[derive(Error, Debug)]
pub enum AktstkError {
    /// I/O errors (file operations, child processes, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CSV reading or writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed input records (dates, JSON lines, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The corpus store lacks a required column
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// An act number that is not numeric once its prefix is removed
    #[error("Unparseable identifier: act number {act_number:?} of ministry {ministry:?}")]
    UnparseableIdentifier { ministry: String, act_number: String },

    /// The tagging model or tool failed; fatal for the run
    #[error("Annotation error: {0}")]
    Annotation(String),

    /// A cache entry was produced for a different input batch
    #[error("Stale cache: expected checksum {expected}, found {found}")]
    StaleCache { expected: String, found: String },

    /// Metadata join errors
    #[error("Merge error: {0}")]
    Merge(String),

    /// Output storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for operations that may fail with AktstkError.
pub type Result<T> = std::result::Result<T, AktstkError>;

impl AktstkError {
    /// Create a new parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        AktstkError::Parse(msg.into())
    }

    /// Create a new annotation error.
    pub fn annotation<S: Into<String>>(msg: S) -> Self {
        AktstkError::Annotation(msg.into())
    }

    /// Create a new merge error.
    pub fn merge<S: Into<String>>(msg: S) -> Self {
        AktstkError::Merge(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        AktstkError::Storage(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        AktstkError::InvalidConfig(msg.into())
    }

    /// Create a new unparseable identifier error.
    pub fn unparseable_identifier<M: Into<String>, A: Into<String>>(
        ministry: M,
        act_number: A,
    ) -> Self {
        AktstkError::UnparseableIdentifier {
            ministry: ministry.into(),
            act_number: act_number.into(),
        }
    }
}
