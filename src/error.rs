//! Unified error types for chatreport.
//!
//! This module provides a single [`ReportError`] enum that covers all error
//! cases in the library. This design follows the pattern used by popular crates
//! like `reqwest`, `serde_json`, and `image`.
//!
//! # Error Handling Philosophy
//!
//! - **Library users** get typed errors they can match on
//! - **Application users** get clear, actionable error messages
//! - **Developers** get source error chains for debugging
//!
//! Only a small set of conditions is fatal: an unreadable or undetectable
//! transcript, and I/O failures on the transcript or output paths. Per-message
//! and per-attachment problems never surface here; they become placeholders
//! and warnings so a single bad line or corrupt file cannot abort the run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized [`Result`] type for chatreport operations.
///
/// This type is broadly used across the library for any operation that
/// may produce an error.
///
/// # Example
///
/// ```rust
/// use chatreport::error::Result;
/// use chatreport::Message;
///
/// fn my_function() -> Result<Vec<Message>> {
///     // ... operations that may fail
///     Ok(vec![])
/// }
/// ```
pub type Result<T> = std::result::Result<T, ReportError>;

/// The error type for all chatreport operations.
///
/// This enum represents all possible errors that can occur when using
/// chatreport. Each variant contains context about what went wrong and,
/// where applicable, the underlying source error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    /// An I/O error occurred.
    ///
    /// This typically happens when:
    /// - The export directory or transcript file doesn't exist
    /// - Permission denied
    /// - Disk is full (when writing output)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The export contains no chat transcript.
    ///
    /// Neither `_chat.txt` nor a `.txt` named after the export directory
    /// was found.
    #[error("No chat transcript found in export: {}", path.display())]
    NoTranscript {
        /// The export directory that was searched
        path: PathBuf,
    },

    /// No known locale pattern matched the transcript.
    ///
    /// Detection scores every locale in the table against the first lines
    /// of the transcript; this fires when every score is zero.
    #[error("Could not detect timestamp format{}", path.as_ref().map(|p| format!(" (file: {})", p.display())).unwrap_or_default())]
    UnknownFormat {
        /// The transcript path, if available
        path: Option<PathBuf>,
    },

    /// An image decoding/encoding error outside the per-attachment pipeline.
    ///
    /// Attachment decode failures are isolated into placeholders; this
    /// variant only surfaces for operations the caller asked for directly,
    /// such as writing an output artifact.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization error.
    ///
    /// This can occur when writing the report manifest.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UTF-8 encoding error.
    ///
    /// Occurs when transcript content is not valid UTF-8.
    #[error("UTF-8 encoding error in {context}: {source}")]
    Utf8 {
        /// Description of where the error occurred
        context: String,
        /// The underlying UTF-8 error
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Invalid configuration value.
    ///
    /// Raised before any work starts, e.g. an unknown locale id or a zero
    /// time budget.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong
        message: String,
    },
}

impl From<std::string::FromUtf8Error> for ReportError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ReportError::Utf8 {
            context: "transcript decoding".to_string(),
            source: err,
        }
    }
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl ReportError {
    /// Creates a missing-transcript error.
    pub fn no_transcript(path: impl Into<PathBuf>) -> Self {
        ReportError::NoTranscript { path: path.into() }
    }

    /// Creates an unknown-format error.
    pub fn unknown_format(path: Option<PathBuf>) -> Self {
        ReportError::UnknownFormat { path }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        ReportError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, ReportError::Io(_))
    }

    /// Returns `true` if this is a missing-transcript error.
    pub fn is_no_transcript(&self) -> bool {
        matches!(self, ReportError::NoTranscript { .. })
    }

    /// Returns `true` if this is an unknown-format error.
    pub fn is_unknown_format(&self) -> bool {
        matches!(self, ReportError::UnknownFormat { .. })
    }

    /// Returns `true` if this is a configuration error.
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, ReportError::InvalidConfig { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
