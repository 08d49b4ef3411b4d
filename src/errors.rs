//! Error types for the jotter engine.
//!
//! This module defines custom error types that categorize different failures
//! that can occur while managing and rendering notes.

use std::io;

use thiserror::Error;

/// The main error type for the jotter engine.
#[derive(Error, Debug)]
pub enum JotterError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// A note has no history snapshot at the requested position.
    #[error("No history snapshot {index} for note {id}")]
    SnapshotNotFound { id: String, index: usize },

    /// An imported storage snapshot failed validation. Nothing was applied.
    #[error("Import rejected: {message}")]
    ImportRejected { message: String },

    /// A rendering capability failed on the given source. Caught at the
    /// call site and shown inline; never aborts rendering.
    #[error("Rendering failed: {message}")]
    RenderFailed { message: String },

    /// Errors related to the backing storage area.
    #[error("Storage failure: {message}")]
    StorageFailed { message: String },
}
