//! Error types shared between the quote manager and the mock server.
//!
//! The `QuoteError` enum unifies the user-facing failure kinds (validation,
//! malformed import payloads, network failures) with the plumbing failures of
//! storage, I/O, serialization, channels and locks, so every crate in the
//! workspace can propagate a single error type.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by client and server.
#[derive(Error, Debug)]
pub enum QuoteError {
    /// Empty quote text or category on a manual add.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed import payload or request: not an array, or elements missing
    /// the required string fields.
    #[error("Format error: {0}")]
    Format(String),

    /// Remote fetch/post failure, including protocol-level `ERROR` replies.
    #[error("Network error: {0}")]
    Network(String),

    /// Durable key-value storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O error originating from the standard library, sockets or files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Crossbeam/channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl<T> From<PoisonError<T>> for QuoteError {
    fn from(err: PoisonError<T>) -> Self {
        QuoteError::MutexLock(err.to_string())
    }
}

impl QuoteError {
    /// Wraps any displayable failure as a network error.
    pub fn network(err: impl std::fmt::Display) -> Self {
        QuoteError::Network(err.to_string())
    }
}
