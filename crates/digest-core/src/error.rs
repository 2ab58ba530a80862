//! Error types for the digest core.

use std::time::Duration;

use thiserror::Error;

/// Errors raised when building an [`EventRecord`](crate::EventRecord).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// Title was empty or whitespace only.
    #[error("record title must not be empty")]
    EmptyTitle,

    /// A persisted log line could not be decoded.
    #[error("malformed log line: {0}")]
    Malformed(String),
}

/// Persistence failures in the buffer store.
///
/// A record whose `append` returned this error was not accepted.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading, writing or truncating the log failed.
    #[error("buffer log I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a [`Delivery`](crate::Delivery) implementation.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The transport rejected or failed to send the digest.
    #[error("delivery failed: {0}")]
    Failed(String),

    /// The delivery call did not finish within the configured bound.
    #[error("delivery timed out after {0:?}")]
    TimedOut(Duration),
}

/// Errors from a single flush cycle.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Draining the store failed; nothing was removed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking drain task panicked or was cancelled.
    #[error("drain task failed: {0}")]
    Drain(#[from] tokio::task::JoinError),

    /// The digest was drained but could not be delivered. The records are gone.
    #[error("{source} ({count} records discarded)")]
    Delivery {
        count: usize,
        #[source]
        source: DeliveryError,
    },
}

/// Errors parsing scheduler trigger times.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// A trigger time was not `HH:MM` in 24h form.
    #[error("invalid trigger time '{0}', expected HH:MM")]
    InvalidTime(String),

    /// No trigger times were configured.
    #[error("at least one trigger time is required")]
    NoTriggers,
}
