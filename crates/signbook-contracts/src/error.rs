//! Error taxonomy for the signbook flows.
//!
//! All fallible operations in the workspace return `SignbookResult<T>`.
//! The confirmation endpoints rely on the variants being distinguishable:
//! an invalid link, an already-used link, and an expired link each imply a
//! different remedy for the recipient.

use thiserror::Error;

/// The unified error type for the signbook workspace.
#[derive(Debug, Error)]
pub enum SignbookError {
    /// Malformed or missing input: empty task list, signature payload that is
    /// not an SVG document, slot number outside 1..=15, missing email.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// An id or presented token has no matching record.
    #[error("{what} not found")]
    NotFound { what: String },

    /// A flow was attempted against a signatory in the wrong lifecycle state.
    #[error("precondition failed: {reason}")]
    Precondition { reason: String },

    /// The token was already consumed. Never retryable — the remedy is a
    /// fresh request, not a second attempt.
    #[error("link already used")]
    AlreadyUsed,

    /// The token is past its expiry timestamp.
    #[error("link expired")]
    Expired,

    /// A unique constraint would be violated (duplicate slot in a logbook).
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// The persistence engine failed. Treated as fatal for the operation —
    /// a transition that cannot be recorded must not appear to succeed.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The mail sender could not deliver. Flows treat delivery as
    /// best-effort; this surfaces only from sender implementations.
    #[error("mail delivery failed: {reason}")]
    Mail { reason: String },
}

impl SignbookError {
    /// Shorthand for a `Validation` error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    /// Shorthand for a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Shorthand for a `Precondition` error.
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition { reason: reason.into() }
    }
}

/// Convenience alias used throughout the signbook crates.
pub type SignbookResult<T> = Result<T, SignbookError>;
