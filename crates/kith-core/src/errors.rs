//! Error types for the kith network service
//!
//! One unified error enum covers the whole taxonomy: validation failures,
//! identity collisions, missing entities, corrupted persisted records,
//! malformed friendships, and login rejection. Everything except
//! [`NetworkError::CorruptedData`] is recoverable at the caller boundary.

use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Enum
// ----------------------------------------------------------------------------

/// Core error type for the kith network service
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Malformed user input; every violated rule is listed, not just the first.
    #[error("validation failed: {}", .messages.join("; "))]
    Validation { messages: Vec<String> },

    /// Identity collision on add.
    #[error("{what} already exists")]
    Duplicate { what: String },

    /// Missing entity on find, remove or update.
    #[error("{what} not found")]
    NotFound { what: String },

    /// A persisted record failed validation on load. Unlike the other
    /// variants this is an integrity fault: callers are expected to abort
    /// rather than drop the record and continue.
    #[error("corrupted data: {detail}")]
    CorruptedData { detail: String },

    /// Self-friendship, or a redundant request over an existing edge.
    #[error("invalid friendship: {reason}")]
    InvalidFriendship { reason: String },

    /// Uniform login failure. Unknown usernames and wrong passwords are
    /// indistinguishable to the caller.
    #[error("login rejected")]
    LoginRejected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific fault (e.g. a database driver error).
    #[error("storage error: {0}")]
    Storage(String),
}

// ----------------------------------------------------------------------------
// Convenience Constructors
// ----------------------------------------------------------------------------

impl NetworkError {
    /// Create a duplicate-identity error
    pub fn duplicate<T: Into<String>>(what: T) -> Self {
        NetworkError::Duplicate { what: what.into() }
    }

    /// Create a missing-entity error
    pub fn not_found<T: Into<String>>(what: T) -> Self {
        NetworkError::NotFound { what: what.into() }
    }

    /// Create a corrupted-data error
    pub fn corrupted<T: Into<String>>(detail: T) -> Self {
        NetworkError::CorruptedData { detail: detail.into() }
    }

    /// Create an invalid-friendship error
    pub fn invalid_friendship<T: Into<String>>(reason: T) -> Self {
        NetworkError::InvalidFriendship { reason: reason.into() }
    }

    /// Create a backend fault error
    pub fn storage<T: Into<String>>(message: T) -> Self {
        NetworkError::Storage(message.into())
    }
}

// ----------------------------------------------------------------------------
// Type Alias
// ----------------------------------------------------------------------------

pub type Result<T> = std::result::Result<T, NetworkError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
