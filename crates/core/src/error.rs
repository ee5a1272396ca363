//! Fault taxonomy shared across the labelmirror crates.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use thiserror::Error;

/// Result type alias for labelmirror operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fault raised by the core or one of its external collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Required configuration is missing or invalid. Fatal at startup.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// The entity source or document store could not be reached.
    #[error("connection failure during {operation}: {reason}")]
    Connection { operation: String, reason: String },

    /// The requested document does not exist in the backing store.
    #[error("document '{name}' not found")]
    NotFound { name: String },

    /// The document already exists; someone else created it first.
    #[error("document '{name}' already exists")]
    AlreadyExists { name: String },
}

impl Error {
    /// Create a configuration fault.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a connection fault for the given operation.
    pub fn connection(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found fault.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an already-exists fault.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }

    /// Check whether this is a not-found fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check whether this is an already-exists fault.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Check whether this is a connection fault.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_display_carries_operation() {
        let err = Error::connection("list nodes", "timeout");
        assert!(err.to_string().contains("list nodes"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_predicates() {
        assert!(Error::not_found("node-labels").is_not_found());
        assert!(Error::already_exists("node-labels").is_already_exists());
        assert!(Error::connection("get", "refused").is_connection());
        assert!(!Error::config("missing namespace").is_connection());
    }
}
