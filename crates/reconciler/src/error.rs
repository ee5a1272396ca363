//! Error types for the reconciler crate.

use std::fmt;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Clone)]
pub enum Error {
    /// Bootstrap could not reach the cluster or the document store.
    Bootstrap { operation: String, reason: String },
    /// The watch subscription could not be re-opened within the budget.
    ResubscribeExhausted { attempts: usize, reason: String },
    /// The drain flush could not be persisted within the budget.
    PersistExhausted { attempts: usize, reason: String },
    /// A fault surfaced by an external collaborator.
    Fault(labelmirror_core::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrap { operation, reason } => {
                write!(f, "bootstrap failed during {operation}: {reason}")
            }
            Self::ResubscribeExhausted { attempts, reason } => {
                write!(
                    f,
                    "watch re-subscribe budget exhausted after {attempts} attempts: {reason}"
                )
            }
            Self::PersistExhausted { attempts, reason } => {
                write!(
                    f,
                    "drain persist budget exhausted after {attempts} attempts: {reason}"
                )
            }
            Self::Fault(fault) => {
                write!(f, "{fault}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<labelmirror_core::Error> for Error {
    fn from(fault: labelmirror_core::Error) -> Self {
        Self::Fault(fault)
    }
}

impl Error {
    /// Create a bootstrap error.
    pub fn bootstrap(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Bootstrap {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a resubscribe-exhausted error.
    pub fn resubscribe_exhausted(attempts: usize, reason: impl Into<String>) -> Self {
        Self::ResubscribeExhausted {
            attempts,
            reason: reason.into(),
        }
    }

    /// Create a persist-exhausted error.
    pub fn persist_exhausted(attempts: usize, reason: impl Into<String>) -> Self {
        Self::PersistExhausted {
            attempts,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_display() {
        let err = Error::bootstrap("list entities", "connection refused");
        assert!(err.to_string().contains("list entities"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_fault_display_passthrough() {
        let err = Error::from(labelmirror_core::Error::not_found("node-labels"));
        assert!(err.to_string().contains("node-labels"));
    }
}
