//! Loop configuration and lifecycle types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::projector::LabelProjector;

/// How the loop runs after bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Bootstrap, then fold watch events until stopped.
    Watch,
    /// Bootstrap, then drain immediately.
    OneShot,
}

/// When mutations are pushed to the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistPolicy {
    /// Apply the document after every mutating event.
    WriteThrough,
    /// Persist once, during draining.
    OnDrain,
}

/// What to do when the document already exists at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExistingDocPolicy {
    /// The fresh snapshot is authoritative; overwrite the stored data.
    Replace,
    /// Seed the stored data as a baseline beneath the live snapshot.
    Adopt,
}

/// Loop lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Applying the bulk snapshot and settling the document.
    Bootstrapping,
    /// Folding watch events into the mapping.
    Syncing,
    /// Persisting the final mapping.
    Draining,
    /// Terminal.
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrapping => write!(f, "bootstrapping"),
            Self::Syncing => write!(f, "syncing"),
            Self::Draining => write!(f, "draining"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Configuration for the reconciliation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Name of the mirror document.
    pub document: String,
    /// Recognized label namespace prefix.
    pub label_prefix: String,
    /// Watch or one-shot.
    pub mode: RunMode,
    /// Persistence policy.
    pub persist: PersistPolicy,
    /// Existing-document policy at bootstrap.
    pub existing_doc: ExistingDocPolicy,
    /// Consecutive watch re-subscribe attempts before giving up.
    pub max_resubscribe_attempts: usize,
    /// Drain persist attempts before giving up.
    pub max_persist_attempts: usize,
    /// First retry delay; doubles up to `max_backoff`.
    pub initial_backoff: Duration,
    /// Retry delay ceiling.
    pub max_backoff: Duration,
}

impl LoopConfig {
    /// Create a configuration with defaults for everything but the
    /// document name.
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            label_prefix: LabelProjector::DEFAULT_PREFIX.to_string(),
            mode: RunMode::Watch,
            persist: PersistPolicy::OnDrain,
            existing_doc: ExistingDocPolicy::Replace,
            max_resubscribe_attempts: 5,
            max_persist_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }

    /// Set the recognized label namespace prefix.
    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = prefix.into();
        self
    }

    /// Set the run mode.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the persistence policy.
    pub fn with_persist(mut self, persist: PersistPolicy) -> Self {
        self.persist = persist;
        self
    }

    /// Set the existing-document policy.
    pub fn with_existing_doc(mut self, policy: ExistingDocPolicy) -> Self {
        self.existing_doc = policy;
        self
    }

    /// Set the watch re-subscribe budget.
    pub fn with_max_resubscribe_attempts(mut self, attempts: usize) -> Self {
        self.max_resubscribe_attempts = attempts;
        self
    }

    /// Set the drain persist budget.
    pub fn with_max_persist_attempts(mut self, attempts: usize) -> Self {
        self.max_persist_attempts = attempts;
        self
    }

    /// Set the retry backoff window.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoopConfig::new("node-labels");
        assert_eq!(config.document, "node-labels");
        assert_eq!(config.label_prefix, "kubernetes.io");
        assert_eq!(config.mode, RunMode::Watch);
        assert_eq!(config.persist, PersistPolicy::OnDrain);
        assert_eq!(config.existing_doc, ExistingDocPolicy::Replace);
    }

    #[test]
    fn test_builder_chain() {
        let config = LoopConfig::new("node-labels")
            .with_label_prefix("topology.kubernetes.io")
            .with_mode(RunMode::OneShot)
            .with_persist(PersistPolicy::WriteThrough)
            .with_existing_doc(ExistingDocPolicy::Adopt)
            .with_max_resubscribe_attempts(2)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(8));

        assert_eq!(config.label_prefix, "topology.kubernetes.io");
        assert_eq!(config.mode, RunMode::OneShot);
        assert_eq!(config.persist, PersistPolicy::WriteThrough);
        assert_eq!(config.existing_doc, ExistingDocPolicy::Adopt);
        assert_eq!(config.max_resubscribe_attempts, 2);
        assert_eq!(config.initial_backoff, Duration::from_millis(1));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Bootstrapping.to_string(), "bootstrapping");
        assert_eq!(Phase::Stopped.to_string(), "stopped");
    }
}
