//! Node lifecycle events delivered by a watch subscription.

use labelmirror_core::Node;
use serde::{Deserialize, Serialize};

/// Events emitted by an entity watch stream.
///
/// Closed union; consumers match exhaustively. Each event is consumed
/// exactly once by the reconciliation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeEvent {
    /// A node joined the cluster.
    Added(Node),
    /// A node's attributes changed.
    Modified(Node),
    /// A node left the cluster.
    Deleted(Node),
    /// The stream hit a fault; the subscription must be re-opened.
    Error { reason: String },
}

impl NodeEvent {
    /// Create an error event.
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
        }
    }

    /// Name of the node this event concerns, if any.
    pub fn node_name(&self) -> Option<&str> {
        match self {
            Self::Added(node) | Self::Modified(node) | Self::Deleted(node) => Some(&node.name),
            Self::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_name_per_variant() {
        let node = Node::new("worker-1");
        assert_eq!(NodeEvent::Added(node.clone()).node_name(), Some("worker-1"));
        assert_eq!(NodeEvent::Deleted(node).node_name(), Some("worker-1"));
        assert_eq!(NodeEvent::error("stream reset").node_name(), None);
    }
}
