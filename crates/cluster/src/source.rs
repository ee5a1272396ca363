//! Entity source seam: bulk snapshot plus watch subscription.

use async_trait::async_trait;
use futures::stream::BoxStream;
use labelmirror_core::{Node, Result};

use crate::event::NodeEvent;

/// Stream of node lifecycle events.
///
/// The stream ending means the server closed the watch; callers re-open
/// the subscription with [`EntitySource::watch`].
pub type EventStream = BoxStream<'static, NodeEvent>;

/// Read access to the cluster's node set.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Snapshot of the current node set.
    async fn list(&self) -> Result<Vec<Node>>;

    /// Open a watch subscription delivering node lifecycle events.
    async fn watch(&self) -> Result<EventStream>;
}
