//! Event-driven mirror of cluster node labels into a single document.
//!
//! The loop moves through four phases:
//!
//! - **Bootstrapping**: list every node once, project its labels, and
//!   read-or-create the mirror document
//! - **Syncing**: fold watch events into the in-memory mapping, with one
//!   suspension point multiplexing the stream and the stop signal
//! - **Draining**: persist the final mapping with bounded retries
//! - **Stopped**: terminal
//!
//! # Key Concepts
//!
//! ## Projection
//!
//! [`LabelProjector`] restricts a node's labels to one recognized
//! namespace prefix and strips the keys to their short form.
//!
//! ## Contributor tracking
//!
//! [`MirrorState`] tracks which nodes contribute each short key, so a key
//! shared by two nodes survives the deletion of one of them.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use labelmirror_cluster::{InMemoryCluster, InMemoryDocumentStore};
//! use labelmirror_reconciler::{LoopConfig, ReconciliationLoop};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cluster = Arc::new(InMemoryCluster::new());
//!     let store = Arc::new(InMemoryDocumentStore::new());
//!
//!     let mut reconciler =
//!         ReconciliationLoop::new(cluster, store, LoopConfig::new("node-labels"));
//!     let stopper = reconciler.stopper();
//!
//!     // stopper.stop() from a signal handler ends the run cleanly
//!     // reconciler.run().await;
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod r#loop;
pub mod projector;
pub mod state;
pub mod types;

// Re-export main types
pub use error::{Error, Result};
pub use r#loop::{LoopStopper, ReconciliationLoop};
pub use projector::LabelProjector;
pub use state::MirrorState;
pub use types::{ExistingDocPolicy, LoopConfig, PersistPolicy, Phase, RunMode};
