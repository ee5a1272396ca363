//! Shared foundation for the labelmirror crates.
//!
//! This crate holds the fault taxonomy every other crate speaks and the
//! data carriers exchanged across the cluster seams:
//!
//! - **Faults**: configuration, connection, not-found, already-exists
//! - **Node**: a cluster member observed through snapshot or watch event
//! - **MirrorDocument**: the single key-value artifact the system maintains

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{MirrorDocument, Node};
