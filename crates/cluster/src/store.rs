//! Document store seam.

use std::collections::BTreeMap;

use async_trait::async_trait;
use labelmirror_core::{MirrorDocument, Result};

/// Read/create/apply primitives for the mirror document.
///
/// The store is shared external state: another writer may race the loop,
/// so `create` can legitimately fail with an already-exists fault even
/// right after `get` reported not-found.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the document. Fails with a not-found fault if absent.
    async fn get(&self, name: &str) -> Result<MirrorDocument>;

    /// Create the document with initial data. Fails with an
    /// already-exists fault if someone beat us to it.
    async fn create(&self, name: &str, data: BTreeMap<String, String>) -> Result<MirrorDocument>;

    /// Overwrite the document's data, creating it if necessary.
    async fn apply(&self, name: &str, data: BTreeMap<String, String>) -> Result<()>;
}
