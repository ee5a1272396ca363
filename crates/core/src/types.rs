//! Data carriers exchanged across the cluster seams.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A cluster node as observed through the entity source.
///
/// The mirror never mutates nodes; it only reads their label sets from
/// the bulk snapshot or from watch events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node name, issued by the cluster.
    pub name: String,
    /// Fully-qualified label keys mapped to their values.
    pub labels: BTreeMap<String, String>,
}

impl Node {
    /// Create a node with no labels.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Add a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// The single key-value document the mirror maintains.
///
/// Existence in the backing store is signalled by `DocumentStore::get`
/// returning a not-found fault, not by a field on this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorDocument {
    /// Short label keys mapped to their mirrored values.
    pub data: BTreeMap<String, String>,
    /// Mutability flag, fixed at creation.
    pub immutable: bool,
}

impl MirrorDocument {
    /// Create a mutable document holding the given data.
    pub fn new(data: BTreeMap<String, String>) -> Self {
        Self {
            data,
            immutable: false,
        }
    }
}
