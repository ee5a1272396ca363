//! Kubernetes adapters for the labelmirror cluster seams.
//!
//! - [`KubeNodeSource`]: `EntitySource` over the cluster's `v1.Node`
//!   collection (bulk list + raw watch)
//! - [`KubeConfigMapStore`]: `DocumentStore` over a namespaced
//!   `v1.ConfigMap`
//!
//! API faults are mapped onto the shared taxonomy: 404 becomes not-found,
//! 409 becomes already-exists, everything else a connection fault.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod convert;
pub mod source;
pub mod store;

pub use kube::Client;
pub use source::KubeNodeSource;
pub use store::KubeConfigMapStore;

use labelmirror_core::{Error, Result};

/// Connect to the cluster the environment points at (kubeconfig or
/// in-cluster service account).
pub async fn connect() -> Result<Client> {
    Client::try_default()
        .await
        .map_err(|err| Error::connection("connect cluster", err.to_string()))
}
