//! Node source backed by the Kubernetes API.

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node as K8sNode;
use kube::api::{Api, ListParams, WatchEvent, WatchParams};
use kube::Client;
use labelmirror_cluster::{EntitySource, EventStream, NodeEvent};
use labelmirror_core::{Node, Result};
use tracing::debug;

use crate::convert::{connection_fault, to_node};

/// `EntitySource` over the cluster's `v1.Node` collection.
#[derive(Clone)]
pub struct KubeNodeSource {
    api: Api<K8sNode>,
}

impl KubeNodeSource {
    /// Create a source reading nodes cluster-wide.
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl EntitySource for KubeNodeSource {
    async fn list(&self) -> Result<Vec<Node>> {
        let nodes = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(|err| connection_fault("list nodes", &err))?;
        debug!(nodes = nodes.items.len(), "Listed cluster nodes");
        Ok(nodes.items.iter().map(to_node).collect())
    }

    async fn watch(&self) -> Result<EventStream> {
        let watch = self
            .api
            .watch(&WatchParams::default(), "0")
            .await
            .map_err(|err| connection_fault("watch nodes", &err))?;

        let stream = watch.filter_map(|item| async move {
            match item {
                Ok(WatchEvent::Added(node)) => Some(NodeEvent::Added(to_node(&node))),
                Ok(WatchEvent::Modified(node)) => Some(NodeEvent::Modified(to_node(&node))),
                Ok(WatchEvent::Deleted(node)) => Some(NodeEvent::Deleted(to_node(&node))),
                Ok(WatchEvent::Bookmark(_)) => None,
                Ok(WatchEvent::Error(status)) => Some(NodeEvent::error(status.message)),
                Err(err) => Some(NodeEvent::error(err.to_string())),
            }
        });

        Ok(stream.boxed())
    }
}
