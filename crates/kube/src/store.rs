//! ConfigMap-backed document store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, ObjectMeta, Patch, PatchParams, PostParams};
use kube::Client;
use labelmirror_cluster::DocumentStore;
use labelmirror_core::{Error, MirrorDocument, Result};
use tracing::debug;

use crate::convert::connection_fault;

/// Field manager name for server-side apply.
const FIELD_MANAGER: &str = "labelmirror";

/// `DocumentStore` over a namespaced `v1.ConfigMap`.
pub struct KubeConfigMapStore {
    api: Api<ConfigMap>,
}

impl KubeConfigMapStore {
    /// Create a store writing ConfigMaps in the given namespace.
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }

    fn config_map(name: &str, data: BTreeMap<String, String>) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..ObjectMeta::default()
            },
            data: Some(data),
            immutable: Some(false),
            ..ConfigMap::default()
        }
    }

    fn to_document(config_map: ConfigMap) -> MirrorDocument {
        MirrorDocument {
            data: config_map.data.unwrap_or_default(),
            immutable: config_map.immutable.unwrap_or(false),
        }
    }
}

#[async_trait]
impl DocumentStore for KubeConfigMapStore {
    async fn get(&self, name: &str) -> Result<MirrorDocument> {
        match self.api.get(name).await {
            Ok(config_map) => Ok(Self::to_document(config_map)),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                Err(Error::not_found(name))
            }
            Err(err) => Err(connection_fault("get configmap", &err)),
        }
    }

    async fn create(&self, name: &str, data: BTreeMap<String, String>) -> Result<MirrorDocument> {
        let config_map = Self::config_map(name, data);
        match self.api.create(&PostParams::default(), &config_map).await {
            Ok(created) => {
                debug!(configmap = %name, "Created configmap");
                Ok(Self::to_document(created))
            }
            Err(kube::Error::Api(response)) if response.code == 409 => {
                Err(Error::already_exists(name))
            }
            Err(err) => Err(connection_fault("create configmap", &err)),
        }
    }

    async fn apply(&self, name: &str, data: BTreeMap<String, String>) -> Result<()> {
        // Server-side apply needs apiVersion/kind in the payload, which
        // the typed ConfigMap does not carry.
        let patch = serde_json::json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": name },
            "immutable": false,
            "data": data,
        });
        let params = PatchParams::apply(FIELD_MANAGER).force();
        self.api
            .patch(name, &params, &Patch::Apply(&patch))
            .await
            .map_err(|err| connection_fault("apply configmap", &err))?;
        debug!(configmap = %name, "Applied configmap");
        Ok(())
    }
}
