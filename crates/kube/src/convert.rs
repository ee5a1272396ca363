//! Conversions between kube API types and the shared taxonomy.

use k8s_openapi::api::core::v1::Node as K8sNode;
use kube::ResourceExt;
use labelmirror_core::{Error, Node};

/// Map a kube client error onto a connection fault for `operation`.
pub(crate) fn connection_fault(operation: &str, err: &kube::Error) -> Error {
    Error::connection(operation, err.to_string())
}

/// Strip a `v1.Node` down to the name and label set the mirror observes.
pub(crate) fn to_node(node: &K8sNode) -> Node {
    Node {
        name: node.name_any(),
        labels: node.labels().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    #[test]
    fn test_to_node_takes_name_and_labels() {
        let k8s_node = K8sNode {
            metadata: ObjectMeta {
                name: Some("worker-1".to_string()),
                labels: Some(std::collections::BTreeMap::from([(
                    "kubernetes.io/zone".to_string(),
                    "a".to_string(),
                )])),
                ..ObjectMeta::default()
            },
            ..K8sNode::default()
        };

        let node = to_node(&k8s_node);
        assert_eq!(node.name, "worker-1");
        assert_eq!(
            node.labels.get("kubernetes.io/zone").map(String::as_str),
            Some("a")
        );
    }

    #[test]
    fn test_to_node_without_labels_is_empty() {
        let node = to_node(&K8sNode::default());
        assert!(node.labels.is_empty());
    }
}
