//! Label projection: restrict a node's labels to one recognized namespace.

use std::collections::{BTreeMap, BTreeSet};

/// Filter + rename transform for one recognized label namespace.
///
/// A label key is projected when its namespace segment (everything before
/// the first `/`) equals the recognized prefix; the emitted key is the
/// remainder after the separator. Keys without a separator are filtered,
/// not errors. The transform is pure and total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelProjector {
    prefix: String,
}

impl LabelProjector {
    /// Default recognized namespace.
    pub const DEFAULT_PREFIX: &'static str = "kubernetes.io";

    /// Create a projector for the given namespace prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The recognized namespace prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Project the labels belonging to the recognized namespace, stripped
    /// to their short keys.
    pub fn project(&self, labels: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        labels
            .iter()
            .filter_map(|(key, value)| {
                let (namespace, short) = key.split_once('/')?;
                (namespace == self.prefix).then(|| (short.to_string(), value.clone()))
            })
            .collect()
    }

    /// Short keys a deleted node's labels retract.
    ///
    /// Same filter/split logic as [`project`](Self::project), returning
    /// keys only.
    pub fn removal_keys(&self, labels: &BTreeMap<String, String>) -> BTreeSet<String> {
        labels
            .keys()
            .filter_map(|key| {
                let (namespace, short) = key.split_once('/')?;
                (namespace == self.prefix).then(|| short.to_string())
            })
            .collect()
    }
}

impl Default for LabelProjector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_project_strips_recognized_prefix() {
        let projector = LabelProjector::default();
        let projected = projector.project(&labels(&[
            ("kubernetes.io/zone", "us-east"),
            ("kubernetes.io/arch", "arm64"),
        ]));

        assert_eq!(projected.get("zone").map(String::as_str), Some("us-east"));
        assert_eq!(projected.get("arch").map(String::as_str), Some("arm64"));
        assert_eq!(projected.len(), 2);
    }

    #[test]
    fn test_project_filters_foreign_namespaces() {
        let projector = LabelProjector::default();
        let projected = projector.project(&labels(&[
            ("custom/x", "y"),
            ("kubernetes.io/zone", "a"),
        ]));

        assert_eq!(projected.len(), 1);
        assert!(projected.contains_key("zone"));
    }

    #[test]
    fn test_project_filters_keys_without_separator() {
        let projector = LabelProjector::default();
        let projected = projector.project(&labels(&[("bare-key", "value")]));
        assert!(projected.is_empty());
    }

    #[test]
    fn test_namespace_segment_must_match_exactly() {
        // A bare starts-with check would wrongly project this.
        let projector = LabelProjector::default();
        let projected = projector.project(&labels(&[("kubernetes.iox/zone", "a")]));
        assert!(projected.is_empty());
    }

    #[test]
    fn test_split_happens_on_first_separator() {
        let projector = LabelProjector::default();
        let projected = projector.project(&labels(&[("kubernetes.io/a/b", "v")]));
        assert_eq!(projected.get("a/b").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_empty_labels_project_to_empty() {
        let projector = LabelProjector::default();
        assert!(projector.project(&BTreeMap::new()).is_empty());
        assert!(projector.removal_keys(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_removal_keys_mirror_projection() {
        let projector = LabelProjector::default();
        let set = labels(&[
            ("kubernetes.io/zone", "a"),
            ("custom/x", "y"),
            ("bare", "z"),
        ]);

        let keys = projector.removal_keys(&set);
        assert_eq!(keys, BTreeSet::from(["zone".to_string()]));
    }

    #[test]
    fn test_custom_prefix() {
        let projector = LabelProjector::new("topology.kubernetes.io");
        let projected = projector.project(&labels(&[
            ("topology.kubernetes.io/region", "eu-west"),
            ("kubernetes.io/zone", "a"),
        ]));

        assert_eq!(projected.len(), 1);
        assert_eq!(projected.get("region").map(String::as_str), Some("eu-west"));
    }
}
