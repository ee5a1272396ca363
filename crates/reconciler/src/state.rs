//! In-memory mirror state with per-key contributor tracking.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One node's contribution to a short key.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Contribution {
    node: String,
    value: String,
}

/// The reconciler's in-memory mapping.
///
/// Each short key holds the nodes currently exporting it, in arrival
/// order. The visible value is the most recent arrival's; a value update
/// from an existing contributor lands in place. A key disappears only
/// when its last contributor retracts it, so a key shared by two nodes
/// survives the deletion of one of them.
///
/// Adopted baseline entries (from an existing stored document) sit under
/// the contributor overlay; a retraction targeting a baseline key erases
/// it.
#[derive(Debug, Clone, Default)]
pub struct MirrorState {
    entries: BTreeMap<String, Vec<Contribution>>,
    keys_by_node: HashMap<String, BTreeSet<String>>,
    baseline: BTreeMap<String, String>,
}

impl MirrorState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed adopted entries beneath the contributor overlay.
    pub fn seed_baseline(&mut self, data: BTreeMap<String, String>) {
        self.baseline = data;
    }

    /// Upsert one node's projected labels.
    ///
    /// Keys the node previously contributed but no longer carries are
    /// retracted, so a label removal on a live node converges without
    /// waiting for the node itself to be deleted.
    pub fn upsert(&mut self, node: &str, projected: BTreeMap<String, String>) {
        let current: BTreeSet<String> = projected.keys().cloned().collect();
        let previous = self.keys_by_node.get(node).cloned().unwrap_or_default();

        for key in previous.difference(&current) {
            self.retract_contribution(node, key);
        }

        for (key, value) in projected {
            let slot = self.entries.entry(key).or_default();
            match slot.iter_mut().find(|c| c.node == node) {
                Some(existing) => existing.value = value,
                None => slot.push(Contribution {
                    node: node.to_string(),
                    value,
                }),
            }
        }

        if current.is_empty() {
            self.keys_by_node.remove(node);
        } else {
            self.keys_by_node.insert(node.to_string(), current);
        }
    }

    /// Retract a deleted node's keys.
    ///
    /// `keys` comes from projecting the deletion event's labels; any keys
    /// recorded for the node beyond those are retracted as well, in case
    /// the event carried a stale label set.
    pub fn remove_node(&mut self, node: &str, keys: &BTreeSet<String>) {
        let recorded = self.keys_by_node.remove(node).unwrap_or_default();
        for key in keys.union(&recorded) {
            self.retract_contribution(node, key);
        }
    }

    /// The visible mapping: baseline overlaid by contributor entries.
    pub fn data(&self) -> BTreeMap<String, String> {
        let mut data = self.baseline.clone();
        for (key, contributions) in &self.entries {
            if let Some(latest) = contributions.last() {
                data.insert(key.clone(), latest.value.clone());
            }
        }
        data
    }

    /// Number of nodes currently exporting a key.
    pub fn contributor_count(&self, key: &str) -> usize {
        self.entries.get(key).map_or(0, Vec::len)
    }

    /// Number of visible keys.
    pub fn len(&self) -> usize {
        let baseline_only = self
            .baseline
            .keys()
            .filter(|key| !self.entries.contains_key(*key))
            .count();
        self.entries.len() + baseline_only
    }

    /// Check whether nothing is mirrored.
    pub fn is_empty(&self) -> bool {
        self.baseline.is_empty() && self.entries.is_empty()
    }

    /// Remove one node's contribution to one key. The key, and any
    /// baseline entry for it, disappears when no contributor remains.
    fn retract_contribution(&mut self, node: &str, key: &str) {
        self.baseline.remove(key);
        if let Some(slot) = self.entries.get_mut(key) {
            slot.retain(|c| c.node != node);
            if slot.is_empty() {
                self.entries.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn keys(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut state = MirrorState::new();
        state.upsert("n1", map(&[("zone", "a")]));
        let once = state.data();

        state.upsert("n1", map(&[("zone", "a")]));
        assert_eq!(state.data(), once);
        assert_eq!(state.contributor_count("zone"), 1);
    }

    #[test]
    fn test_add_then_remove_restores_prior_mapping() {
        let mut state = MirrorState::new();
        state.upsert("n1", map(&[("zone", "a")]));
        let before = state.data();

        state.upsert("n2", map(&[("arch", "arm64")]));
        state.remove_node("n2", &keys(&["arch"]));

        assert_eq!(state.data(), before);
    }

    #[test]
    fn test_shared_key_survives_one_contributor_leaving() {
        let mut state = MirrorState::new();
        state.upsert("n1", map(&[("zone", "us-east")]));
        state.upsert("n2", map(&[("zone", "us-east")]));
        assert_eq!(state.contributor_count("zone"), 2);

        state.remove_node("n1", &keys(&["zone"]));

        assert_eq!(state.data().get("zone").map(String::as_str), Some("us-east"));
        assert_eq!(state.contributor_count("zone"), 1);

        state.remove_node("n2", &keys(&["zone"]));
        assert!(state.data().is_empty());
    }

    #[test]
    fn test_latest_contributor_wins_and_falls_back() {
        let mut state = MirrorState::new();
        state.upsert("n1", map(&[("zone", "a")]));
        state.upsert("n2", map(&[("zone", "b")]));
        assert_eq!(state.data().get("zone").map(String::as_str), Some("b"));

        state.remove_node("n2", &keys(&["zone"]));
        assert_eq!(state.data().get("zone").map(String::as_str), Some("a"));
    }

    #[test]
    fn test_value_update_lands_in_place() {
        let mut state = MirrorState::new();
        state.upsert("n1", map(&[("zone", "a")]));
        state.upsert("n2", map(&[("zone", "b")]));

        state.upsert("n1", map(&[("zone", "c")]));
        // n2 is still the latest arrival for the key
        assert_eq!(state.data().get("zone").map(String::as_str), Some("b"));
        assert_eq!(state.contributor_count("zone"), 2);
    }

    #[test]
    fn test_upsert_retracts_keys_no_longer_carried() {
        let mut state = MirrorState::new();
        state.upsert("n1", map(&[("zone", "a"), ("arch", "arm64")]));

        state.upsert("n1", map(&[("zone", "a")]));

        assert_eq!(state.data(), map(&[("zone", "a")]));
        assert_eq!(state.contributor_count("arch"), 0);
    }

    #[test]
    fn test_remove_node_covers_recorded_keys_beyond_event() {
        let mut state = MirrorState::new();
        state.upsert("n1", map(&[("zone", "a"), ("arch", "arm64")]));

        // Deletion event carries a stale label set missing "arch".
        state.remove_node("n1", &keys(&["zone"]));

        assert!(state.data().is_empty());
    }

    #[test]
    fn test_baseline_sits_under_overlay_and_erases_on_retract() {
        let mut state = MirrorState::new();
        state.seed_baseline(map(&[("zone", "stale"), ("extra", "kept")]));
        state.upsert("n1", map(&[("zone", "fresh")]));

        assert_eq!(
            state.data(),
            map(&[("zone", "fresh"), ("extra", "kept")])
        );

        state.remove_node("n1", &keys(&["zone"]));
        assert_eq!(state.data(), map(&[("extra", "kept")]));
    }
}
