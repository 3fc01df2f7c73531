//! Anchors and the bounded anchor map for the detection path.
//!
//! Detection results arrive out of band and may or may not carry a stable
//! tracking identifier. Anchors are keyed by that identifier so re-seen
//! objects replace their entry instead of accumulating; identifiers absent
//! from a result batch age out after a miss budget. Untracked detections get
//! a synthetic key so they age out the same way.

use indexmap::IndexMap;
use log::debug;
use uuid::Uuid;

use super::transform::Pose;

/// A fixed pose in the physical environment that virtual content pins to.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    uuid: Uuid,
    pub pose: Pose,
}

impl Anchor {
    pub fn new(pose: Pose) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            pose,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

/// Key an anchor is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorKey {
    /// Stable tracking identifier assigned by the detector.
    Tracked(u32),
    /// Synthetic key for detections without a tracking identifier.
    Synthetic(u64),
}

#[derive(Debug, Clone)]
struct AnchorEntry {
    anchor: Anchor,
    misses: u32,
}

/// Anchors keyed by detection identifier, pruned after repeated misses.
#[derive(Debug, Clone)]
pub struct AnchorMap {
    entries: IndexMap<AnchorKey, AnchorEntry>,
    /// Batches an identifier may miss before its anchor is dropped.
    miss_budget: u32,
}

impl AnchorMap {
    pub const DEFAULT_MISS_BUDGET: u32 = 30;

    pub fn new(miss_budget: u32) -> Self {
        Self {
            entries: IndexMap::new(),
            miss_budget,
        }
    }

    /// Fold one detection-result batch into the map.
    ///
    /// Keys present in the batch are upserted (replacing any previous anchor,
    /// resetting the miss counter). Keys absent from the batch take a miss
    /// and are pruned once they exceed the budget.
    pub fn observe_batch(&mut self, batch: impl IntoIterator<Item = (AnchorKey, Anchor)>) {
        let mut seen: Vec<AnchorKey> = Vec::new();
        for (key, anchor) in batch {
            seen.push(key);
            self.entries.insert(key, AnchorEntry { anchor, misses: 0 });
        }

        let budget = self.miss_budget;
        self.entries.retain(|key, entry| {
            if seen.contains(key) {
                return true;
            }
            entry.misses += 1;
            if entry.misses > budget {
                debug!("Anchor {:?} missed {} batches, pruning", key, entry.misses);
                false
            } else {
                true
            }
        });
    }

    pub fn get(&self, key: &AnchorKey) -> Option<&Anchor> {
        self.entries.get(key).map(|e| &e.anchor)
    }

    pub fn anchors(&self) -> impl Iterator<Item = (&AnchorKey, &Anchor)> {
        self.entries.iter().map(|(k, e)| (k, &e.anchor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for AnchorMap {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MISS_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn anchor_at(z: f32) -> Anchor {
        Anchor::new(Pose::from_translation(Vec3::new(0.0, 0.0, z)))
    }

    #[test]
    fn test_reseen_identifier_replaces_not_duplicates() {
        let mut map = AnchorMap::new(2);
        map.observe_batch([(AnchorKey::Tracked(1), anchor_at(-1.0))]);
        map.observe_batch([(AnchorKey::Tracked(1), anchor_at(-2.0))]);
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get(&AnchorKey::Tracked(1)).unwrap().pose.translation.z,
            -2.0
        );
    }

    #[test]
    fn test_missed_identifier_pruned_after_budget() {
        let mut map = AnchorMap::new(2);
        map.observe_batch([(AnchorKey::Tracked(7), anchor_at(-1.0))]);

        // Two misses: still within budget.
        map.observe_batch([]);
        map.observe_batch([]);
        assert_eq!(map.len(), 1);

        // Third miss exceeds the budget.
        map.observe_batch([]);
        assert!(map.is_empty());
    }

    #[test]
    fn test_miss_counter_resets_on_reappearance() {
        let mut map = AnchorMap::new(1);
        map.observe_batch([(AnchorKey::Tracked(3), anchor_at(-1.0))]);
        map.observe_batch([]);
        map.observe_batch([(AnchorKey::Tracked(3), anchor_at(-1.5))]);
        map.observe_batch([]);
        // One miss after reappearing: still alive.
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_synthetic_keys_age_out() {
        let mut map = AnchorMap::new(0);
        map.observe_batch([
            (AnchorKey::Synthetic(1), anchor_at(-1.0)),
            (AnchorKey::Synthetic(2), anchor_at(-2.0)),
        ]);
        assert_eq!(map.len(), 2);
        map.observe_batch([(AnchorKey::Tracked(1), anchor_at(-3.0))]);
        // Zero budget: synthetics vanish on the first miss.
        assert_eq!(map.len(), 1);
        assert!(map.get(&AnchorKey::Tracked(1)).is_some());
    }
}
