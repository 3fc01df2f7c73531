//! Owned scene-node registry.
//!
//! The single place the at-most-one-node-per-entity invariant is enforced.
//! Frame handlers never hold the node collection themselves; they go through
//! `upsert(entity_id, builder)`, which runs the builder only when the
//! identifier is new. Nodes leave the registry only via `clear()` (user
//! reset or screen teardown), never because a frame missed their entity.

use indexmap::IndexMap;
use log::{debug, info};

use super::node::SceneNode;

#[derive(Debug, Clone, Default)]
pub struct SceneRegistry {
    nodes: IndexMap<String, SceneNode>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node for `entity_id` unless one already exists.
    ///
    /// The builder runs only on first insertion, so repeated frame reports
    /// for the same entity are no-ops. Returns true if a node was created.
    pub fn upsert(&mut self, entity_id: &str, build: impl FnOnce() -> SceneNode) -> bool {
        if self.nodes.contains_key(entity_id) {
            return false;
        }
        let node = build();
        debug!("Scene attach: {} ({} child nodes)", entity_id, node.node_count());
        self.nodes.insert(entity_id.to_string(), node);
        true
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.nodes.contains_key(entity_id)
    }

    pub fn get(&self, entity_id: &str) -> Option<&SceneNode> {
        self.nodes.get(entity_id)
    }

    pub fn get_mut(&mut self, entity_id: &str) -> Option<&mut SceneNode> {
        self.nodes.get_mut(entity_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SceneNode)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Remove every node (user reset or screen teardown).
    pub fn clear(&mut self) {
        if !self.nodes.is_empty() {
            info!("Scene cleared ({} nodes)", self.nodes.len());
        }
        self.nodes.clear();
    }

    /// Propagate edit-gesture state to all node hierarchies.
    pub fn set_editing(&mut self, editing: bool, force_visible: bool) {
        for node in self.nodes.values_mut() {
            node.set_editing(editing, force_visible);
        }
    }
}
