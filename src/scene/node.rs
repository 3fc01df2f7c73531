//! Node trait and concrete node kinds for anchored scene content.
//!
//! A `SceneNode` is the anchor-attached root created for one tracked entity.
//! Its children are `NodeKind` values behind an enum_dispatch trait:
//! - ModelNode: a placed 3D asset, optionally editable
//! - BoundingBoxNode: translucent box around an editable model
//! - MarkerNode: lightweight marker pinned to a detection anchor
//!
//! Bounding boxes are visible only while an edit gesture is active (or the
//! user forces them on); `SceneNode::set_editing` propagates that state.

use enum_dispatch::enum_dispatch;
use uuid::Uuid;

use super::anchors::Anchor;
use super::transform::NodeTransform;

/// Base trait for all child node kinds.
#[enum_dispatch]
pub trait Node {
    /// Unique identifier for this node.
    fn uuid(&self) -> Uuid;

    /// Display name (asset path for models, a label otherwise).
    fn name(&self) -> &str;

    /// Type identifier string ("Model", "BoundingBox", "Marker").
    fn node_type(&self) -> &'static str;

    fn transform(&self) -> &NodeTransform;

    fn transform_mut(&mut self) -> &mut NodeTransform;

    fn is_visible(&self) -> bool;

    fn set_visible(&mut self, visible: bool);

    /// Child nodes. Only models carry children here.
    fn children(&self) -> &[NodeKind] {
        &[]
    }

    fn children_mut(&mut self) -> &mut [NodeKind] {
        &mut []
    }
}

/// A placed 3D model.
#[derive(Debug, Clone)]
pub struct ModelNode {
    uuid: Uuid,
    /// Asset path the renderer loads the model from.
    pub asset: String,
    pub transform: NodeTransform,
    pub visible: bool,
    /// Editable models respond to drag/rotate/scale gestures.
    pub editable: bool,
    /// Allowed uniform-scale range while editing.
    pub scale_range: (f32, f32),
    pub children: Vec<NodeKind>,
}

impl ModelNode {
    pub fn new(asset: &str, scale_to_units: f32) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            asset: asset.to_string(),
            transform: NodeTransform::from_uniform_scale(scale_to_units),
            visible: true,
            editable: false,
            scale_range: (0.1, 3.5),
            children: Vec::new(),
        }
    }

    pub fn editable(mut self, range: (f32, f32)) -> Self {
        self.editable = true;
        self.scale_range = range;
        self
    }

    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: NodeKind) -> Self {
        self.children.push(child);
        self
    }
}

impl Node for ModelNode {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
    fn name(&self) -> &str {
        &self.asset
    }
    fn node_type(&self) -> &'static str {
        "Model"
    }
    fn transform(&self) -> &NodeTransform {
        &self.transform
    }
    fn transform_mut(&mut self) -> &mut NodeTransform {
        &mut self.transform
    }
    fn is_visible(&self) -> bool {
        self.visible
    }
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
    fn children(&self) -> &[NodeKind] {
        &self.children
    }
    fn children_mut(&mut self) -> &mut [NodeKind] {
        &mut self.children
    }
}

/// Translucent box drawn around an editable model.
#[derive(Debug, Clone)]
pub struct BoundingBoxNode {
    uuid: Uuid,
    pub transform: NodeTransform,
    pub visible: bool,
}

impl BoundingBoxNode {
    /// Hidden by default; edit gestures toggle visibility.
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            transform: NodeTransform::IDENTITY,
            visible: false,
        }
    }
}

impl Default for BoundingBoxNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for BoundingBoxNode {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
    fn name(&self) -> &str {
        "bounding-box"
    }
    fn node_type(&self) -> &'static str {
        "BoundingBox"
    }
    fn transform(&self) -> &NodeTransform {
        &self.transform
    }
    fn transform_mut(&mut self) -> &mut NodeTransform {
        &mut self.transform
    }
    fn is_visible(&self) -> bool {
        self.visible
    }
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// Marker pinned to a detection anchor.
#[derive(Debug, Clone)]
pub struct MarkerNode {
    uuid: Uuid,
    pub label: String,
    pub transform: NodeTransform,
    pub visible: bool,
}

impl MarkerNode {
    pub fn new(label: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            label: label.to_string(),
            transform: NodeTransform::IDENTITY,
            visible: true,
        }
    }
}

impl Node for MarkerNode {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
    fn name(&self) -> &str {
        &self.label
    }
    fn node_type(&self) -> &'static str {
        "Marker"
    }
    fn transform(&self) -> &NodeTransform {
        &self.transform
    }
    fn transform_mut(&mut self) -> &mut NodeTransform {
        &mut self.transform
    }
    fn is_visible(&self) -> bool {
        self.visible
    }
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// All child node kinds, dispatched through the Node trait.
#[enum_dispatch(Node)]
#[derive(Debug, Clone)]
pub enum NodeKind {
    Model(ModelNode),
    BoundingBox(BoundingBoxNode),
    Marker(MarkerNode),
}

/// Anchor-attached root node owned by one tracked entity.
#[derive(Debug, Clone)]
pub struct SceneNode {
    uuid: Uuid,
    /// Identifier of the tracked entity this node represents.
    pub entity_id: String,
    pub anchor: Anchor,
    pub children: Vec<NodeKind>,
}

impl SceneNode {
    pub fn new(entity_id: &str, anchor: Anchor) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            entity_id: entity_id.to_string(),
            anchor,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: NodeKind) -> Self {
        self.children.push(child);
        self
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Toggle bounding-box children under editable models.
    ///
    /// `force_visible` keeps boxes shown outside of edits (the user toggle).
    pub fn set_editing(&mut self, editing: bool, force_visible: bool) {
        for child in &mut self.children {
            if let NodeKind::Model(model) = child {
                for grandchild in &mut model.children {
                    if let NodeKind::BoundingBox(bb) = grandchild {
                        bb.visible = editing || force_visible;
                    }
                }
            }
        }
    }

    /// Depth-first count of nodes in this hierarchy (excluding the root).
    pub fn node_count(&self) -> usize {
        fn walk(nodes: &[NodeKind]) -> usize {
            nodes.iter().map(|n| 1 + walk(n.children())).sum()
        }
        walk(&self.children)
    }
}
