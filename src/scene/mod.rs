//! Scene graph model: anchors, nodes, transforms, and the owned registry.

pub mod anchors;
pub mod node;
pub mod registry;
pub mod transform;

pub use anchors::{Anchor, AnchorKey, AnchorMap};
pub use node::{BoundingBoxNode, MarkerNode, ModelNode, Node, NodeKind, SceneNode};
pub use registry::SceneRegistry;
pub use transform::{rotation_degrees, NodeTransform, Pose};
