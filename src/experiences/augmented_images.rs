//! Image-triggered overlays.
//!
//! A static catalog maps reference-image keys to overlay configurations
//! (model asset, scale, position and rotation offsets). When a frame reports
//! a recognized reference image, the catalog entry - if any - is attached
//! under that image's identifier, exactly once. Unknown image names produce
//! no attachment and no error. Nodes stay attached through tracking gaps;
//! only a reset or teardown removes them.

use glam::{Quat, Vec3};
use indexmap::IndexMap;
use log::{debug, info};

use super::{Experience, UpdateContext};
use crate::frame::Frame;
use crate::scene::{rotation_degrees, Anchor, ModelNode, NodeKind, NodeTransform, SceneNode};

/// Tagged key for a registered reference image.
///
/// Image names arrive as strings from the session; they are resolved to a
/// variant once, here, instead of being string-compared at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKey {
    Mario,
    Pom,
}

impl ImageKey {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "mario" => Some(Self::Mario),
            "pom" => Some(Self::Pom),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mario => "mario",
            Self::Pom => "pom",
        }
    }
}

/// How one reference image is overlaid.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    pub asset: String,
    pub scale_to_units: f32,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Catalog of per-image overlay configurations.
#[derive(Debug, Clone, Default)]
pub struct OverlayCatalog {
    entries: IndexMap<ImageKey, OverlayConfig>,
}

impl OverlayCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The demo catalog: Mario sunk slightly "into" the picture, the
    /// pomeranian sitting on it.
    pub fn demo() -> Self {
        let mut catalog = Self::new();
        catalog.insert(
            ImageKey::Mario,
            OverlayConfig {
                asset: "augmentedImages/mario3D.glb".into(),
                scale_to_units: 0.215,
                position: Vec3::new(0.0, -0.05, 0.0),
                rotation: rotation_degrees(-90.0, 0.0, 90.0),
            },
        );
        catalog.insert(
            ImageKey::Pom,
            OverlayConfig {
                asset: "augmentedImages/pom3D.glb".into(),
                scale_to_units: 0.1,
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
            },
        );
        catalog
    }

    pub fn insert(&mut self, key: ImageKey, config: OverlayConfig) {
        self.entries.insert(key, config);
    }

    pub fn get(&self, key: ImageKey) -> Option<&OverlayConfig> {
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The image-overlay screen.
pub struct AugmentedImages {
    catalog: OverlayCatalog,
}

impl AugmentedImages {
    pub fn new(catalog: OverlayCatalog) -> Self {
        Self { catalog }
    }
}

impl Experience for AugmentedImages {
    fn name(&self) -> &'static str {
        "augmented-images"
    }

    fn on_frame(&mut self, frame: &Frame, ctx: &mut UpdateContext) {
        ctx.overlay.set_failure(frame.failure, &ctx.events);

        for image in &frame.updated_images {
            let Some(key) = ImageKey::from_name(&image.name) else {
                debug!("Ignoring unknown reference image '{}'", image.name);
                continue;
            };
            let Some(config) = self.catalog.get(key) else {
                continue;
            };

            // First seen wins; later frames re-reporting this image are no-ops.
            let anchor = Anchor::new(image.pose);
            let inserted = ctx.scene.upsert(key.name(), || {
                let model = ModelNode::new(&config.asset, config.scale_to_units).with_transform(
                    NodeTransform::from_uniform_scale(config.scale_to_units)
                        .with_position(config.position)
                        .with_rotation(config.rotation),
                );
                SceneNode::new(key.name(), anchor).with_child(NodeKind::Model(model))
            });

            if inserted {
                info!("Attached overlay for reference image '{}'", key.name());
                ctx.events.emit(crate::core::events::AppEvent::NodePlaced {
                    entity_id: key.name().to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventSender;
    use crate::core::workers::EpochHandle;
    use crate::frame::tracked_image;

    fn ctx() -> UpdateContext {
        UpdateContext::new(EventSender::dummy(), EpochHandle::new())
    }

    fn screen() -> AugmentedImages {
        AugmentedImages::new(OverlayCatalog::demo())
    }

    #[test]
    fn test_pom_attached_exactly_once_across_frames() {
        let mut ctx = ctx();
        let mut screen = screen();

        // "pom" recognized at frame 5 and still recognized at frame 6.
        let mut f5 = Frame::new(5);
        f5.updated_images.push(tracked_image("pom", Vec3::new(0.0, 0.0, -0.5)));
        let mut f6 = Frame::new(6);
        f6.updated_images.push(tracked_image("pom", Vec3::new(0.0, 0.0, -0.5)));

        screen.on_frame(&f5, &mut ctx);
        assert_eq!(ctx.scene.len(), 1);
        assert!(ctx.scene.contains("pom"));

        screen.on_frame(&f6, &mut ctx);
        assert_eq!(ctx.scene.len(), 1, "no duplicate for re-reported image");
    }

    #[test]
    fn test_unknown_image_ignored_without_error() {
        let mut ctx = ctx();
        let mut screen = screen();

        let mut frame = Frame::new(0);
        frame
            .updated_images
            .push(tracked_image("luigi", Vec3::ZERO));

        screen.on_frame(&frame, &mut ctx);
        assert!(ctx.scene.is_empty());
    }

    #[test]
    fn test_catalog_config_applied_to_model() {
        let mut ctx = ctx();
        let mut screen = screen();

        let mut frame = Frame::new(0);
        frame
            .updated_images
            .push(tracked_image("mario", Vec3::new(0.1, 0.2, -1.0)));

        screen.on_frame(&frame, &mut ctx);

        let node = ctx.scene.get("mario").unwrap();
        assert_eq!(node.anchor.pose.translation, Vec3::new(0.1, 0.2, -1.0));
        let NodeKind::Model(model) = &node.children[0] else {
            panic!("expected model child");
        };
        assert_eq!(model.asset, "augmentedImages/mario3D.glb");
        assert_eq!(model.transform.scale, Vec3::splat(0.215));
        assert_eq!(model.transform.position.y, -0.05);
    }

    #[test]
    fn test_both_images_attach_independently() {
        let mut ctx = ctx();
        let mut screen = screen();

        let mut frame = Frame::new(2);
        frame.updated_images.push(tracked_image("mario", Vec3::ZERO));
        frame.updated_images.push(tracked_image("pom", Vec3::X));

        screen.on_frame(&frame, &mut ctx);
        assert_eq!(ctx.scene.len(), 2);
    }

    #[test]
    fn test_tracking_gap_keeps_node() {
        let mut ctx = ctx();
        let mut screen = screen();

        let mut f0 = Frame::new(0);
        f0.updated_images.push(tracked_image("pom", Vec3::ZERO));
        screen.on_frame(&f0, &mut ctx);

        // Several frames without the image: the node survives.
        for i in 1..5 {
            screen.on_frame(&Frame::new(i), &mut ctx);
        }
        assert!(ctx.scene.contains("pom"));
    }
}
