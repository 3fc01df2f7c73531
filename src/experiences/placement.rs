//! Plane placement and interaction.
//!
//! The first tracked plane places the active model automatically (once);
//! taps hit-test and place additional models. Each placement is an anchor
//! node holding a model node with a hidden bounding-box child; edit gestures
//! toggle that box for the duration of the edit. Reset clears the scene and
//! re-arms automatic placement; switching models also clears so the next
//! placement uses the new configuration.

use glam::Vec2;
use log::{debug, info};

use super::{tap_point, Experience, UpdateContext, UserAction};
use crate::config::ModelConfig;
use crate::core::events::AppEvent;
use crate::frame::{Frame, HitResult, TrackableKind};
use crate::scene::{Anchor, BoundingBoxNode, ModelNode, NodeKind, SceneNode};

/// Models the demo cycles through.
pub fn demo_models() -> Vec<ModelConfig> {
    vec![
        ModelConfig::new("models/android-mascot.glb", 0.1),
        ModelConfig::new("models/itachi.glb", 3.5),
    ]
}

/// The placement screen.
pub struct Placement {
    models: Vec<ModelConfig>,
    active_model: usize,
    /// Set once automatic placement has happened; survives tracking gaps
    /// and is cleared only by reset or model switch.
    placed: bool,
    /// User toggle: keep bounding boxes visible outside of edits.
    bounding_box_forced: bool,
    show_planes: bool,
    editing: bool,
    /// Last delivered frame, kept for tap hit-testing.
    last_frame: Option<Frame>,
    /// Counter for unique tap-placement identifiers.
    placements: u64,
}

impl Placement {
    pub fn new(models: Vec<ModelConfig>) -> Self {
        assert!(!models.is_empty(), "placement needs at least one model");
        Self {
            models,
            active_model: 0,
            placed: false,
            bounding_box_forced: false,
            show_planes: true,
            editing: false,
            last_frame: None,
            placements: 0,
        }
    }

    pub fn active_model(&self) -> &ModelConfig {
        &self.models[self.active_model]
    }

    pub fn show_planes(&self) -> bool {
        self.show_planes
    }

    fn build_node(&self, entity_id: &str, anchor: Anchor) -> SceneNode {
        let config = self.active_model();
        let mut bounding_box = BoundingBoxNode::new();
        bounding_box.visible = self.bounding_box_forced;
        let model = ModelNode::new(&config.asset, config.scale_to_units)
            .editable(config.scale_range)
            .with_child(NodeKind::BoundingBox(bounding_box));
        SceneNode::new(entity_id, anchor).with_child(NodeKind::Model(model))
    }

    fn place(&mut self, entity_id: &str, anchor: Anchor, ctx: &mut UpdateContext) {
        let node = self.build_node(entity_id, anchor);
        if ctx.scene.upsert(entity_id, || node) {
            info!(
                "Placed '{}' as {}",
                self.active_model().asset,
                entity_id
            );
            ctx.events.emit(AppEvent::NodePlaced {
                entity_id: entity_id.to_string(),
            });
        }
    }

    /// Tap hit-test: depth points and planes qualify, plain point-cloud
    /// points do not.
    fn tap_hit(frame: &Frame, at: Vec2) -> Option<HitResult> {
        frame
            .hit_test(at)
            .into_iter()
            .find(|h| matches!(h.kind, TrackableKind::DepthPoint | TrackableKind::Plane))
    }

    fn update_hint(&self, ctx: &mut UpdateContext) {
        let hint = if ctx.scene.is_empty() {
            "Point your phone down"
        } else {
            "Tap anywhere to add model"
        };
        ctx.overlay.set_hint(hint);
    }
}

impl Experience for Placement {
    fn name(&self) -> &'static str {
        "placement"
    }

    fn on_frame(&mut self, frame: &Frame, ctx: &mut UpdateContext) {
        ctx.overlay.set_failure(frame.failure, &ctx.events);

        // Automatic placement: first tracked plane, once per armed state.
        if ctx.scene.is_empty() && !self.placed {
            if let Some(plane) = frame.first_tracking_plane() {
                self.placed = true;
                self.placements += 1;
                let entity_id = plane.id.clone();
                self.place(&entity_id, Anchor::new(plane.center), ctx);
            }
        }

        self.update_hint(ctx);
        self.last_frame = Some(frame.clone());
    }

    fn on_action(&mut self, action: &UserAction, ctx: &mut UpdateContext) {
        match action {
            UserAction::ResetScene => {
                ctx.clear_scene();
                self.placed = false;
                self.update_hint(ctx);
            }
            UserAction::SwitchModel => {
                self.active_model = (self.active_model + 1) % self.models.len();
                ctx.clear_scene();
                self.placed = false;
                let asset = self.active_model().asset.clone();
                info!("Switched active model to '{}'", asset);
                ctx.events.emit(AppEvent::ModelSwitched { asset });
                self.update_hint(ctx);
            }
            UserAction::Tap { x, y } => {
                let Some(frame) = self.last_frame.as_ref() else {
                    debug!("Tap before first frame, ignoring");
                    return;
                };
                if let Some(hit) = Self::tap_hit(frame, tap_point(*x, *y)) {
                    self.show_planes = true;
                    self.placements += 1;
                    let entity_id = format!("tap-{}", self.placements);
                    self.place(&entity_id, Anchor::new(hit.pose), ctx);
                    self.update_hint(ctx);
                } else {
                    debug!("Tap at ({}, {}) hit nothing placeable", x, y);
                }
            }
            UserAction::EditBegin => {
                self.editing = true;
                ctx.scene.set_editing(true, self.bounding_box_forced);
            }
            UserAction::EditEnd => {
                self.editing = false;
                ctx.scene.set_editing(false, self.bounding_box_forced);
            }
            UserAction::TogglePlanes => {
                self.show_planes = !self.show_planes;
            }
            UserAction::ToggleBoundingBox => {
                self.bounding_box_forced = !self.bounding_box_forced;
                ctx.scene
                    .set_editing(self.editing, self.bounding_box_forced);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventSender;
    use crate::core::workers::EpochHandle;
    use crate::frame::{HitRegion, TrackedPlane, TrackingState};
    use crate::scene::{Node, Pose};
    use glam::Vec3;

    fn ctx() -> UpdateContext {
        UpdateContext::new(EventSender::dummy(), EpochHandle::new())
    }

    fn screen() -> Placement {
        Placement::new(demo_models())
    }

    fn plane_frame(index: u64, plane_id: &str) -> Frame {
        let mut frame = Frame::new(index);
        frame.updated_planes.push(TrackedPlane {
            id: plane_id.to_string(),
            center: Pose::from_translation(Vec3::new(0.0, -1.0, -2.0)),
            extent: glam::Vec2::ONE,
            state: TrackingState::Tracking,
        });
        frame
    }

    fn depth_hit_frame(index: u64, at: Vec2) -> Frame {
        Frame::new(index).with_hit_region(HitRegion {
            at,
            radius: 16.0,
            result: HitResult {
                kind: TrackableKind::DepthPoint,
                pose: Pose::from_translation(Vec3::new(0.0, 0.0, -1.0)),
                distance: 1.0,
            },
        })
    }

    fn model_asset(node: &SceneNode) -> &str {
        match &node.children[0] {
            NodeKind::Model(m) => &m.asset,
            other => panic!("expected model child, got {}", other.node_type()),
        }
    }

    #[test]
    fn test_first_plane_places_once() {
        let mut ctx = ctx();
        let mut screen = screen();

        screen.on_frame(&plane_frame(0, "floor"), &mut ctx);
        assert_eq!(ctx.scene.len(), 1);

        // Same plane re-reported, and a second plane later: no re-placement.
        screen.on_frame(&plane_frame(1, "floor"), &mut ctx);
        screen.on_frame(&plane_frame(2, "table"), &mut ctx);
        assert_eq!(ctx.scene.len(), 1);
    }

    #[test]
    fn test_reset_clears_and_rearms() {
        let mut ctx = ctx();
        let mut screen = screen();

        screen.on_frame(&plane_frame(0, "floor"), &mut ctx);
        screen.on_action(&UserAction::Tap { x: 100.0, y: 100.0 }, &mut ctx);
        // Build up to 3 nodes via taps on a hit-bearing frame.
        screen.on_frame(&depth_hit_frame(1, Vec2::new(50.0, 60.0)), &mut ctx);
        screen.on_action(&UserAction::Tap { x: 50.0, y: 60.0 }, &mut ctx);
        screen.on_action(&UserAction::Tap { x: 50.0, y: 60.0 }, &mut ctx);
        assert_eq!(ctx.scene.len(), 3);

        screen.on_action(&UserAction::ResetScene, &mut ctx);
        assert!(ctx.scene.is_empty());

        // Next qualifying frame places again.
        screen.on_frame(&plane_frame(2, "floor"), &mut ctx);
        assert_eq!(ctx.scene.len(), 1);
    }

    #[test]
    fn test_model_switch_clears_and_uses_new_config() {
        let mut ctx = ctx();
        let mut screen = screen();

        screen.on_frame(&plane_frame(0, "floor"), &mut ctx);
        let first = model_asset(ctx.scene.get("floor").unwrap()).to_string();
        assert_eq!(first, "models/android-mascot.glb");

        screen.on_action(&UserAction::SwitchModel, &mut ctx);
        assert!(ctx.scene.is_empty());

        screen.on_frame(&plane_frame(1, "floor"), &mut ctx);
        assert_eq!(
            model_asset(ctx.scene.get("floor").unwrap()),
            "models/itachi.glb"
        );
    }

    #[test]
    fn test_tap_requires_depth_or_plane_hit() {
        let mut ctx = ctx();
        let mut screen = screen();

        // Frame whose only hit is a plain point-cloud point.
        let mut frame = Frame::new(0).with_hit_region(HitRegion {
            at: Vec2::new(10.0, 10.0),
            radius: 16.0,
            result: HitResult {
                kind: TrackableKind::Point,
                pose: Pose::IDENTITY,
                distance: 0.5,
            },
        });
        frame.updated_planes.clear();
        screen.placed = true; // suppress auto placement
        screen.on_frame(&frame, &mut ctx);

        screen.on_action(&UserAction::Tap { x: 10.0, y: 10.0 }, &mut ctx);
        assert!(ctx.scene.is_empty(), "point-cloud hits must not place");

        screen.on_frame(&depth_hit_frame(1, Vec2::new(10.0, 10.0)), &mut ctx);
        screen.on_action(&UserAction::Tap { x: 10.0, y: 10.0 }, &mut ctx);
        assert_eq!(ctx.scene.len(), 1);
    }

    #[test]
    fn test_edit_gesture_toggles_bounding_box() {
        let mut ctx = ctx();
        let mut screen = screen();
        screen.on_frame(&plane_frame(0, "floor"), &mut ctx);

        let bb_visible = |ctx: &UpdateContext| {
            let node = ctx.scene.get("floor").unwrap();
            let NodeKind::Model(model) = &node.children[0] else {
                panic!("expected model");
            };
            model.children.iter().any(|c| c.is_visible())
        };
        assert!(!bb_visible(&ctx));

        screen.on_action(&UserAction::EditBegin, &mut ctx);
        assert!(bb_visible(&ctx));

        screen.on_action(&UserAction::EditEnd, &mut ctx);
        assert!(!bb_visible(&ctx));
    }

    #[test]
    fn test_hint_follows_scene_state() {
        let mut ctx = ctx();
        let mut screen = screen();

        screen.on_frame(&Frame::new(0), &mut ctx);
        assert_eq!(ctx.overlay.status_line(), "Point your phone down");

        screen.on_frame(&plane_frame(1, "floor"), &mut ctx);
        assert_eq!(ctx.overlay.status_line(), "Tap anywhere to add model");
    }
}
