//! The three AR experiences behind one frame-update contract.
//!
//! Every experience implements `Experience`: `on_frame` is invoked once per
//! delivered frame, runs to completion before the next delivery, and must be
//! idempotent per entity identifier - repeated reports for an entity that
//! already has a scene node are no-ops. Transient conditions (image not yet
//! buffered) abort the current frame only.
//!
//! `UpdateContext` bundles the shared mutable state every handler works
//! against: the scene registry, anchor map, overlay state, event sender, and
//! the epoch handle that fences asynchronous results.

pub mod augmented_images;
pub mod object_detection;
pub mod placement;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::events::{AppEvent, EventSender};
use crate::core::workers::EpochHandle;
use crate::frame::Frame;
use crate::overlay::OverlayState;
use crate::scene::{AnchorMap, SceneRegistry};

pub use augmented_images::{AugmentedImages, ImageKey, OverlayCatalog};
pub use object_detection::ObjectDetection;
pub use placement::Placement;

/// User input forwarded to the active experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    /// Clear the scene and re-arm automatic placement.
    ResetScene,
    /// Cycle the active model configuration (clears the scene).
    SwitchModel,
    /// Single tap at a view-space coordinate.
    Tap { x: f32, y: f32 },
    /// An edit gesture (drag/rotate/scale) started.
    EditBegin,
    /// The edit gesture ended.
    EditEnd,
    /// Toggle plane visualization.
    TogglePlanes,
    /// Toggle always-on bounding boxes.
    ToggleBoundingBox,
}

/// Shared mutable state owned by the update thread.
pub struct UpdateContext {
    pub scene: SceneRegistry,
    pub anchors: AnchorMap,
    pub overlay: OverlayState,
    pub events: EventSender,
    pub epoch: EpochHandle,
}

impl UpdateContext {
    pub fn new(events: EventSender, epoch: EpochHandle) -> Self {
        Self {
            scene: SceneRegistry::new(),
            anchors: AnchorMap::default(),
            overlay: OverlayState::new(),
            events,
            epoch,
        }
    }

    /// Empty the scene and anchor collections and announce it.
    pub fn clear_scene(&mut self) {
        self.scene.clear();
        self.anchors.clear();
        self.events.emit(AppEvent::SceneCleared);
    }

    /// Teardown: invalidate in-flight async work, then clear everything.
    pub fn teardown(&mut self) {
        self.epoch.bump();
        self.clear_scene();
        self.overlay.clear(&self.events);
    }
}

/// One AR screen.
pub trait Experience {
    fn name(&self) -> &'static str;

    /// Handle one delivered frame. Never invoked concurrently.
    fn on_frame(&mut self, frame: &Frame, ctx: &mut UpdateContext);

    /// Handle a user action. Default: reset clears the scene, everything
    /// else is ignored.
    fn on_action(&mut self, action: &UserAction, ctx: &mut UpdateContext) {
        if *action == UserAction::ResetScene {
            ctx.clear_scene();
        }
    }
}

pub(crate) fn tap_point(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}
