//! Session source seam and the scripted backend.
//!
//! `SessionSource` is the trait the real tracking engine would sit behind:
//! one-shot configuration, capability queries, and a strictly sequential
//! frame feed. `ScriptedSession` is the deterministic implementation used by
//! tests and the demo runner; it replays a serde-loadable `Scenario` of
//! per-frame entity reports, camera images, and hit-test responses.
//!
//! The driver must finish handling one frame before asking for the next;
//! `next_frame` hands out owned frames in order and never overlaps.

use std::collections::VecDeque;

use anyhow::{bail, Result};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::detect::{DetectedObject, ImageBox};
use crate::experiences::UserAction;
use crate::frame::{
    Frame, HitRegion, HitResult, ImageFormat, ImagePlane, RawImage, TrackableKind, TrackedImage,
    TrackedPlane, TrackingFailureReason, TrackingState, ViewTransform,
};
use crate::scene::transform::Pose;

/// Platform prerequisite state. Content is halted until `Installed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Installed,
    /// Runtime installation was requested; retry after it completes.
    InstallRequested,
    Unavailable(String),
}

/// What the backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub depth: bool,
}

/// The tracking-engine seam.
pub trait SessionSource {
    /// Platform prerequisite check, before anything else.
    fn availability(&self) -> Availability;

    /// One-shot session setup. Configuring twice is an error.
    fn configure(&mut self, config: &SessionConfig) -> Result<()>;

    fn capabilities(&self) -> Capabilities;

    /// Next frame in sequence, or None when the feed ends.
    fn next_frame(&mut self) -> Option<Frame>;
}

// ============================================================================
// Scenario (serde side)
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_hit_radius() -> f32 {
    24.0
}

/// A scripted user action applied before the given frame is handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionScript {
    pub at_frame: u64,
    pub action: UserAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageScript {
    pub name: String,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub state: TrackingState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaneScript {
    pub id: String,
    #[serde(default)]
    pub center: [f32; 3],
    #[serde(default = "PlaneScript::default_extent")]
    pub extent: [f32; 2],
    #[serde(default)]
    pub state: TrackingState,
}

impl PlaneScript {
    fn default_extent() -> [f32; 2] {
        [1.0, 1.0]
    }
}

/// Synthesized camera image: uniform YUV values, capture-realistic layout
/// (row padding, interleaved pixel-stride-2 chroma).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraScript {
    pub width: usize,
    pub height: usize,
    #[serde(default = "CameraScript::default_luma")]
    pub luma: u8,
    #[serde(default = "CameraScript::default_chroma")]
    pub chroma_u: u8,
    #[serde(default = "CameraScript::default_chroma")]
    pub chroma_v: u8,
}

impl CameraScript {
    fn default_luma() -> u8 {
        128
    }
    fn default_chroma() -> u8 {
        128
    }

    fn build(&self) -> RawImage {
        let (w, h) = (self.width, self.height);
        let (cw, ch) = (w / 2, h / 2);
        let row_pad = 32;
        RawImage {
            format: ImageFormat::Yuv420_888,
            width: w,
            height: h,
            planes: vec![
                ImagePlane {
                    data: vec![self.luma; (w + row_pad) * h],
                    row_stride: w + row_pad,
                    pixel_stride: 1,
                },
                ImagePlane {
                    data: vec![self.chroma_u; (cw * 2 + row_pad) * ch],
                    row_stride: cw * 2 + row_pad,
                    pixel_stride: 2,
                },
                ImagePlane {
                    data: vec![self.chroma_v; (cw * 2 + row_pad) * ch],
                    row_stride: cw * 2 + row_pad,
                    pixel_stride: 2,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitScript {
    pub at: [f32; 2],
    #[serde(default = "default_hit_radius")]
    pub radius: f32,
    pub kind: TrackableKind,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "HitScript::default_distance")]
    pub distance: f32,
}

impl HitScript {
    fn default_distance() -> f32 {
        1.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewScript {
    #[serde(default = "ViewScript::default_scale")]
    pub scale: [f32; 2],
    #[serde(default)]
    pub offset: [f32; 2],
    #[serde(default = "default_true")]
    pub swap_axes: bool,
}

impl ViewScript {
    fn default_scale() -> [f32; 2] {
        [1.0, 1.0]
    }
}

/// One scripted detector result. Responses are consumed per detect call, in
/// order, by the scripted detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionScript {
    /// Image-space box: [x, y, width, height].
    pub bounds: [f32; 4],
    #[serde(default)]
    pub tracking_id: Option<u32>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "DetectionScript::default_confidence")]
    pub confidence: f32,
}

impl DetectionScript {
    fn default_confidence() -> f32 {
        0.8
    }

    fn build(&self) -> DetectedObject {
        DetectedObject {
            bounds: ImageBox {
                x: self.bounds[0],
                y: self.bounds[1],
                width: self.bounds[2],
                height: self.bounds[3],
            },
            tracking_id: self.tracking_id,
            label: self.label.clone(),
            confidence: self.confidence,
        }
    }
}

/// One scripted frame.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FrameScript {
    pub images: Vec<ImageScript>,
    pub planes: Vec<PlaneScript>,
    pub camera_image: Option<CameraScript>,
    pub hits: Vec<HitScript>,
    pub failure: Option<TrackingFailureReason>,
    pub view: Option<ViewScript>,
}

impl FrameScript {
    fn build(&self, index: u64) -> Frame {
        let mut frame = Frame::new(index);

        frame.updated_images = self
            .images
            .iter()
            .map(|s| TrackedImage {
                name: s.name.clone(),
                pose: Pose::from_translation(Vec3::from_array(s.position)),
                extent: Vec2::new(0.2, 0.3),
                state: s.state,
            })
            .collect();

        frame.updated_planes = self
            .planes
            .iter()
            .map(|s| TrackedPlane {
                id: s.id.clone(),
                center: Pose::from_translation(Vec3::from_array(s.center)),
                extent: Vec2::from_array(s.extent),
                state: s.state,
            })
            .collect();

        if let Some(cam) = &self.camera_image {
            frame = frame.with_image(cam.build());
        }

        for hit in &self.hits {
            frame = frame.with_hit_region(HitRegion {
                at: Vec2::from_array(hit.at),
                radius: hit.radius,
                result: HitResult {
                    kind: hit.kind,
                    pose: Pose::from_translation(Vec3::from_array(hit.position)),
                    distance: hit.distance,
                },
            });
        }

        frame.failure = self.failure;

        if let Some(view) = &self.view {
            frame.view_transform = ViewTransform {
                scale: Vec2::from_array(view.scale),
                offset: Vec2::from_array(view.offset),
                swap_axes: view.swap_axes,
            };
        }

        frame
    }
}

/// A complete scripted session: prerequisite state, capabilities, frames,
/// and user actions keyed to frame indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default = "default_true")]
    pub depth_supported: bool,
    #[serde(default)]
    pub config: SessionConfig,
    pub frames: Vec<FrameScript>,
    #[serde(default)]
    pub actions: Vec<ActionScript>,
    /// Scripted detector responses, one inner list per detect call.
    #[serde(default)]
    pub detections: Vec<Vec<DetectionScript>>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Actions scheduled to run before the given frame is handled.
    pub fn actions_at(&self, frame_index: u64) -> impl Iterator<Item = &UserAction> {
        self.actions
            .iter()
            .filter(move |a| a.at_frame == frame_index)
            .map(|a| &a.action)
    }

    /// Materialize the scripted detector responses.
    pub fn detector_responses(&self) -> Vec<Vec<DetectedObject>> {
        self.detections
            .iter()
            .map(|batch| batch.iter().map(DetectionScript::build).collect())
            .collect()
    }
}

// ============================================================================
// Scripted session
// ============================================================================

/// Deterministic `SessionSource` replaying a `Scenario`.
pub struct ScriptedSession {
    frames: VecDeque<Frame>,
    availability: Availability,
    depth_supported: bool,
    configured: Option<SessionConfig>,
}

impl ScriptedSession {
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let frames = scenario
            .frames
            .iter()
            .enumerate()
            .map(|(i, s)| s.build(i as u64))
            .collect();
        Self {
            frames,
            availability: scenario.availability.clone(),
            depth_supported: scenario.depth_supported,
            configured: None,
        }
    }

    /// Empty session for tests; push frames with [`push_frame`].
    ///
    /// [`push_frame`]: ScriptedSession::push_frame
    pub fn empty() -> Self {
        Self {
            frames: VecDeque::new(),
            availability: Availability::Installed,
            depth_supported: true,
            configured: None,
        }
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push_back(frame);
    }

    pub fn set_depth_supported(&mut self, supported: bool) {
        self.depth_supported = supported;
    }

    pub fn active_config(&self) -> Option<&SessionConfig> {
        self.configured.as_ref()
    }
}

impl SessionSource for ScriptedSession {
    fn availability(&self) -> Availability {
        self.availability.clone()
    }

    fn configure(&mut self, config: &SessionConfig) -> Result<()> {
        if self.configured.is_some() {
            bail!("session already configured");
        }
        self.configured = Some(config.clone());
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            depth: self.depth_supported,
        }
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let mut frame = self.frames.pop_front()?;
        // Recognition requires registration: a configured session only
        // reports reference images named in its config.
        if let Some(config) = &self.configured {
            frame
                .updated_images
                .retain(|img| config.reference_images.iter().any(|name| name == &img.name));
        }
        Some(frame)
    }
}
