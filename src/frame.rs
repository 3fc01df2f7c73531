//! Per-frame data delivered by the session source.
//!
//! A `Frame` carries everything the update handlers may inspect: the tracked
//! entities that changed this frame, the raw camera image (when buffered),
//! hit-test responses, and the image-to-view coordinate transform.
//!
//! Entities are *reported*, not computed, here - tracking itself lives behind
//! the session seam. Tracking gaps are expected: an entity missing from one
//! frame's report says nothing about its scene-side lifetime.

use glam::{Vec2, Vec3};

use crate::scene::transform::Pose;

/// Tracking quality of a reported entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    #[default]
    Tracking,
    Paused,
    Stopped,
}

/// Enumerated cause for degraded pose tracking, republished as user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingFailureReason {
    BadState,
    InsufficientLight,
    ExcessiveMotion,
    InsufficientFeatures,
    CameraUnavailable,
}

impl TrackingFailureReason {
    /// Human-readable hint shown while tracking is degraded.
    pub fn description(&self) -> &'static str {
        match self {
            Self::BadState => "Tracking lost, restart the experience",
            Self::InsufficientLight => "Too dark, try moving to a well-lit area",
            Self::ExcessiveMotion => "Moving too fast, slow down",
            Self::InsufficientFeatures => "Aim at a surface with more texture",
            Self::CameraUnavailable => "Camera unavailable",
        }
    }
}

/// A reference image recognized in this frame.
#[derive(Debug, Clone)]
pub struct TrackedImage {
    /// Stable identifier: the name the image was registered under.
    pub name: String,
    pub pose: Pose,
    /// Physical extent of the recognized image in meters (x, z).
    pub extent: Vec2,
    pub state: TrackingState,
}

/// A flat surface detected in this frame.
#[derive(Debug, Clone)]
pub struct TrackedPlane {
    /// Stable identifier assigned by the tracking engine.
    pub id: String,
    /// Pose at the plane center; content is anchored here.
    pub center: Pose,
    pub extent: Vec2,
    pub state: TrackingState,
}

/// Kind of real-world feature a hit test can intersect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackableKind {
    Plane,
    /// Generic point-cloud point.
    Point,
    /// Depth-map point; the only kind the detection path anchors to.
    DepthPoint,
    Image,
}

/// One intersection returned by a hit test, nearest first.
#[derive(Debug, Clone)]
pub struct HitResult {
    pub kind: TrackableKind,
    pub pose: Pose,
    /// Distance from the camera along the ray, meters.
    pub distance: f32,
}

/// Maps image-pixel coordinates to view coordinates.
///
/// The camera sensor is typically rotated against the display, so the
/// transform may swap axes in addition to scaling into view units.
#[derive(Debug, Clone, Copy)]
pub struct ViewTransform {
    pub scale: Vec2,
    pub offset: Vec2,
    pub swap_axes: bool,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: Vec2::ONE,
            offset: Vec2::ZERO,
            swap_axes: false,
        }
    }
}

impl ViewTransform {
    pub fn image_to_view(&self, point: Vec2) -> Vec2 {
        let p = if self.swap_axes {
            Vec2::new(point.y, point.x)
        } else {
            point
        };
        p * self.scale + self.offset
    }
}

/// Pixel format of a raw camera image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    /// Three planes (Y, U, V) with independent row and pixel strides.
    Yuv420_888,
    /// Full-resolution luma followed by interleaved V/U chroma.
    Nv21,
    /// Packed 8-bit RGB.
    Rgb24,
}

/// One plane of a planar image.
#[derive(Debug, Clone)]
pub struct ImagePlane {
    pub data: Vec<u8>,
    /// Bytes between vertically adjacent samples.
    pub row_stride: usize,
    /// Bytes between horizontally adjacent samples (2 for interleaved chroma).
    pub pixel_stride: usize,
}

/// Raw planar camera image as captured, before any format conversion.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub format: ImageFormat,
    pub width: usize,
    pub height: usize,
    pub planes: Vec<ImagePlane>,
}

/// Why a frame's image could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireError {
    /// No frame has buffered image data yet (capture latency). Transient;
    /// skip this frame and wait for the next one.
    NotYetAvailable,
}

impl std::fmt::Display for AcquireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotYetAvailable => write!(f, "camera image not yet available"),
        }
    }
}

impl std::error::Error for AcquireError {}

/// Scripted hit-test response: queries within `radius` of `at` intersect.
#[derive(Debug, Clone)]
pub struct HitRegion {
    pub at: Vec2,
    pub radius: f32,
    pub result: HitResult,
}

/// One frame produced by the session source.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Monotonically increasing frame index.
    pub index: u64,
    /// Presentation timestamp, nanoseconds.
    pub timestamp_ns: u64,
    /// Reference images whose tracking changed this frame.
    pub updated_images: Vec<TrackedImage>,
    /// Planes whose tracking changed this frame.
    pub updated_planes: Vec<TrackedPlane>,
    /// Tracking failure active during this frame, if any.
    pub failure: Option<TrackingFailureReason>,
    pub view_transform: ViewTransform,
    pub(crate) image: Option<RawImage>,
    pub(crate) hit_regions: Vec<HitRegion>,
}

impl Frame {
    pub fn new(index: u64) -> Self {
        Self {
            index,
            timestamp_ns: index * 33_333_333, // 30 fps cadence
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: RawImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_hit_region(mut self, region: HitRegion) -> Self {
        self.hit_regions.push(region);
        self
    }

    /// Acquire this frame's raw camera image.
    ///
    /// Fails with [`AcquireError::NotYetAvailable`] when the capture pipeline
    /// has not buffered image data for this frame yet.
    pub fn acquire_image(&self) -> Result<&RawImage, AcquireError> {
        self.image.as_ref().ok_or(AcquireError::NotYetAvailable)
    }

    /// Hit-test at a view-space coordinate, nearest intersection first.
    pub fn hit_test(&self, point: Vec2) -> Vec<HitResult> {
        let mut hits: Vec<HitResult> = self
            .hit_regions
            .iter()
            .filter(|r| (r.at - point).length() <= r.radius)
            .map(|r| r.result.clone())
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Hit-test keeping only intersections of the given trackable kind.
    pub fn hit_test_filtered(&self, point: Vec2, kind: TrackableKind) -> Vec<HitResult> {
        let mut hits = self.hit_test(point);
        hits.retain(|h| h.kind == kind);
        hits
    }

    /// First plane reported this frame that is actively tracking.
    pub fn first_tracking_plane(&self) -> Option<&TrackedPlane> {
        self.updated_planes
            .iter()
            .find(|p| p.state == TrackingState::Tracking)
    }
}

/// Convenience constructor for a tracked image at a world position.
pub fn tracked_image(name: &str, position: Vec3) -> TrackedImage {
    TrackedImage {
        name: name.to_string(),
        pose: Pose::from_translation(position),
        extent: Vec2::new(0.2, 0.3),
        state: TrackingState::Tracking,
    }
}
