//! Camera object detection: frame -> detections -> screen overlay.
//!
//! Per frame, in order:
//! 1. Drain detection batches that arrived since the last frame (results are
//!    matched to *this* frame, not the frame whose image produced them).
//!    For each detection: map its image-space center into view space,
//!    publish a view-space rect, and hit-test for a depth-point anchor.
//! 2. Acquire this frame's camera image, convert it for the detector, and
//!    submit asynchronously. Image-not-yet-available and conversion
//!    failures abort step 2 for this frame only.
//!
//! Anchors live in the keyed anchor map, pruned by miss budget, so the
//! collection stays bounded no matter how long the screen runs.

use glam::Vec2;
use log::{debug, warn};

use super::{Experience, UpdateContext, UserAction};
use crate::convert;
use crate::detect::{DetectionBatch, DetectorHandle};
use crate::frame::{Frame, TrackableKind};
use crate::overlay::OverlayRect;
use crate::scene::{Anchor, AnchorKey};

/// The object-detection screen.
pub struct ObjectDetection {
    handle: DetectorHandle,
    /// Frames whose submission was skipped (transient conditions), kept for
    /// the status line.
    skipped_frames: u64,
    submitted_frames: u64,
}

impl ObjectDetection {
    pub fn new(handle: DetectorHandle) -> Self {
        Self {
            handle,
            skipped_frames: 0,
            submitted_frames: 0,
        }
    }

    pub fn submitted_frames(&self) -> u64 {
        self.submitted_frames
    }

    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    /// Apply one result batch against the current frame.
    fn apply_batch(&mut self, batch: &DetectionBatch, frame: &Frame, ctx: &mut UpdateContext) {
        let mut rects = Vec::with_capacity(batch.objects.len());
        let mut anchors = Vec::new();

        for (i, object) in batch.objects.iter().enumerate() {
            let center_view = frame.view_transform.image_to_view(object.bounds.center());

            // The sensor is rotated against the view, so the box's image
            // width maps to view height and vice versa.
            let half = Vec2::new(object.bounds.height, object.bounds.width);
            let label = object
                .label
                .clone()
                .unwrap_or_else(|| match object.tracking_id {
                    Some(id) => format!("object {}", id),
                    None => "object".to_string(),
                });
            rects.push(OverlayRect::new(
                center_view - half,
                center_view + half,
                label,
            ));

            // Depth points only; plane and point-cloud hits are excluded.
            if let Some(hit) = frame
                .hit_test_filtered(center_view, TrackableKind::DepthPoint)
                .into_iter()
                .next()
            {
                let key = match object.tracking_id {
                    Some(id) => AnchorKey::Tracked(id),
                    None => AnchorKey::Synthetic(frame.index << 16 | i as u64),
                };
                anchors.push((key, Anchor::new(hit.pose)));
            }
        }

        debug!(
            "Batch from frame {} applied at frame {}: {} rects, {} anchors",
            batch.frame_index,
            frame.index,
            rects.len(),
            anchors.len()
        );

        ctx.overlay.publish_rects(rects, &ctx.events);
        ctx.anchors.observe_batch(anchors);
    }
}

impl Experience for ObjectDetection {
    fn name(&self) -> &'static str {
        "object-detection"
    }

    fn on_frame(&mut self, frame: &Frame, ctx: &mut UpdateContext) {
        ctx.overlay.set_failure(frame.failure, &ctx.events);

        // Results first: whatever arrived since the last frame is matched
        // back to this frame's coordinates.
        for batch in self.handle.drain() {
            self.apply_batch(&batch, frame, ctx);
        }

        // Then feed the detector with this frame's image.
        let raw = match frame.acquire_image() {
            Ok(raw) => raw,
            Err(e) => {
                // Expected transient; retry is the next frame.
                debug!("Frame {}: {}", frame.index, e);
                self.skipped_frames += 1;
                return;
            }
        };

        let rgb = match convert::camera_image_to_rgb(raw) {
            Ok(rgb) => rgb,
            Err(e) => {
                warn!("Frame {}: conversion failed: {}", frame.index, e);
                self.skipped_frames += 1;
                return;
            }
        };

        self.handle.submit(rgb, frame.index);
        self.submitted_frames += 1;
    }

    fn on_action(&mut self, action: &UserAction, ctx: &mut UpdateContext) {
        if *action == UserAction::ResetScene {
            // Fence off in-flight results before touching shared state.
            ctx.epoch.bump();
            ctx.clear_scene();
            ctx.overlay.publish_rects(Vec::new(), &ctx.events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventSender;
    use crate::core::workers::EpochHandle;
    use crate::detect::{DetectedObject, ImageBox, InlineDispatch, ScriptedDetector};
    use crate::frame::{HitRegion, HitResult, ImageFormat, ImagePlane, RawImage, ViewTransform};
    use crate::scene::Pose;
    use glam::Vec3;
    use std::sync::Arc;

    fn camera_image(w: usize, h: usize) -> RawImage {
        let (cw, ch) = (w / 2, h / 2);
        RawImage {
            format: ImageFormat::Yuv420_888,
            width: w,
            height: h,
            planes: vec![
                ImagePlane {
                    data: vec![128; w * h],
                    row_stride: w,
                    pixel_stride: 1,
                },
                ImagePlane {
                    data: vec![128; cw * ch],
                    row_stride: cw,
                    pixel_stride: 1,
                },
                ImagePlane {
                    data: vec![128; cw * ch],
                    row_stride: cw,
                    pixel_stride: 1,
                },
            ],
        }
    }

    fn object(id: Option<u32>, x: f32, y: f32) -> DetectedObject {
        DetectedObject {
            bounds: ImageBox {
                x,
                y,
                width: 40.0,
                height: 60.0,
            },
            tracking_id: id,
            label: Some("cup".into()),
            confidence: 0.8,
        }
    }

    fn screen_with(responses: Vec<Vec<DetectedObject>>) -> (ObjectDetection, UpdateContext) {
        let epoch = EpochHandle::new();
        let handle = DetectorHandle::new(
            Arc::new(ScriptedDetector::new(responses)),
            Arc::new(InlineDispatch),
            epoch.clone(),
        );
        let ctx = UpdateContext::new(EventSender::dummy(), epoch);
        (ObjectDetection::new(handle), ctx)
    }

    fn depth_hit_at(at: Vec2) -> HitRegion {
        HitRegion {
            at,
            radius: 200.0,
            result: HitResult {
                kind: TrackableKind::DepthPoint,
                pose: Pose::from_translation(Vec3::new(0.0, 0.0, -1.2)),
                distance: 1.2,
            },
        }
    }

    #[test]
    fn test_unavailable_frames_then_one_pass() {
        let (mut screen, mut ctx) = screen_with(vec![vec![object(Some(1), 0.0, 0.0)]]);

        // N frames without buffered image data: no processing.
        for i in 0..4 {
            screen.on_frame(&Frame::new(i), &mut ctx);
        }
        assert_eq!(screen.submitted_frames(), 0);
        assert_eq!(screen.skipped_frames(), 4);

        // One good frame: exactly one conversion/submission pass.
        let frame = Frame::new(4).with_image(camera_image(8, 6));
        screen.on_frame(&frame, &mut ctx);
        assert_eq!(screen.submitted_frames(), 1);
    }

    #[test]
    fn test_results_applied_to_later_frame() {
        let (mut screen, mut ctx) = screen_with(vec![vec![object(Some(1), 100.0, 200.0)]]);

        // Frame 0 submits; inline dispatch means the batch is queued now,
        // but it is only applied when frame 1 drains it.
        let f0 = Frame::new(0).with_image(camera_image(8, 6));
        screen.on_frame(&f0, &mut ctx);
        assert!(ctx.overlay.rects().is_empty());

        let mut f1 = Frame::new(1);
        f1.view_transform = ViewTransform {
            scale: Vec2::ONE,
            offset: Vec2::ZERO,
            swap_axes: true,
        };
        screen.on_frame(&f1, &mut ctx);
        assert_eq!(ctx.overlay.rects().len(), 1);

        // Image center (120, 230) swaps to view (230, 120); half extents
        // swap too (height, width) = (60, 40).
        let rect = &ctx.overlay.rects()[0];
        assert_eq!(rect.min, Vec2::new(170.0, 80.0));
        assert_eq!(rect.max, Vec2::new(290.0, 160.0));
    }

    #[test]
    fn test_depth_hit_creates_keyed_anchor() {
        let (mut screen, mut ctx) = screen_with(vec![
            vec![object(Some(7), 100.0, 200.0)],
            vec![object(Some(7), 110.0, 205.0)],
        ]);

        let f0 = Frame::new(0).with_image(camera_image(8, 6));
        screen.on_frame(&f0, &mut ctx);

        // Detection center in view space (identity transform): (120, 230).
        let f1 = Frame::new(1)
            .with_image(camera_image(8, 6))
            .with_hit_region(depth_hit_at(Vec2::new(120.0, 230.0)));
        screen.on_frame(&f1, &mut ctx);
        assert_eq!(ctx.anchors.len(), 1);

        // Same tracking id re-anchored: replaced, not duplicated.
        let f2 = Frame::new(2)
            .with_hit_region(depth_hit_at(Vec2::new(130.0, 235.0)));
        screen.on_frame(&f2, &mut ctx);
        assert_eq!(ctx.anchors.len(), 1);
        assert!(ctx.anchors.get(&AnchorKey::Tracked(7)).is_some());
    }

    #[test]
    fn test_no_hit_no_anchor_but_rect_published() {
        let (mut screen, mut ctx) = screen_with(vec![vec![object(None, 10.0, 10.0)]]);

        let f0 = Frame::new(0).with_image(camera_image(8, 6));
        screen.on_frame(&f0, &mut ctx);
        screen.on_frame(&Frame::new(1), &mut ctx);

        assert_eq!(ctx.overlay.rects().len(), 1);
        assert!(ctx.anchors.is_empty());
    }

    #[test]
    fn test_reset_drops_inflight_results() {
        let (mut screen, mut ctx) = screen_with(vec![vec![object(Some(1), 0.0, 0.0)]]);

        let f0 = Frame::new(0).with_image(camera_image(8, 6));
        screen.on_frame(&f0, &mut ctx);

        // Reset between arrival and the next frame's drain.
        screen.on_action(&UserAction::ResetScene, &mut ctx);
        screen.on_frame(&Frame::new(1), &mut ctx);

        assert!(ctx.overlay.rects().is_empty());
        assert!(ctx.anchors.is_empty());
    }

    #[test]
    fn test_bad_image_skips_frame_only() {
        let (mut screen, mut ctx) = screen_with(vec![vec![object(Some(1), 0.0, 0.0)]]);

        // Truncated luma plane: conversion fails, frame skipped.
        let mut bad = camera_image(8, 6);
        bad.planes[0].data.truncate(3);
        screen.on_frame(&Frame::new(0).with_image(bad), &mut ctx);
        assert_eq!(screen.submitted_frames(), 0);

        // Next good frame processes normally.
        screen.on_frame(&Frame::new(1).with_image(camera_image(8, 6)), &mut ctx);
        assert_eq!(screen.submitted_frames(), 1);
    }
}
