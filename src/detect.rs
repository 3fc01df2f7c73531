//! Detector seam and the asynchronous submission boundary.
//!
//! Detection is the one piece of work that leaves the frame callback. A
//! converted image is handed to the dispatcher (the worker pool in the demo,
//! an inline executor in tests) and results come back over a channel,
//! drained on the update context of a *later* frame - there is no
//! same-frame guarantee.
//!
//! Every submission is tagged with the epoch current at submission time.
//! The epoch is checked twice: before the detector runs (skip stale work)
//! and again when results are drained (drop results that raced a reset or
//! teardown). Nothing downstream of a stale epoch ever touches shared state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error};

use crate::convert::RgbImage;
use crate::core::workers::{EpochHandle, Workers};

/// Image-space bounding box of one detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ImageBox {
    pub fn center(&self) -> glam::Vec2 {
        glam::Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// One detected object as reported by the vision backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    pub bounds: ImageBox,
    /// Stable across frames in stream mode; None for one-shot detections.
    pub tracking_id: Option<u32>,
    pub label: Option<String>,
    pub confidence: f32,
}

/// The vision-backend seam. The model itself is out of scope; implementors
/// are real bindings in production and scripted fixtures here.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedObject>>;
}

/// Where detection jobs run. The worker pool in the demo; inline in tests,
/// which keeps the async plumbing deterministic without threads.
pub trait Dispatch: Send + Sync {
    fn run(&self, job: Box<dyn FnOnce() + Send + 'static>);
}

impl Dispatch for Workers {
    fn run(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        self.execute(job);
    }
}

/// Executes jobs immediately on the calling thread.
#[derive(Debug, Default)]
pub struct InlineDispatch;

impl Dispatch for InlineDispatch {
    fn run(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        job();
    }
}

impl<T: Dispatch + ?Sized> Dispatch for Arc<T> {
    fn run(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        (**self).run(job)
    }
}

/// One batch of results, tagged with its submission epoch and frame.
#[derive(Debug, Clone)]
pub struct DetectionBatch {
    pub epoch: u64,
    /// Frame whose image produced these results; informational only, the
    /// batch is applied against whatever frame drains it.
    pub frame_index: u64,
    pub objects: Vec<DetectedObject>,
}

/// Async submission handle owned by the detection experience.
pub struct DetectorHandle {
    detector: Arc<dyn Detector>,
    dispatch: Arc<dyn Dispatch>,
    epoch: EpochHandle,
    tx: Sender<DetectionBatch>,
    rx: Receiver<DetectionBatch>,
}

impl DetectorHandle {
    pub fn new(detector: Arc<dyn Detector>, dispatch: Arc<dyn Dispatch>, epoch: EpochHandle) -> Self {
        let (tx, rx) = unbounded();
        Self {
            detector,
            dispatch,
            epoch,
            tx,
            rx,
        }
    }

    /// Submit a converted image without blocking the frame path.
    ///
    /// The job captures the current epoch. If the epoch moved before the
    /// job runs, the detector is never invoked for it.
    pub fn submit(&self, image: RgbImage, frame_index: u64) {
        let epoch = self.epoch.current();
        let detector = Arc::clone(&self.detector);
        let epoch_handle = self.epoch.clone();
        let tx = self.tx.clone();

        self.dispatch.run(Box::new(move || {
            if epoch_handle.current() != epoch {
                debug!("Skipping stale detection for frame {}", frame_index);
                return;
            }
            match detector.detect(&image) {
                Ok(objects) => {
                    // Receiver dropped means the screen tore down; fine.
                    let _ = tx.send(DetectionBatch {
                        epoch,
                        frame_index,
                        objects,
                    });
                }
                Err(e) => {
                    // Detector failures never crash the screen.
                    error!("Detection failed for frame {}: {:#}", frame_index, e);
                }
            }
        }));
    }

    /// Drain arrived batches, dropping any whose epoch no longer matches.
    pub fn drain(&self) -> Vec<DetectionBatch> {
        let current = self.epoch.current();
        self.rx
            .try_iter()
            .filter(|batch| {
                if batch.epoch == current {
                    true
                } else {
                    debug!(
                        "Dropping detection batch from frame {} (epoch {} != {})",
                        batch.frame_index, batch.epoch, current
                    );
                    false
                }
            })
            .collect()
    }

    pub fn epoch(&self) -> &EpochHandle {
        &self.epoch
    }
}

/// Stream-mode fixture detector: each `detect` call pops the next scripted
/// response. An exhausted script reports no detections.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    responses: Mutex<VecDeque<Vec<DetectedObject>>>,
}

impl ScriptedDetector {
    pub fn new(responses: Vec<Vec<DetectedObject>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

impl Detector for ScriptedDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectedObject>> {
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        Ok(responses.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_1x1() -> RgbImage {
        RgbImage {
            width: 1,
            height: 1,
            data: vec![0, 0, 0],
        }
    }

    fn object(id: u32) -> DetectedObject {
        DetectedObject {
            bounds: ImageBox {
                x: 10.0,
                y: 20.0,
                width: 30.0,
                height: 40.0,
            },
            tracking_id: Some(id),
            label: None,
            confidence: 0.9,
        }
    }

    fn handle_with(responses: Vec<Vec<DetectedObject>>) -> DetectorHandle {
        DetectorHandle::new(
            Arc::new(ScriptedDetector::new(responses)),
            Arc::new(InlineDispatch),
            EpochHandle::new(),
        )
    }

    #[test]
    fn test_submit_then_drain_on_later_frame() {
        let handle = handle_with(vec![vec![object(1), object(2)]]);

        handle.submit(rgb_1x1(), 5);
        let batches = handle.drain();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].frame_index, 5);
        assert_eq!(batches[0].objects.len(), 2);

        // Nothing left.
        assert!(handle.drain().is_empty());
    }

    #[test]
    fn test_result_after_teardown_dropped() {
        let handle = handle_with(vec![vec![object(1)]]);

        handle.submit(rgb_1x1(), 3);
        // Teardown between arrival and drain.
        handle.epoch().bump();
        assert!(handle.drain().is_empty());
    }

    #[test]
    fn test_stale_submission_never_runs_detector() {
        // Dispatcher that holds jobs until released, so the epoch can move
        // between submission and execution.
        struct DeferredDispatch(Mutex<Vec<Box<dyn FnOnce() + Send + 'static>>>);
        impl Dispatch for DeferredDispatch {
            fn run(&self, job: Box<dyn FnOnce() + Send + 'static>) {
                self.0.lock().unwrap().push(job);
            }
        }

        let epoch = EpochHandle::new();
        let deferred = Arc::new(DeferredDispatch(Mutex::new(Vec::new())));
        let handle = DetectorHandle::new(
            Arc::new(ScriptedDetector::new(vec![vec![object(1)]])),
            Arc::clone(&deferred) as Arc<dyn Dispatch>,
            epoch.clone(),
        );

        handle.submit(rgb_1x1(), 7);
        epoch.bump();
        for job in deferred.0.lock().unwrap().drain(..) {
            job();
        }

        assert!(handle.drain().is_empty());
    }

    #[test]
    fn test_scripted_detector_pops_in_order() {
        let det = ScriptedDetector::new(vec![vec![object(1)], vec![object(2)]]);
        assert_eq!(det.detect(&rgb_1x1()).unwrap()[0].tracking_id, Some(1));
        assert_eq!(det.detect(&rgb_1x1()).unwrap()[0].tracking_id, Some(2));
        assert!(det.detect(&rgb_1x1()).unwrap().is_empty());
    }
}
