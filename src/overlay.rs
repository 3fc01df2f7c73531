//! Observable overlay state - the bridge the presentation layer reads.
//!
//! Rect lists are replaced wholesale on every publish so a stale overlay can
//! never outlive the entity that produced it. The warning line is persistent
//! (capability degradation); the hint line is transient per-frame guidance.

use glam::Vec2;

use crate::core::events::{AppEvent, EventSender};
use crate::frame::TrackingFailureReason;

/// A view-space rectangle with a label, valid for the current redraw only.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRect {
    pub min: Vec2,
    pub max: Vec2,
    pub label: String,
}

impl OverlayRect {
    pub fn new(min: Vec2, max: Vec2, label: String) -> Self {
        Self { min, max, label }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}

/// Published overlay state.
#[derive(Debug, Clone, Default)]
pub struct OverlayState {
    rects: Vec<OverlayRect>,
    warning: Option<String>,
    failure: Option<TrackingFailureReason>,
    hint: String,
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the rect list wholesale.
    pub fn publish_rects(&mut self, rects: Vec<OverlayRect>, events: &EventSender) {
        events.emit(AppEvent::OverlayChanged { rects: rects.len() });
        self.rects = rects;
    }

    pub fn rects(&self) -> &[OverlayRect] {
        &self.rects
    }

    /// Set or clear the persistent warning line.
    pub fn set_warning(&mut self, text: Option<String>, events: &EventSender) {
        if self.warning != text {
            events.emit(AppEvent::WarningChanged { text: text.clone() });
            self.warning = text;
        }
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Republish the tracking-failure state when it changes.
    pub fn set_failure(&mut self, reason: Option<TrackingFailureReason>, events: &EventSender) {
        if self.failure != reason {
            events.emit(AppEvent::TrackingFailureChanged { reason });
            self.failure = reason;
        }
    }

    pub fn failure(&self) -> Option<TrackingFailureReason> {
        self.failure
    }

    pub fn set_hint(&mut self, hint: &str) {
        if self.hint != hint {
            self.hint = hint.to_string();
        }
    }

    /// Text shown to the user: an active failure wins over the hint.
    pub fn status_line(&self) -> &str {
        match self.failure {
            Some(reason) => reason.description(),
            None => &self.hint,
        }
    }

    pub fn clear(&mut self, events: &EventSender) {
        self.publish_rects(Vec::new(), events);
        self.set_failure(None, events);
        self.hint.clear();
    }
}
