//! Event stream for scene and overlay changes.
//!
//! Events are emitted when update handlers change observable state and are
//! polled by the presentation layer (the demo runner prints them). Emitting
//! is fire-and-forget: a dropped receiver never fails the frame path.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::frame::TrackingFailureReason;

/// State changes the presentation layer may react to.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A scene node was attached for an entity identifier.
    NodePlaced { entity_id: String },

    /// The scene-node collection was emptied (reset or teardown).
    SceneCleared,

    /// The overlay rect list was replaced.
    OverlayChanged { rects: usize },

    /// The persistent warning line changed.
    WarningChanged { text: Option<String> },

    /// Pose tracking degraded or recovered.
    TrackingFailureChanged {
        reason: Option<TrackingFailureReason>,
    },

    /// The active model configuration changed.
    ModelSwitched { asset: String },
}

/// Event sender handed to update contexts.
///
/// Holds an optional channel so tests and headless paths can run without a
/// receiver (`dummy()`).
#[derive(Debug, Clone, Default)]
pub struct EventSender {
    sender: Option<Sender<AppEvent>>,
}

impl EventSender {
    pub fn new(sender: Sender<AppEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// No-op sender for tests or when nobody listens.
    pub fn dummy() -> Self {
        Self { sender: None }
    }

    /// Emit an event; silent if there is no receiver.
    pub fn emit(&self, event: AppEvent) {
        if let Some(ref tx) = self.sender {
            let _ = tx.send(event);
        }
    }
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (EventSender, Receiver<AppEvent>) {
    let (tx, rx) = unbounded();
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_and_poll() {
        let (tx, rx) = channel();
        tx.emit(AppEvent::NodePlaced {
            entity_id: "pom".into(),
        });
        tx.emit(AppEvent::SceneCleared);

        let events: Vec<AppEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], AppEvent::SceneCleared);
    }

    #[test]
    fn test_dummy_sender_is_silent() {
        let tx = EventSender::dummy();
        // Must not panic or block.
        tx.emit(AppEvent::OverlayChanged { rects: 3 });
    }

    #[test]
    fn test_dropped_receiver_ignored() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit(AppEvent::SceneCleared);
    }
}
