//! Core engine modules - session seam, events, workers.
//!
//! These modules form the frame-delivery and background-work engine,
//! independent of any experience.

pub mod events;
pub mod session;
pub mod workers;

// Re-exports for convenience
pub use events::{AppEvent, EventSender};
pub use session::{Availability, Capabilities, Scenario, ScriptedSession, SessionSource};
pub use workers::{EpochHandle, Workers};
