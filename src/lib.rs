//! CORESHOW - AR frame-update orchestration library
//!
//! Re-exports all modules for use by binary targets.

// Core engine (session seam, events, workers)
pub mod core;

// App modules
pub mod app;
pub mod cli;
pub mod config;
pub mod convert;
pub mod detect;
pub mod experiences;
pub mod frame;
pub mod overlay;
pub mod scene;

// Re-export commonly used types from core
pub use core::events::{channel, AppEvent, EventSender};
pub use core::session::{Availability, Scenario, ScriptedSession, SessionSource};
pub use core::workers::{EpochHandle, Workers};

// Re-export the experience surface
pub use experiences::{AugmentedImages, Experience, ObjectDetection, Placement, UserAction};
pub use frame::Frame;
pub use scene::{AnchorMap, SceneRegistry};
