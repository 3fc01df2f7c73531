//! Session lifecycle and the frame pump.
//!
//! `App` owns the session source, the active experience, and the shared
//! update context. Startup is gated on platform availability, then the
//! requested config is reconciled with backend capabilities (unsupported
//! depth degrades with a persistent warning rather than failing) and applied
//! once. After that the pump is strictly sequential: scripted actions due at
//! a frame index run first, then the frame itself, and the next frame is not
//! requested until the handler returns.

use anyhow::{bail, Result};
use log::{info, warn};

use crate::config::SessionConfig;
use crate::core::events::EventSender;
use crate::core::session::{ActionScript, Availability, SessionSource};
use crate::core::workers::EpochHandle;
use crate::experiences::{Experience, UpdateContext};

pub const DEPTH_WARNING: &str = "Depth is not supported on this device";

/// Outcome of `App::start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Runtime installation was requested; relaunch once it completes.
    InstallPending,
}

/// Totals reported after the frame feed ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub frames: u64,
    pub actions: usize,
    pub nodes: usize,
    pub anchors: usize,
    pub rects: usize,
}

/// The session driver.
pub struct App {
    session: Box<dyn SessionSource>,
    experience: Box<dyn Experience>,
    ctx: UpdateContext,
}

impl App {
    pub fn new(
        session: Box<dyn SessionSource>,
        experience: Box<dyn Experience>,
        events: EventSender,
        epoch: EpochHandle,
    ) -> Self {
        Self {
            session,
            experience,
            ctx: UpdateContext::new(events, epoch),
        }
    }

    pub fn ctx(&self) -> &UpdateContext {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut UpdateContext {
        &mut self.ctx
    }

    /// Gate on availability, reconcile the config, apply it once.
    pub fn start(&mut self, config: &SessionConfig) -> Result<StartOutcome> {
        match self.session.availability() {
            Availability::Installed => {}
            Availability::InstallRequested => return Ok(StartOutcome::InstallPending),
            Availability::Unavailable(reason) => bail!("tracking unavailable: {}", reason),
        }

        let caps = self.session.capabilities();
        let resolved = config.resolve(caps.depth);
        if resolved.depth_degraded {
            warn!("Depth requested but unsupported, running without occlusion");
            self.ctx
                .overlay
                .set_warning(Some(DEPTH_WARNING.to_string()), &self.ctx.events);
        }
        self.session.configure(&resolved.config)?;

        info!(
            "Session configured for '{}' (depth: {})",
            self.experience.name(),
            caps.depth
        );
        Ok(StartOutcome::Started)
    }

    /// Drive the frame feed to the end.
    ///
    /// Actions scheduled at a frame index are applied before that frame is
    /// handled. Each frame is fully handled before the next is requested.
    pub fn run(&mut self, actions: &[ActionScript]) -> RunSummary {
        let mut summary = RunSummary::default();

        while let Some(frame) = self.session.next_frame() {
            for scripted in actions.iter().filter(|a| a.at_frame == frame.index) {
                info!("Frame {}: applying {:?}", frame.index, scripted.action);
                self.experience.on_action(&scripted.action, &mut self.ctx);
                summary.actions += 1;
            }
            self.experience.on_frame(&frame, &mut self.ctx);
            summary.frames += 1;
        }

        summary.nodes = self.ctx.scene.len();
        summary.anchors = self.ctx.anchors.len();
        summary.rects = self.ctx.overlay.rects().len();
        summary
    }

    /// Invalidate in-flight async work and release all scene content.
    pub fn teardown(&mut self) {
        self.ctx.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::{Scenario, ScriptedSession};
    use crate::experiences::{placement, Placement};

    fn placement_app(scenario: &Scenario) -> App {
        App::new(
            Box::new(ScriptedSession::from_scenario(scenario)),
            Box::new(Placement::new(placement::demo_models())),
            EventSender::dummy(),
            EpochHandle::new(),
        )
    }

    #[test]
    fn test_end_to_end_placement_scenario() {
        let scenario = Scenario::from_json(
            r#"{
                "name": "place and tap",
                "frames": [
                    {},
                    {"planes": [{"id": "floor", "center": [0.0, -1.0, -2.0]}]},
                    {"hits": [{"at": [200.0, 300.0], "kind": "depth_point", "position": [0.0, 0.0, -1.0]}]},
                    {}
                ],
                "actions": [{"at_frame": 3, "action": {"tap": {"x": 200.0, "y": 300.0}}}]
            }"#,
        )
        .unwrap();

        let mut app = placement_app(&scenario);
        assert_eq!(
            app.start(&scenario.config).unwrap(),
            StartOutcome::Started
        );

        let summary = app.run(&scenario.actions);
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.actions, 1);
        // Auto placement on the plane plus one tap placement.
        assert_eq!(summary.nodes, 2);

        app.teardown();
        assert!(app.ctx().scene.is_empty());
    }

    #[test]
    fn test_depth_degradation_sets_persistent_warning() {
        let scenario = Scenario::from_json(
            r#"{"depth_supported": false, "frames": [{}, {}]}"#,
        )
        .unwrap();

        let mut app = placement_app(&scenario);
        app.start(&scenario.config).unwrap();
        app.run(&scenario.actions);

        // The warning survives every frame, not just the one that set it.
        assert_eq!(app.ctx().overlay.warning(), Some(DEPTH_WARNING));
    }

    #[test]
    fn test_install_pending_short_circuits() {
        let scenario = Scenario::from_json(
            r#"{"availability": "install_requested", "frames": [{}]}"#,
        )
        .unwrap();

        let mut app = placement_app(&scenario);
        assert_eq!(
            app.start(&scenario.config).unwrap(),
            StartOutcome::InstallPending
        );
    }

    #[test]
    fn test_unavailable_platform_fails_start() {
        let scenario = Scenario::from_json(
            r#"{"availability": {"unavailable": "no camera"}, "frames": []}"#,
        )
        .unwrap();

        let mut app = placement_app(&scenario);
        assert!(app.start(&scenario.config).is_err());
    }

    #[test]
    fn test_actions_precede_their_frame() {
        // Reset scheduled at frame 1 runs before frame 1's plane report, so
        // the plane re-places immediately.
        let scenario = Scenario::from_json(
            r#"{
                "frames": [
                    {"planes": [{"id": "floor"}]},
                    {"planes": [{"id": "floor"}]}
                ],
                "actions": [{"at_frame": 1, "action": "reset_scene"}]
            }"#,
        )
        .unwrap();

        let mut app = placement_app(&scenario);
        app.start(&scenario.config).unwrap();
        let summary = app.run(&scenario.actions);
        assert_eq!(summary.nodes, 1);
    }
}
