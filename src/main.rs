use coreshow::app::{App, StartOutcome};
use coreshow::cli::{Args, ExperienceKind};
use coreshow::core::events;
use coreshow::core::session::{Scenario, ScriptedSession};
use coreshow::core::workers::{EpochHandle, Workers};
use coreshow::detect::{DetectorHandle, ScriptedDetector};
use coreshow::experiences::{
    placement, AugmentedImages, Experience, ObjectDetection, OverlayCatalog, Placement,
};
use coreshow::scene::AnchorMap;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::sync::Arc;

/// Built-in demo: a plane shows up, auto-placement fires, then a tap adds a
/// second model and an edit gesture flashes the bounding box.
const DEMO_PLACE: &str = r#"{
    "name": "placement demo",
    "frames": [
        {},
        {"planes": [{"id": "floor", "center": [0.0, -1.0, -2.0]}]},
        {"hits": [{"at": [540.0, 1200.0], "kind": "depth_point", "position": [0.1, -0.9, -1.5]}]},
        {},
        {}
    ],
    "actions": [
        {"at_frame": 3, "action": {"tap": {"x": 540.0, "y": 1200.0}}},
        {"at_frame": 4, "action": "edit_begin"},
        {"at_frame": 4, "action": "edit_end"}
    ]
}"#;

/// Built-in demo: both reference images are recognized across frames; each
/// gets its catalog overlay exactly once.
const DEMO_IMAGES: &str = r#"{
    "name": "augmented images demo",
    "config": {
        "reference_images": ["mario", "pom"],
        "plane_finding": "disabled",
        "depth": "disabled"
    },
    "frames": [
        {},
        {"images": [{"name": "mario", "position": [0.0, 0.0, -0.6]}]},
        {"images": [{"name": "mario"}, {"name": "pom", "position": [0.3, 0.0, -0.6]}]},
        {}
    ]
}"#;

/// Built-in demo: camera frames feed the detector, a tracked object is boxed
/// on screen and anchored at a depth point.
const DEMO_DETECT: &str = r#"{
    "name": "object detection demo",
    "frames": [
        {},
        {"camera_image": {"width": 64, "height": 48}, "view": {"swap_axes": true}},
        {"camera_image": {"width": 64, "height": 48}, "view": {"swap_axes": true},
         "hits": [{"at": [24.0, 18.0], "kind": "depth_point", "position": [0.0, 0.0, -1.1], "radius": 60.0}]},
        {"view": {"swap_axes": true}}
    ],
    "detections": [
        [{"bounds": [6.0, 9.0, 24.0, 30.0], "tracking_id": 1, "label": "cup"}],
        [{"bounds": [7.0, 10.0, 24.0, 30.0], "tracking_id": 1, "label": "cup"}]
    ]
}"#;

fn load_scenario(args: &Args) -> Result<Scenario> {
    let json = match &args.scenario {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?,
        None => match args.experience {
            ExperienceKind::Place => DEMO_PLACE.to_string(),
            ExperienceKind::Images => DEMO_IMAGES.to_string(),
            ExperienceKind::Detect => DEMO_DETECT.to_string(),
        },
    };
    Scenario::from_json(&json).context("parsing scenario")
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let default_level = match args.verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    info!("Coreshow AR session runner starting...");
    debug!("Command-line args: {:?}", args);

    let scenario = load_scenario(&args)?;
    info!(
        "Scenario '{}': {} frames, {} scripted actions",
        scenario.name,
        scenario.frames.len(),
        scenario.actions.len()
    );

    let epoch = EpochHandle::new();
    let (tx, rx) = events::channel();

    // Detection runs on a worker pool; the handle keeps the pool alive.
    let experience: Box<dyn Experience> = match args.experience {
        ExperienceKind::Place => Box::new(Placement::new(placement::demo_models())),
        ExperienceKind::Images => Box::new(AugmentedImages::new(OverlayCatalog::demo())),
        ExperienceKind::Detect => {
            let num_workers = args.workers.unwrap_or_else(|| (num_cpus::get() / 2).max(1));
            info!("Worker pool: {} threads", num_workers);
            let workers = Arc::new(Workers::new(num_workers, epoch.clone()));
            let detector = Arc::new(ScriptedDetector::new(scenario.detector_responses()));
            Box::new(ObjectDetection::new(DetectorHandle::new(
                detector,
                workers,
                epoch.clone(),
            )))
        }
    };

    let session = Box::new(ScriptedSession::from_scenario(&scenario));
    let mut app = App::new(session, experience, tx, epoch);

    if let Some(budget) = args.miss_budget {
        app.ctx_mut().anchors = AnchorMap::new(budget);
    }

    match app.start(&scenario.config)? {
        StartOutcome::Started => {}
        StartOutcome::InstallPending => {
            println!("Runtime installation requested. Run again once it completes.");
            return Ok(());
        }
    }

    let summary = app.run(&scenario.actions);

    for event in rx.try_iter() {
        debug!("Event: {:?}", event);
    }

    println!("Scenario '{}' finished.", scenario.name);
    println!(
        "  frames: {}  actions: {}  nodes: {}  anchors: {}  overlay rects: {}",
        summary.frames, summary.actions, summary.nodes, summary.anchors, summary.rects
    );
    if let Some(warning) = app.ctx().overlay.warning() {
        println!("  warning: {}", warning);
    }
    println!("  status: {}", app.ctx().overlay.status_line());

    app.teardown();
    info!("Application exiting");
    Ok(())
}
