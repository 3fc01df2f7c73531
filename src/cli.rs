use clap::{Parser, ValueEnum};
use std::path::PathBuf;

const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Which AR experience the runner drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ExperienceKind {
    /// Plane placement with tap interaction.
    #[default]
    Place,
    /// Reference-image overlays.
    Images,
    /// Camera object detection with screen overlay.
    Detect,
}

/// Headless AR session runner
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Experience to run
    #[arg(value_enum, default_value = "place")]
    pub experience: ExperienceKind,

    /// Scenario JSON file (built-in demo scenario when omitted)
    #[arg(short = 's', long = "scenario", value_name = "FILE")]
    pub scenario: Option<PathBuf>,

    /// Worker threads for detection jobs (default: half of CPU cores)
    #[arg(long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Detection anchors may miss this many result batches before pruning
    #[arg(long = "miss-budget", value_name = "N")]
    pub miss_budget: Option<u32>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}
