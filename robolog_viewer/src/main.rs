//! robolog Viewer CLI
//!
//! Usage:
//!   robolog-viewer [FILE] [--model URDF] [--speed 2.0] [--snapshot view.json]

use clap::Parser;
use robolog_env::{SystemContext, ViewerContext};
use robolog_viewer::{dashboard, telemetry, App, RobotView, SharedConsole, ViewerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Robot logger MAT-file viewer
#[derive(Parser, Debug)]
#[command(name = "robolog-viewer")]
#[command(about = "Browse, plot and replay robot logger MAT-files", long_about = None)]
struct Args {
    /// Log file to open (MATLAB 7.3)
    file: Option<PathBuf>,

    /// JSON file with viewer settings; command line options win
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root group of the log
    #[arg(long)]
    root: Option<String>,

    /// URDF to use instead of searching for the logged robot
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Extra directory searched for package:// meshes
    #[arg(long)]
    package_dir: Option<PathBuf>,

    /// Robot loaded when the log names none or an unknown one
    #[arg(long)]
    fallback_robot: Option<String>,

    /// Playback timer period in milliseconds
    #[arg(long)]
    period_ms: Option<u64>,

    /// Playback speed multiplier
    #[arg(short, long)]
    speed: Option<f64>,

    /// View snapshot to restore at startup
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Where 's' saves the view snapshot
    #[arg(long)]
    save_snapshot: Option<PathBuf>,

    /// Record the 3D view to an .rrd file instead of spawning a viewer
    #[arg(long)]
    rerun_save: Option<PathBuf>,

    /// Also write log messages to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::from_file(path)?,
            None => ViewerConfig::default(),
        };
        if self.file.is_some() {
            config.file = self.file;
        }
        if let Some(root) = self.root {
            config.root_name = root;
        }
        if self.model.is_some() {
            config.model = self.model;
        }
        if self.package_dir.is_some() {
            config.package_dir = self.package_dir;
        }
        if let Some(robot) = self.fallback_robot {
            config.fallback_robot = robot;
        }
        if let Some(period) = self.period_ms {
            config.period_ms = period;
        }
        if let Some(speed) = self.speed {
            config.speed = speed;
        }
        if self.snapshot.is_some() {
            config.snapshot = self.snapshot;
        }
        if let Some(path) = self.save_snapshot {
            config.save_snapshot = path;
        }
        if self.rerun_save.is_some() {
            config.rerun_save = self.rerun_save;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let verbose = args.verbose;
    let log_file = args.log_file.clone();
    let config = args.into_config()?;

    let ctx: Arc<dyn ViewerContext> = SystemContext::shared();
    let console = SharedConsole::new(config.console_capacity);
    telemetry::init(console.clone(), ctx.clone(), verbose, log_file.as_deref())?;
    info!("robolog viewer v{}", env!("CARGO_PKG_VERSION"));

    let robot_view = RobotView::new(config.rerun_save.as_deref());
    let mut app = App::new(config, ctx, console, robot_view);
    dashboard::run(&mut app)
}
