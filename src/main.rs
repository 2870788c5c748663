use std::{path::PathBuf, time::Duration};

use clap::Parser;
use color_eyre::Result;
use log::LevelFilter;

pub mod app;
pub mod heatmap;
pub mod interpolate;
pub mod read_data;
pub mod refresh;
pub mod render;
pub mod sample;
pub mod watcher;

use app::{App, TerminalSink};
use refresh::{ChangeHandler, DirtyFlag, RefreshConfig, RefreshCoordinator};
use watcher::{ChangeNotifier, WatchTarget};

/// Live heatmap of RF power over azimuth/elevation, redrawn whenever the
/// scan log changes.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// CSV to watch: `time,power,azimuth,elevation` rows, no header
    path: PathBuf,
    /// Grid points per axis
    #[arg(short, long, default_value_t = 100, value_parser = clap::value_parser!(u16).range(1..=1000))]
    resolution: u16,
    /// Milliseconds the display gets per loop iteration
    #[arg(short, long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,
    #[arg(short, long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

impl Cli {
    fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            resolution: self.resolution as usize,
            interval: Duration::from_millis(self.interval_ms),
        }
    }
}

/// Entry point: start watching, then hand the terminal to the refresh loop.
fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    tui_logger::init_logger(cli.log_level)?;
    tui_logger::set_default_level(cli.log_level);

    let config = cli.refresh_config();
    let target = WatchTarget::resolve(&cli.path)?;
    let flag = DirtyFlag::new();
    let handler = ChangeHandler::new(target.file.clone(), flag.clone());
    // Started before the first load so no write slips between the two.
    let notifier = ChangeNotifier::watch(&target.dir, move |path| {
        handler.on_change(path);
    })?;
    let mut coordinator = RefreshCoordinator::new(target.file, flag, config);

    let terminal = ratatui::init();
    let mut sink = TerminalSink::new(terminal, App::new(cli.path, config.resolution));
    let result = coordinator.run(&mut sink, notifier);
    ratatui::restore();
    result
}
