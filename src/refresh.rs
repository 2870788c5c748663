//! Refresh loop: turns file-change notifications into at most one
//! reload + interpolate + render pass per tick.
//!
//! The watcher thread only ever calls [`DirtyFlag::set`]. Everything else
//! (parsing, interpolation, drawing) runs on the thread that owns the
//! [`RefreshCoordinator`].

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use color_eyre::Result;
use log::{debug, info, warn};
use thiserror::Error;

use crate::interpolate::{DEFAULT_RESOLUTION, GridInterpolator, InterpolateError, InterpolatedField};
use crate::read_data::{LoadError, load_samples};
use crate::render::RenderSink;
use crate::watcher::ChangeNotifier;

/// How long each tick hands control to the display.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Shared "the file changed" bit.
///
/// `take` reads and clears in one atomic swap, so a `set` racing with it is
/// either consumed by this tick or left for the next one, never lost. Any
/// number of sets between two takes collapse into one refresh.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlag(Arc<AtomicBool>);

impl DirtyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Notifier callback: marks the flag when the watched file itself changed.
/// Runs on the notifier thread, so it only touches the flag; the coordinator
/// logs the change when it consumes it.
#[derive(Debug, Clone)]
pub struct ChangeHandler {
    target: PathBuf,
    flag: DirtyFlag,
}

impl ChangeHandler {
    /// `target` should already be absolute (see `WatchTarget`).
    pub fn new(target: PathBuf, flag: DirtyFlag) -> Self {
        Self { target, flag }
    }

    /// Returns whether `path` was the target.
    pub fn on_change(&self, path: &Path) -> bool {
        let matches = match std::path::absolute(path) {
            Ok(path) => path == self.target,
            Err(_) => false,
        };
        if matches {
            self.flag.set();
        }
        matches
    }
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Interpolate(#[from] InterpolateError),
}

/// Coordinator state as seen between ticks. A reload runs to completion
/// inside `tick`, on the thread that owns the coordinator, so it never shows
/// up here as a state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Dirty,
    Closed,
}

/// What one loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Display gone; the loop should stop.
    Closed,
    /// Nothing changed since the last tick.
    Idle,
    /// Reloaded and handed a new frame to the sink.
    Refreshed,
    /// Reload failed; the previous frame stays up.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Grid points per axis.
    pub resolution: usize,
    /// Bounded yield to the display per tick.
    pub interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            interval: DEFAULT_INTERVAL,
        }
    }
}

#[derive(Debug)]
pub struct RefreshCoordinator {
    path: PathBuf,
    flag: DirtyFlag,
    interpolator: GridInterpolator,
    interval: Duration,
    state: RefreshState,
    refreshes: u64,
}

impl RefreshCoordinator {
    pub fn new(path: PathBuf, flag: DirtyFlag, config: RefreshConfig) -> Self {
        Self {
            path,
            flag,
            interpolator: GridInterpolator::new(config.resolution),
            interval: config.interval,
            state: RefreshState::Idle,
            refreshes: 0,
        }
    }

    pub fn state(&self) -> RefreshState {
        match self.state {
            RefreshState::Idle if self.flag.is_set() => RefreshState::Dirty,
            state => state,
        }
    }

    /// Successful refreshes so far, the initial one included.
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    /// Reload, interpolate and hand the result to `sink`. On error the sink
    /// is left untouched.
    pub fn refresh<S: RenderSink>(&mut self, sink: &mut S) -> Result<(), RefreshError> {
        let field = self.rebuild()?;
        debug!(
            "Rendering {} samples, {} of {} nodes filled",
            field.points.len(),
            field.filled(),
            field.resolution() * field.resolution()
        );
        sink.render(field);
        self.refreshes += 1;
        Ok(())
    }

    fn rebuild(&self) -> Result<InterpolatedField, RefreshError> {
        let samples = load_samples(&self.path)?;
        let field = self.interpolator.interpolate(&samples)?;
        if field.degenerate {
            info!("Samples are collinear, interpolating along the scan line");
        }
        Ok(field)
    }

    /// One pass of the loop minus the yield: liveness, then the flag, then
    /// maybe a refresh.
    pub fn tick<S: RenderSink>(&mut self, sink: &mut S) -> Tick {
        if self.state == RefreshState::Closed || !sink.is_open() {
            self.state = RefreshState::Closed;
            return Tick::Closed;
        }
        // Clear before reloading: a change landing mid-refresh re-arms the
        // flag for the next tick.
        if !self.flag.take() {
            return Tick::Idle;
        }
        info!("File changed: {}", self.path.display());
        match self.refresh(sink) {
            Ok(()) => Tick::Refreshed,
            Err(e) => {
                self.report(&e);
                Tick::Skipped
            }
        }
    }

    /// Initial refresh, then tick + pump until the display closes. The
    /// notifier is stopped on the way out, error or not.
    pub fn run<S: RenderSink>(&mut self, sink: &mut S, notifier: ChangeNotifier) -> Result<()> {
        info!(
            "Watching file: {}. Close with q, Esc or Ctrl+C.",
            self.path.display()
        );
        if let Err(e) = self.refresh(sink) {
            self.report(&e);
        }

        let result = loop {
            if self.tick(sink) == Tick::Closed {
                break Ok(());
            }
            if let Err(e) = sink.pump(self.interval) {
                break Err(e);
            }
        };

        notifier.stop();
        self.state = RefreshState::Closed;
        info!("Stopped after {} refreshes", self.refreshes());
        result
    }

    fn report(&self, err: &RefreshError) {
        match err {
            RefreshError::Load(e) => {
                warn!("Failed to read or parse {}: {e}", self.path.display())
            }
            RefreshError::Interpolate(e) => warn!("{e}"),
        }
    }
}
