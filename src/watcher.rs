//! Directory watcher running on notify's own thread.

use std::{
    io,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use log::{debug, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// The watched file and the directory that has to be watched to see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    /// Canonical parent directory.
    pub dir: PathBuf,
    /// `dir` joined with the file name; what change events are compared to.
    pub file: PathBuf,
}

impl WatchTarget {
    /// The file itself may not exist yet, its directory must.
    pub fn resolve(path: &Path) -> io::Result<Self> {
        let absolute = std::path::absolute(path)?;
        let name = absolute.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} does not name a file", path.display()),
            )
        })?;
        let parent = absolute.parent().unwrap_or(Path::new("/"));
        let dir = parent.canonicalize()?;
        let file = dir.join(name);
        Ok(Self { dir, file })
    }
}

/// Forwards every modification inside one directory to a callback.
///
/// Paths are not filtered beyond "lives directly in the directory"; picking
/// out the target file is the callback's job.
pub struct ChangeNotifier {
    watcher: RecommendedWatcher,
    // false once stopped; callbacks run under the read lock
    open: Arc<RwLock<bool>>,
}

impl ChangeNotifier {
    pub fn watch<F>(dir: &Path, on_change: F) -> notify::Result<Self>
    where
        F: Fn(&Path) + Send + 'static,
    {
        let open = Arc::new(RwLock::new(true));
        let gate = Arc::clone(&open);
        let watched = dir.to_path_buf();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!("File watcher error: {e}");
                    return;
                }
            };
            if !is_modification(&event.kind) {
                return;
            }
            let open = gate.read().unwrap_or_else(PoisonError::into_inner);
            if !*open {
                return;
            }
            for path in &event.paths {
                if path.parent() == Some(watched.as_path()) {
                    on_change(path);
                }
            }
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        debug!("Watching directory {}", dir.display());

        Ok(Self { watcher, open })
    }

    /// No callback runs once this returns. Dropping the watcher shuts its
    /// event thread down.
    pub fn stop(self) {
        *self.open.write().unwrap_or_else(PoisonError::into_inner) = false;
        drop(self.watcher);
        debug!("File watcher stopped");
    }
}

fn is_modification(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Modify(_) | EventKind::Create(_))
}
