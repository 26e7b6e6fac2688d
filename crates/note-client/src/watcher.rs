//! Watches the local note file for edits.
//!
//! Uses notify-debouncer-mini so an editor's save (often several writes or a
//! rename-over) shows up as a single event.

use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Debounce period for raw filesystem events.
pub const WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// File event from the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    /// File was created or modified
    Modified,
    /// File was deleted or renamed away
    Removed,
}

/// Last seen mtime, to drop events that did not change the file.
type MtimeCache = Arc<Mutex<Option<SystemTime>>>;

/// Watches a single file.
///
/// The parent directory is watched rather than the file itself, since many
/// editors save by writing a temp file and renaming it over the original.
pub struct FileWatcher {
    file_path: PathBuf,
    /// Debouncer handle (must keep alive)
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    event_rx: mpsc::UnboundedReceiver<FileEvent>,
}

impl FileWatcher {
    pub fn new(file_path: &Path) -> Result<Self> {
        let file_name = file_path
            .file_name()
            .with_context(|| format!("{} is not a file path", file_path.display()))?
            .to_os_string();
        let parent = match file_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        // On macOS, /var/folders/... is really /private/var/folders/..., and
        // FSEvents reports the real path.
        let parent = parent.canonicalize().unwrap_or(parent);
        let file_path = parent.join(&file_name);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mtime_cache: MtimeCache = Arc::new(Mutex::new(current_mtime(&file_path)));
        let watched = file_path.clone();

        let mut debouncer = new_debouncer(
            WATCH_DEBOUNCE,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    let touched = events
                        .iter()
                        .any(|event| event.path.file_name() == Some(file_name.as_os_str()));
                    if !touched {
                        return;
                    }
                    if let Some(file_event) = Self::process_event(&watched, &mtime_cache) {
                        // Receiver dropped means we are shutting down.
                        let _ = event_tx.send(file_event);
                    }
                }
                Err(e) => {
                    error!("File watcher error: {}", e);
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", parent.display()))?;

        Ok(Self {
            file_path,
            _debouncer: debouncer,
            event_rx,
        })
    }

    fn process_event(path: &Path, mtime_cache: &MtimeCache) -> Option<FileEvent> {
        let mut cache = mtime_cache.lock().unwrap_or_else(|e| e.into_inner());

        if !path.exists() {
            cache.take();
            debug!("Note file removed: {}", path.display());
            return Some(FileEvent::Removed);
        }

        let mtime = current_mtime(path);
        if mtime.is_some() && *cache == mtime {
            // Spurious event, nothing was written
            return None;
        }
        *cache = mtime;

        debug!("Note file modified: {}", path.display());
        Some(FileEvent::Modified)
    }

    /// Get the receiver for file events.
    pub fn event_rx(&mut self) -> &mut mpsc::UnboundedReceiver<FileEvent> {
        &mut self.event_rx
    }

    /// The watched file, with its directory canonicalized.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn current_mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
