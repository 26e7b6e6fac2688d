//! `DisplaySurface` backed by a plain text file.
//!
//! The file is the editor: note content is written to it, and everything else
//! (note id, notifications, save state) goes to the log and a status line on
//! stderr.

use async_trait::async_trait;
use note_sync::{DisplaySurface, NoteId, Notification, NotificationKind, SaveState};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, warn};

pub struct FileSurface {
    path: PathBuf,
}

impl FileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file content. A missing file reads as empty.
    pub async fn read_content(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    async fn write_content(&self, content: &str) -> io::Result<()> {
        // Create parent directories if needed
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&self.path, content).await
    }
}

#[async_trait]
impl DisplaySurface for FileSurface {
    async fn show_content(&self, content: &str) {
        if let Err(e) = self.write_content(content).await {
            error!("Failed to write {}: {}", self.path.display(), e);
        }
    }

    async fn show_note_id(&self, id: &NoteId) {
        info!("Editing note {}", id);
        eprintln!("note: {}", id);
    }

    async fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::RemoteUpdate => {
                info!("Note was updated remotely, reloaded");
                eprintln!("updated: note was changed elsewhere and has been reloaded");
            }
        }
    }

    async fn save_state(&self, state: SaveState) {
        match state {
            SaveState::Saved => {
                info!("All changes saved");
                eprintln!("saved");
            }
            SaveState::Failed(reason) => {
                warn!("Changes not saved: {}", reason);
                eprintln!("save failed: {} (will retry on next edit)", reason);
            }
        }
    }
}
