//! DisplaySurface trait: whatever shows the note to the user.
//!
//! Implementations:
//! - `FileSurface` (in note-client) - a plain text file on disk
//! - `RecordingSurface` - for testing

use crate::note::NoteId;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Transient message shown to the user for a fixed time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    /// How long the surface should keep the message visible.
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// The note was changed elsewhere and has been reloaded.
    RemoteUpdate,
}

/// Outcome of the most recent save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveState {
    Saved,
    Failed(String),
}

#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Replace the displayed note content.
    async fn show_content(&self, content: &str);

    /// Show the identifier of the current note.
    async fn show_note_id(&self, id: &NoteId);

    /// Show a transient notification.
    async fn notify(&self, notification: Notification);

    /// Report whether local edits are safely persisted.
    async fn save_state(&self, state: SaveState);
}

#[async_trait]
impl<D: DisplaySurface + ?Sized> DisplaySurface for std::sync::Arc<D> {
    async fn show_content(&self, content: &str) {
        (**self).show_content(content).await
    }

    async fn show_note_id(&self, id: &NoteId) {
        (**self).show_note_id(id).await
    }

    async fn notify(&self, notification: Notification) {
        (**self).notify(notification).await
    }

    async fn save_state(&self, state: SaveState) {
        (**self).save_state(state).await
    }
}

/// Something the controller asked a surface to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Content(String),
    NoteId(NoteId),
    Notification(Notification),
    SaveState(SaveState),
}

/// Surface that remembers everything it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<DisplayEvent>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Last content shown, if any.
    pub fn content(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            DisplayEvent::Content(c) => Some(c),
            _ => None,
        })
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::Notification(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn save_states(&self) -> Vec<SaveState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::SaveState(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn note_ids(&self) -> Vec<NoteId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::NoteId(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: DisplayEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

#[async_trait]
impl DisplaySurface for RecordingSurface {
    async fn show_content(&self, content: &str) {
        self.push(DisplayEvent::Content(content.to_string()));
    }

    async fn show_note_id(&self, id: &NoteId) {
        self.push(DisplayEvent::NoteId(id.clone()));
    }

    async fn notify(&self, notification: Notification) {
        self.push(DisplayEvent::Notification(notification));
    }

    async fn save_state(&self, state: SaveState) {
        self.push(DisplayEvent::SaveState(state));
    }
}
