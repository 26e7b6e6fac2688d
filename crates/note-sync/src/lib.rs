//! note-sync: auto-save and remote-change polling for a plain-text note.
//!
//! This crate provides:
//! - The `Note` model and 26-character `NoteId`
//! - `RemoteStore` and `DisplaySurface` trait abstractions
//! - `ScheduledTask`, a single-owner cancellable timer
//! - `SyncController`, which debounces edits into saves and reloads the note
//!   when a newer version shows up remotely

pub mod controller;
pub mod display;
pub mod memory;
pub mod note;
pub mod store;
pub mod timer;

pub use controller::{ControllerHandle, Session, SyncConfig, SyncController, SyncError};
pub use display::{DisplaySurface, Notification, NotificationKind, RecordingSurface, SaveState};
pub use memory::InMemoryStore;
pub use note::{EncryptionMode, Note, NoteId, NoteIdError, NoteMetadata};
pub use store::{RemoteStore, StoreError};
pub use timer::ScheduledTask;
