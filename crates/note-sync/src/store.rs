//! RemoteStore trait: where notes actually live.
//!
//! Implementations:
//! - `HttpStore` (in note-client) - the notes REST API over reqwest
//! - `InMemoryStore` - for testing

use crate::note::{Note, NoteId, NoteMetadata};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Note not found: {0}")]
    NotFound(NoteId),

    /// The store answered with a non-success status other than 404.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A success response whose body could not be understood.
    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence API the sync controller depends on.
///
/// A successful write's returned `modified_at` never goes backwards relative
/// to earlier writes to the same note. Nothing else about ordering is assumed.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create a note. The store assigns the ID and `modified_at`.
    async fn create(&self, content: &str) -> Result<Note>;

    /// Replace the content of an existing note.
    async fn update(&self, id: &NoteId, content: &str) -> Result<Note>;

    /// Fetch a note including its content.
    async fn fetch(&self, id: &NoteId) -> Result<Note>;

    /// Fetch only the metadata (at least `modified_at`) of a note.
    async fn fetch_metadata(&self, id: &NoteId) -> Result<NoteMetadata>;
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteStore for std::sync::Arc<S> {
    async fn create(&self, content: &str) -> Result<Note> {
        (**self).create(content).await
    }

    async fn update(&self, id: &NoteId, content: &str) -> Result<Note> {
        (**self).update(id, content).await
    }

    async fn fetch(&self, id: &NoteId) -> Result<Note> {
        (**self).fetch(id).await
    }

    async fn fetch_metadata(&self, id: &NoteId) -> Result<NoteMetadata> {
        (**self).fetch_metadata(id).await
    }
}
