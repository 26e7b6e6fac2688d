//! Note: the remote-owned text document and its identifier.
//!
//! Notes are owned by the remote store. The client only ever holds a copy of
//! the content and the `modified_at` stamp of the last version it saw.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Length of a note identifier (the server issues ULIDs).
pub const NOTE_ID_LEN: usize = 26;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteIdError {
    #[error("Invalid note ID: expected 26 alphanumeric chars, got {0:?}")]
    InvalidFormat(String),
    #[error("No note ID found in {0:?}")]
    NotFoundInPath(String),
}

/// Identifier of a note in the remote store.
///
/// Always exactly 26 ASCII alphanumeric characters.
///
/// # Examples
/// ```
/// use note_sync::NoteId;
///
/// let id: NoteId = "01ARZ3NDEKTSV4RRFFQ69G5FAV".parse().unwrap();
/// assert_eq!(id.as_str(), "01ARZ3NDEKTSV4RRFFQ69G5FAV");
///
/// let from_url = NoteId::find_in_path("https://notes.example.com/01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap();
/// assert_eq!(from_url, id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteId(String);

impl NoteId {
    /// Whether `s` has the shape of a note identifier.
    pub fn is_valid(s: &str) -> bool {
        s.len() == NOTE_ID_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric())
    }

    /// Recover a note ID from a path or URL.
    ///
    /// Scans `/`-separated segments and returns the first one that is a valid
    /// ID. Query string and fragment are ignored. A bare ID is accepted too.
    pub fn find_in_path(path: &str) -> Result<Self, NoteIdError> {
        let without_query = path.split(['?', '#']).next().unwrap_or_default();
        without_query
            .split('/')
            .find(|part| Self::is_valid(part))
            .map(|part| Self(part.to_string()))
            .ok_or_else(|| NoteIdError::NotFoundInPath(path.to_string()))
    }

    /// Wrap an ID produced by a generator that only emits valid IDs.
    pub(crate) fn from_generated(raw: String) -> Self {
        debug_assert!(Self::is_valid(&raw));
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = NoteIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(NoteIdError::InvalidFormat(s.to_string()))
        }
    }
}

impl AsRef<str> for NoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NoteId {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NoteId {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// How the server protects a note's content at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncryptionMode {
    Public,
    Private,
    PasswordShared,
}

/// A note as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    #[serde(default)]
    pub content: String,
    /// Logical clock for staleness checks; bumped by the store on every write.
    pub modified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_mode: Option<EncryptionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_password: Option<bool>,
}

impl Note {
    /// The metadata view of this note.
    pub fn metadata(&self) -> NoteMetadata {
        NoteMetadata {
            id: Some(self.id.clone()),
            modified_at: self.modified_at,
            created_at: self.created_at,
            encryption_mode: self.encryption_mode,
            requires_password: self.requires_password,
        }
    }
}

/// Lightweight note information without content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NoteId>,
    pub modified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_mode: Option<EncryptionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_password: Option<bool>,
}
