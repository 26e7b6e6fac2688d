//! In-memory RemoteStore for testing.
//!
//! Records every call so tests can assert on exactly which requests the
//! controller made, and can play the part of "another client" editing a note.

use crate::note::{EncryptionMode, Note, NoteId, NoteMetadata, NOTE_ID_LEN};
use crate::store::{RemoteStore, Result, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::RwLock;

/// Logical clock start (2023-11-14T22:13:20Z), one second per write.
const CLOCK_BASE_MS: i64 = 1_700_000_000_000;

/// A request the store received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Create(String),
    Update(NoteId, String),
    Fetch(NoteId),
    FetchMetadata(NoteId),
}

pub struct InMemoryStore {
    notes: RwLock<HashMap<NoteId, Note>>,
    calls: RwLock<Vec<StoreCall>>,
    clock: AtomicI64,
    fail_writes: AtomicBool,
    fail_fetches: AtomicBool,
    offline: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            notes: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
            clock: AtomicI64::new(0),
            fail_writes: AtomicBool::new(false),
            fail_fetches: AtomicBool::new(false),
            offline: AtomicBool::new(false),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a note without recording a call.
    pub fn insert(&self, content: &str) -> Note {
        let note = Note {
            id: Self::generate_id(),
            content: content.to_string(),
            modified_at: self.tick(),
            created_at: None,
            encryption_mode: Some(EncryptionMode::Public),
            requires_password: Some(false),
        };
        self.write_notes().insert(note.id.clone(), note.clone());
        note
    }

    /// Simulate another client saving the note. Not recorded as a call.
    pub fn remote_edit(&self, id: &NoteId, content: &str) -> Option<Note> {
        let modified_at = self.tick();
        let mut notes = self.write_notes();
        let note = notes.get_mut(id)?;
        note.content = content.to_string();
        note.modified_at = modified_at;
        Some(note.clone())
    }

    /// Force a note's `modified_at`, e.g. to test a clock that went backwards.
    pub fn set_modified_at(&self, id: &NoteId, modified_at: DateTime<Utc>) {
        if let Some(note) = self.write_notes().get_mut(id) {
            note.modified_at = modified_at;
        }
    }

    pub fn get(&self, id: &NoteId) -> Option<Note> {
        self.notes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Make `create`/`update` fail with a 500.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `fetch` fail with a 503 while metadata still answers.
    pub fn set_fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Make every request fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_calls(&self) {
        self.calls.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Create(_)))
    }

    pub fn update_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Update(..)))
    }

    pub fn fetch_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Fetch(_)))
    }

    pub fn metadata_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::FetchMetadata(_)))
    }

    fn count(&self, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| pred(c))
            .count()
    }

    fn record(&self, call: StoreCall) -> Result<()> {
        self.calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Network("store is offline".into()));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Server {
                status: 500,
                message: "write rejected".into(),
            });
        }
        Ok(())
    }

    fn write_notes(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<NoteId, Note>> {
        self.notes.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Advance the logical clock and return the new timestamp.
    fn tick(&self) -> DateTime<Utc> {
        let n = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        DateTime::from_timestamp_millis(CLOCK_BASE_MS + n * 1000).unwrap_or_default()
    }

    fn generate_id() -> NoteId {
        let raw: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(NOTE_ID_LEN)
            .map(char::from)
            .collect();
        NoteId::from_generated(raw)
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn create(&self, content: &str) -> Result<Note> {
        self.record(StoreCall::Create(content.to_string()))?;
        self.check_writable()?;
        let mut note = self.insert(content);
        note.created_at = Some(note.modified_at);
        self.write_notes().insert(note.id.clone(), note.clone());
        Ok(note)
    }

    async fn update(&self, id: &NoteId, content: &str) -> Result<Note> {
        self.record(StoreCall::Update(id.clone(), content.to_string()))?;
        self.check_writable()?;
        let modified_at = self.tick();
        let mut notes = self.write_notes();
        let note = notes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        note.content = content.to_string();
        note.modified_at = modified_at;
        Ok(note.clone())
    }

    async fn fetch(&self, id: &NoteId) -> Result<Note> {
        self.record(StoreCall::Fetch(id.clone()))?;
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(StoreError::Server {
                status: 503,
                message: "fetch unavailable".into(),
            });
        }
        self.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn fetch_metadata(&self, id: &NoteId) -> Result<NoteMetadata> {
        self.record(StoreCall::FetchMetadata(id.clone()))?;
        self.get(id)
            .map(|n| n.metadata())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}
