//! Note sync controller.
//!
//! Owns the identity and staleness state of the one note being edited and is
//! the only thing that talks to the `RemoteStore`:
//! - debounces local edits into a single write per burst
//! - creates the note on first save, updates it afterwards
//! - polls note metadata and reloads when someone else saved a newer version
//!
//! The controller runs as a single task (`run`) fed by a `ControllerHandle`.
//! Its own timers post commands back into the same queue, so every state
//! change happens on one logical thread. Timer commands carry the session
//! epoch they were scheduled under and are dropped once the current note
//! has been switched.

use crate::display::{DisplaySurface, Notification, NotificationKind, SaveState};
use crate::note::{Note, NoteId};
use crate::store::{RemoteStore, StoreError};
use crate::timer::ScheduledTask;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Quiet period after the last edit before it is persisted.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(1000);
/// How often the current note's metadata is checked for remote changes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5000);
/// How long the "updated" notification stays visible.
pub const NOTIFICATION_DURATION: Duration = Duration::from_millis(2000);

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Sync controller has shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Timing of the controller's scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub debounce: Duration,
    pub poll_interval: Duration,
    pub notification_duration: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_INTERVAL,
            poll_interval: POLL_INTERVAL,
            notification_duration: NOTIFICATION_DURATION,
        }
    }
}

/// What the controller knows about the current note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Unset until the first create succeeds.
    pub note_id: Option<NoteId>,
    /// Content known to be persisted; equal content is never written again.
    pub last_saved_content: String,
    /// Baseline for staleness checks.
    pub modified_at: Option<DateTime<Utc>>,
}

/// Work items processed by the controller task.
#[derive(Debug)]
enum Command {
    Edit(String),
    Persist { epoch: u64, seq: u64, content: String },
    Poll { epoch: u64 },
    Load(NoteId, oneshot::Sender<Result<Note>>),
    CreateNew(oneshot::Sender<Result<Note>>),
    CheckRemote(oneshot::Sender<Result<bool>>),
    Session(oneshot::Sender<Session>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable entry point into a running controller.
///
/// Edits are fire-and-forget; note switches wait for the controller's answer.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ControllerHandle {
    /// Report the full current content after a local edit.
    pub fn request_save(&self, content: impl Into<String>) -> Result<()> {
        self.tx
            .send(Command::Edit(content.into()))
            .map_err(|_| SyncError::Closed)
    }

    /// Switch to the note with `id`, falling back to a new note if it is gone.
    pub async fn load(&self, id: NoteId) -> Result<Note> {
        self.call(|reply| Command::Load(id, reply)).await?
    }

    /// Switch to a brand-new empty note.
    pub async fn create_new(&self) -> Result<Note> {
        self.call(Command::CreateNew).await?
    }

    /// Run one staleness check now instead of waiting for the next poll.
    pub async fn check_for_remote_update(&self) -> Result<bool> {
        self.call(Command::CheckRemote).await?
    }

    /// Snapshot of the controller's session state.
    pub async fn session(&self) -> Result<Session> {
        self.call(Command::Session).await
    }

    /// Persist any pending edit, stop all timers and end the controller task.
    pub async fn shutdown(&self) -> Result<()> {
        self.call(Command::Shutdown).await
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(make(reply_tx)).map_err(|_| SyncError::Closed)?;
        reply_rx.await.map_err(|_| SyncError::Closed)
    }
}

/// The sync controller. Construct with [`SyncController::new`], then drive
/// it with [`SyncController::run`].
pub struct SyncController<S, D> {
    store: S,
    display: D,
    config: SyncConfig,
    session: Session,
    /// Bumped on every note switch; stale timer commands are discarded.
    epoch: u64,
    /// Bumped on every edit; only the newest debounced save may run.
    edit_seq: u64,
    /// Edit waiting for the debounce timer.
    pending_edit: Option<String>,
    last_save_state: Option<SaveState>,
    debounce: ScheduledTask,
    poll: ScheduledTask,
    /// Weak so the queue closes once every handle is gone.
    timer_tx: mpsc::WeakUnboundedSender<Command>,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl<S: RemoteStore, D: DisplaySurface> SyncController<S, D> {
    pub fn new(store: S, display: D, config: SyncConfig) -> (Self, ControllerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            store,
            display,
            config,
            session: Session::default(),
            epoch: 0,
            edit_seq: 0,
            pending_edit: None,
            last_save_state: None,
            debounce: ScheduledTask::new(),
            poll: ScheduledTask::new(),
            timer_tx: tx.downgrade(),
            rx,
        };
        (controller, ControllerHandle { tx })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_active()
    }

    pub fn has_pending_save(&self) -> bool {
        self.debounce.is_active()
    }

    /// Process commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            if let Command::Shutdown(reply) = command {
                self.shutdown().await;
                let _ = reply.send(());
                return;
            }
            self.handle(command).await;
        }
        debug!("All controller handles dropped, stopping");
        self.shutdown().await;
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Edit(content) => self.request_save(content),
            Command::Persist {
                epoch,
                seq,
                content,
            } => {
                if epoch != self.epoch {
                    warn!("Dropping save scheduled for a previous note");
                    return;
                }
                if seq != self.edit_seq {
                    debug!("Dropping superseded save");
                    return;
                }
                self.pending_edit = None;
                // Failures are reported to the display inside persist.
                let _ = self.persist(&content).await;
            }
            Command::Poll { epoch } => {
                if epoch != self.epoch {
                    debug!("Ignoring poll tick from a previous note");
                    return;
                }
                // Metadata and reload failures are logged inside the check.
                let _ = self.check_for_remote_update().await;
            }
            Command::Load(id, reply) => {
                let _ = reply.send(self.load(id).await);
            }
            Command::CreateNew(reply) => {
                let _ = reply.send(self.create_new().await);
            }
            Command::CheckRemote(reply) => {
                let _ = reply.send(self.check_for_remote_update().await);
            }
            Command::Session(reply) => {
                let _ = reply.send(self.session.clone());
            }
            Command::Shutdown(reply) => {
                self.shutdown().await;
                let _ = reply.send(());
            }
        }
    }

    /// Schedule `content` to be persisted once edits have been quiet for the
    /// debounce interval. Any earlier pending save is superseded.
    pub fn request_save(&mut self, content: String) {
        self.edit_seq += 1;
        self.pending_edit = Some(content.clone());

        let tx = self.timer_tx.clone();
        let (epoch, seq) = (self.epoch, self.edit_seq);
        self.debounce.schedule_once(self.config.debounce, move || {
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::Persist {
                    epoch,
                    seq,
                    content,
                });
            }
        });
    }

    /// Write `content` to the store unless it is already saved.
    ///
    /// Creates the note if there is none yet. Returns `Ok(None)` when the
    /// write was skipped. On failure the session is left untouched so the
    /// next edit retries.
    pub async fn persist(&mut self, content: &str) -> Result<Option<Note>> {
        if content == self.session.last_saved_content {
            debug!("Content unchanged, skipping save");
            return Ok(None);
        }

        let result = match &self.session.note_id {
            Some(id) => self.store.update(id, content).await,
            None => self.store.create(content).await,
        };

        match result {
            Ok(note) => {
                self.session.last_saved_content = content.to_string();
                self.session.modified_at = Some(note.modified_at);

                if self.session.note_id.is_none() {
                    info!("Created note {}", note.id);
                    self.session.note_id = Some(note.id.clone());
                    self.display.show_note_id(&note.id).await;
                    self.start_polling();
                } else {
                    debug!("Saved note {} ({} bytes)", note.id, content.len());
                }

                self.report_save(SaveState::Saved).await;
                Ok(Some(note))
            }
            Err(e) => {
                error!("Auto-save failed: {}", e);
                self.report_save(SaveState::Failed(e.to_string())).await;
                Err(e.into())
            }
        }
    }

    /// Make the note with `id` current.
    ///
    /// If it cannot be fetched a new note is created instead.
    pub async fn load(&mut self, id: NoteId) -> Result<Note> {
        self.stop_polling();
        self.begin_switch();

        match self.store.fetch(&id).await {
            Ok(note) => {
                info!("Loaded note {}", note.id);
                self.session = Session {
                    note_id: Some(note.id.clone()),
                    last_saved_content: note.content.clone(),
                    modified_at: Some(note.modified_at),
                };
                self.display.show_content(&note.content).await;
                self.display.show_note_id(&note.id).await;
                self.start_polling();
                Ok(note)
            }
            Err(StoreError::NotFound(_)) => {
                warn!("Note {} not found, creating new note", id);
                self.create_new().await
            }
            Err(e) => {
                warn!("Failed to load note {}: {}, creating new note instead", id, e);
                self.create_new().await
            }
        }
    }

    /// Make a new empty note current.
    pub async fn create_new(&mut self) -> Result<Note> {
        self.stop_polling();
        self.begin_switch();

        match self.store.create("").await {
            Ok(note) => {
                info!("Created new note {}", note.id);
                self.session = Session {
                    note_id: Some(note.id.clone()),
                    last_saved_content: String::new(),
                    modified_at: Some(note.modified_at),
                };
                self.display.show_content("").await;
                self.display.show_note_id(&note.id).await;
                self.start_polling();
                Ok(note)
            }
            Err(e) => {
                error!("Failed to create new note: {}", e);
                // Still on the previous note, if any.
                self.start_polling();
                Err(e.into())
            }
        }
    }

    /// Reload the note if the store has a strictly newer version.
    ///
    /// Returns whether a reload happened.
    pub async fn check_for_remote_update(&mut self) -> Result<bool> {
        let (Some(id), Some(local)) = (self.session.note_id.clone(), self.session.modified_at)
        else {
            return Ok(false);
        };

        let remote = match self.store.fetch_metadata(&id).await {
            Ok(meta) => meta.modified_at,
            Err(e) => {
                warn!("Failed to check for note updates: {}", e);
                return Err(e.into());
            }
        };

        if remote <= local {
            debug!("Note {} is up to date", id);
            return Ok(false);
        }

        info!("Note {} changed remotely ({} > {}), reloading", id, remote, local);
        self.reload(id).await?;
        self.display
            .notify(Notification {
                kind: NotificationKind::RemoteUpdate,
                duration: self.config.notification_duration,
            })
            .await;
        Ok(true)
    }

    /// Refresh the current note in place.
    ///
    /// Unlike `load` this is not a switch, so a pending edit is still saved
    /// once its debounce expires.
    async fn reload(&mut self, id: NoteId) -> Result<()> {
        match self.store.fetch(&id).await {
            Ok(note) => {
                self.session.last_saved_content = note.content.clone();
                self.session.modified_at = Some(note.modified_at);
                self.display.show_content(&note.content).await;
                if self.pending_edit.is_some() {
                    warn!(
                        "Local edit pending during reload of {}, it will be saved over the remote change",
                        id
                    );
                }
                Ok(())
            }
            Err(StoreError::NotFound(_)) => {
                warn!("Note {} disappeared remotely, creating new note", id);
                self.create_new().await.map(|_| ())
            }
            Err(e) => {
                warn!("Failed to reload note {}: {}", id, e);
                Err(e.into())
            }
        }
    }

    /// Start polling for remote changes, replacing any running poll timer.
    /// Does nothing while there is no current note.
    fn start_polling(&mut self) {
        if self.session.note_id.is_none() {
            return;
        }
        let tx = self.timer_tx.clone();
        let epoch = self.epoch;
        self.poll
            .schedule_every(self.config.poll_interval, move || match tx.upgrade() {
                Some(tx) => tx.send(Command::Poll { epoch }).is_ok(),
                None => false,
            });
    }

    fn stop_polling(&mut self) {
        self.poll.cancel();
    }

    /// Invalidate everything scheduled for the current note.
    fn begin_switch(&mut self) {
        self.epoch += 1;
        self.debounce.cancel();
        if self.pending_edit.take().is_some() {
            warn!("Discarding unsaved edit while switching notes");
        }
    }

    async fn report_save(&mut self, state: SaveState) {
        if self.last_save_state.as_ref() == Some(&state) {
            return;
        }
        self.last_save_state = Some(state.clone());
        self.display.save_state(state).await;
    }

    async fn shutdown(&mut self) {
        self.debounce.cancel();
        if let Some(content) = self.pending_edit.take() {
            info!("Saving pending edit before shutdown");
            let _ = self.persist(&content).await;
        }
        self.stop_polling();
    }
}
