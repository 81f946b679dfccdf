//! Workspace orchestrator.
//!
//! # Responsibility
//! - Own the decrypted working copy between saves.
//! - Persist the vault on every mutation and reconcile reminders after
//!   every change to the live note set.
//!
//! # Invariants
//! - Mutating operations require the Unlocked state.
//! - Every content mutation stamps `updated_at` and re-encrypts the vault.
//! - The passphrase is held in zeroizing memory only while unlocked.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use zeroize::Zeroizing;

use crate::history::SnapshotStore;
use crate::model::note::{Note, NoteId};
use crate::model::now_epoch_ms;
use crate::prefs::{PreferenceStore, Preferences};
use crate::reminder::{Clock, NotificationSink, ReminderError, ReminderScheduler};
use crate::store::KeyValueStore;
use crate::transfer::{export_json, merge_import, parse_import, TransferError};
use crate::vault::crypto::KdfParams;
use crate::vault::{VaultError, VaultPayload, VaultStore};

/// Service error for workspace use-cases.
#[derive(Debug)]
pub enum WorkspaceError {
    /// Operation requires an unlocked vault.
    Locked,
    /// Target note does not exist in the expected collection.
    NoteNotFound(NoteId),
    /// Vault-layer failure.
    Vault(VaultError),
    /// Reminder input rejected.
    Reminder(ReminderError),
    /// Import document rejected.
    Transfer(TransferError),
}

impl Display for WorkspaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "vault is locked"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Vault(err) => write!(f, "{err}"),
            Self::Reminder(err) => write!(f, "{err}"),
            Self::Transfer(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Vault(err) => Some(err),
            Self::Reminder(err) => Some(err),
            Self::Transfer(err) => Some(err),
            Self::Locked | Self::NoteNotFound(_) => None,
        }
    }
}

impl From<VaultError> for WorkspaceError {
    fn from(value: VaultError) -> Self {
        Self::Vault(value)
    }
}

impl From<ReminderError> for WorkspaceError {
    fn from(value: ReminderError) -> Self {
        Self::Reminder(value)
    }
}

impl From<TransferError> for WorkspaceError {
    fn from(value: TransferError) -> Self {
        Self::Transfer(value)
    }
}

/// Thin orchestrator over the vault, reminder, history and prefs stores.
///
/// All components borrow one backing key-value store; the workspace holds
/// the decrypted working copy and is the source of truth between saves.
pub struct Workspace<'s, S: KeyValueStore, C: Clock, N: NotificationSink> {
    vault: VaultStore<&'s S>,
    reminders: ReminderScheduler<&'s S, C, N>,
    history: SnapshotStore<&'s S>,
    prefs: PreferenceStore<&'s S>,
    payload: Option<VaultPayload>,
    passphrase: Option<Zeroizing<String>>,
}

impl<'s, S: KeyValueStore, C: Clock, N: NotificationSink> Workspace<'s, S, C, N> {
    pub fn new(store: &'s S, clock: C, sink: N) -> Self {
        Self {
            vault: VaultStore::new(store),
            reminders: ReminderScheduler::new(store, clock, sink),
            history: SnapshotStore::new(store),
            prefs: PreferenceStore::new(store),
            payload: None,
            passphrase: None,
        }
    }

    /// Like `new`, with KDF tuning overridden. Intended for tests, where
    /// full-strength derivation on every save makes suites needlessly slow.
    pub fn with_kdf_params(store: &'s S, clock: C, sink: N, kdf_params: KdfParams) -> Self {
        Self {
            vault: VaultStore::with_kdf_params(store, kdf_params),
            reminders: ReminderScheduler::new(store, clock, sink),
            history: SnapshotStore::new(store),
            prefs: PreferenceStore::new(store),
            payload: None,
            passphrase: None,
        }
    }

    /// Unlocks the vault and reconciles reminders against the live notes.
    ///
    /// Returns whether this unlock performed the legacy migration.
    pub fn unlock(&mut self, passphrase: &str) -> Result<bool, WorkspaceError> {
        let outcome = self.vault.unlock(passphrase)?;
        self.payload = Some(outcome.payload);
        self.passphrase = Some(Zeroizing::new(passphrase.to_string()));
        self.reconcile_reminders();
        Ok(outcome.migrated)
    }

    /// Discards the key, working copy and passphrase. In-memory only; all
    /// mutations were persisted when they happened, so nothing is lost.
    pub fn lock(&mut self) {
        self.vault.lock();
        self.payload = None;
        self.passphrase = None;
    }

    pub fn is_unlocked(&self) -> bool {
        self.payload.is_some()
    }

    pub fn active_notes(&self) -> Result<&[Note], WorkspaceError> {
        Ok(&self.working_copy()?.active_notes)
    }

    pub fn trashed_notes(&self) -> Result<&[Note], WorkspaceError> {
        Ok(&self.working_copy()?.trashed_notes)
    }

    /// Creates a note at the top of the active collection.
    pub fn create_note(
        &mut self,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Note, WorkspaceError> {
        let note = Note::new(title, body, now_epoch_ms());
        self.working_copy_mut()?.active_notes.insert(0, note.clone());
        self.history.add_snapshot(&note);
        self.persist()?;
        Ok(note)
    }

    /// Replaces note content fully, snapshotting the new revision.
    pub fn update_note(
        &mut self,
        note_id: &str,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Note, WorkspaceError> {
        let now = now_epoch_ms();
        let title = title.into();
        let body = body.into();

        let updated = {
            let note = self.find_active_mut(note_id)?;
            note.title = title;
            note.body = body;
            note.touch(now);
            note.clone()
        };

        self.history.add_snapshot(&updated);
        self.persist()?;
        Ok(updated)
    }

    /// Atomically replaces the full tag set for one note.
    pub fn set_note_tags(
        &mut self,
        note_id: &str,
        tags: &[String],
    ) -> Result<Note, WorkspaceError> {
        let now = now_epoch_ms();
        let updated = {
            let note = self.find_active_mut(note_id)?;
            note.set_tags(tags, now);
            note.clone()
        };
        self.persist()?;
        Ok(updated)
    }

    pub fn set_pinned(&mut self, note_id: &str, pinned: bool) -> Result<Note, WorkspaceError> {
        let now = now_epoch_ms();
        let updated = {
            let note = self.find_active_mut(note_id)?;
            note.pinned = pinned;
            note.touch(now);
            note.clone()
        };
        self.persist()?;
        Ok(updated)
    }

    /// Schedules (or replaces) the reminder for a note.
    pub fn set_reminder(&mut self, note_id: &str, remind_at: i64) -> Result<(), WorkspaceError> {
        let snapshot = {
            let note = self.find_active_mut(note_id)?;
            note.clone()
        };
        self.reminders.schedule(&snapshot, remind_at)?;

        let now = now_epoch_ms();
        let note = self.find_active_mut(note_id)?;
        note.reminder_at = Some(remind_at);
        note.touch(now);
        self.persist()
    }

    /// Cancels any reminder for a note. Idempotent.
    pub fn clear_reminder(&mut self, note_id: &str) -> Result<(), WorkspaceError> {
        self.reminders.cancel(note_id);
        if let Ok(note) = self.find_active_mut(note_id) {
            note.reminder_at = None;
        }
        self.persist()
    }

    /// Fires due reminders cooperatively. Safe to call on any cadence.
    pub fn fire_due_reminders(&mut self) {
        self.reminders.fire_due();
    }

    /// Moves a note to trash, cancelling its reminder.
    pub fn trash_note(&mut self, note_id: &str) -> Result<(), WorkspaceError> {
        let now = now_epoch_ms();
        let payload = self.working_copy_mut()?;
        let position = payload
            .active_notes
            .iter()
            .position(|note| note.id == note_id)
            .ok_or_else(|| WorkspaceError::NoteNotFound(note_id.to_string()))?;

        let mut note = payload.active_notes.remove(position);
        note.soft_delete(now);
        note.reminder_at = None;
        payload.trashed_notes.insert(0, note);

        self.reminders.cancel(note_id);
        self.persist()?;
        self.reconcile_reminders();
        Ok(())
    }

    /// Restores a trashed note to the active collection.
    pub fn restore_note(&mut self, note_id: &str) -> Result<(), WorkspaceError> {
        let now = now_epoch_ms();
        let payload = self.working_copy_mut()?;
        let position = payload
            .trashed_notes
            .iter()
            .position(|note| note.id == note_id)
            .ok_or_else(|| WorkspaceError::NoteNotFound(note_id.to_string()))?;

        let mut note = payload.trashed_notes.remove(position);
        note.restore(now);
        payload.active_notes.insert(0, note);

        self.persist()
    }

    /// Permanently removes a trashed note.
    pub fn purge_note(&mut self, note_id: &str) -> Result<(), WorkspaceError> {
        let payload = self.working_copy_mut()?;
        let before = payload.trashed_notes.len();
        payload.trashed_notes.retain(|note| note.id != note_id);
        if payload.trashed_notes.len() == before {
            return Err(WorkspaceError::NoteNotFound(note_id.to_string()));
        }
        self.persist()
    }

    /// Serializes the working copy as a downloadable document.
    pub fn export(&self) -> Result<String, WorkspaceError> {
        let payload = self.working_copy()?;
        Ok(export_json(
            &payload.active_notes,
            &payload.trashed_notes,
            now_epoch_ms(),
        )?)
    }

    /// Merges an uploaded document into the working copy, incoming wins.
    pub fn import(&mut self, raw: &str) -> Result<(), WorkspaceError> {
        let incoming = parse_import(raw)?;
        let payload = self.working_copy_mut()?;
        merge_import(payload, incoming);
        self.persist()?;
        self.reconcile_reminders();
        Ok(())
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs.load()
    }

    pub fn set_preferences(&self, prefs: &Preferences) {
        self.prefs.save(prefs);
    }

    fn working_copy(&self) -> Result<&VaultPayload, WorkspaceError> {
        self.payload.as_ref().ok_or(WorkspaceError::Locked)
    }

    fn working_copy_mut(&mut self) -> Result<&mut VaultPayload, WorkspaceError> {
        self.payload.as_mut().ok_or(WorkspaceError::Locked)
    }

    fn find_active_mut(&mut self, note_id: &str) -> Result<&mut Note, WorkspaceError> {
        self.working_copy_mut()?
            .active_notes
            .iter_mut()
            .find(|note| note.id == note_id)
            .ok_or_else(|| WorkspaceError::NoteNotFound(note_id.to_string()))
    }

    fn persist(&mut self) -> Result<(), WorkspaceError> {
        let payload = self.payload.as_ref().ok_or(WorkspaceError::Locked)?;
        let passphrase = self.passphrase.as_ref().ok_or(WorkspaceError::Locked)?;
        self.vault
            .save(passphrase, payload)
            .map_err(WorkspaceError::Vault)
    }

    fn reconcile_reminders(&mut self) {
        let ids: BTreeSet<NoteId> = match &self.payload {
            Some(payload) => payload
                .active_notes
                .iter()
                .map(|note| note.id.clone())
                .collect(),
            None => BTreeSet::new(),
        };
        self.reminders.reschedule_all(&ids);
    }
}
