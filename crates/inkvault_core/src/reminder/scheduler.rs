//! Reminder scheduler instance.
//!
//! # Responsibility
//! - Own the in-memory map of armed timers keyed by note id.
//! - Drive cooperative firing against an injected clock.
//!
//! # Invariants
//! - Scheduling state lives in an owned instance, never module-level globals.
//! - `cancel` is idempotent.
//! - Timers are re-armed after reconciliation only when notification
//!   permission is currently granted.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::note::{Note, NoteId};
use crate::model::now_epoch_ms;
use crate::store::{reminders_key, KeyValueStore};

const PREVIEW_MAX_CHARS: usize = 100;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Browser-style notification permission as consumed by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPermission {
    Unsupported,
    Default,
    Denied,
    Granted,
}

/// Time source seam; production uses `SystemClock`, tests inject their own.
pub trait Clock {
    fn now_epoch_ms(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        now_epoch_ms()
    }
}

/// Display seam for the platform notification primitive.
pub trait NotificationSink {
    fn permission(&self) -> NotificationPermission;
    /// Surfaces one notification. Only called when permission is granted.
    fn display(&self, reminder: &Reminder);
}

/// Persisted reminder entry. Title and preview are snapshots taken at
/// scheduling time so a fired notification renders without the note corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub note_id: NoteId,
    pub remind_at: i64,
    pub title: String,
    pub preview: String,
}

/// Scheduling error for caller input.
#[derive(Debug)]
pub enum ReminderError {
    /// Requested time is in the past (or not after now).
    InvalidTime(i64),
}

impl Display for ReminderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTime(at) => write!(f, "invalid reminder time: {at}"),
        }
    }
}

impl Error for ReminderError {}

/// Owned scheduler over one backing store, clock and notification sink.
pub struct ReminderScheduler<S: KeyValueStore, C: Clock, N: NotificationSink> {
    store: S,
    clock: C,
    sink: N,
    /// note id -> fire time, for entries armed in this process.
    armed: BTreeMap<NoteId, i64>,
}

impl<S: KeyValueStore, C: Clock, N: NotificationSink> ReminderScheduler<S, C, N> {
    pub fn new(store: S, clock: C, sink: N) -> Self {
        Self {
            store,
            clock,
            sink,
            armed: BTreeMap::new(),
        }
    }

    /// Schedules (or replaces) the reminder for `note`.
    ///
    /// Rejects times not strictly in the future with `InvalidTime` and in
    /// that case performs no persistence and no arming.
    pub fn schedule(&mut self, note: &Note, remind_at: i64) -> Result<(), ReminderError> {
        let now = self.clock.now_epoch_ms();
        if remind_at <= now {
            return Err(ReminderError::InvalidTime(remind_at));
        }

        let reminder = Reminder {
            note_id: note.id.clone(),
            remind_at,
            title: note.title.clone(),
            preview: preview_snippet(&note.body),
        };

        self.armed.remove(&note.id);

        let mut map = self.load_map();
        map.insert(note.id.clone(), reminder);
        self.persist_map(&map);

        self.armed.insert(note.id.clone(), remind_at);
        Ok(())
    }

    /// Clears the timer and persisted entry for `note_id`. Idempotent.
    pub fn cancel(&mut self, note_id: &str) {
        self.armed.remove(note_id);

        let mut map = self.load_map();
        if map.remove(note_id).is_some() {
            self.persist_map(&map);
        }
    }

    /// Fires every armed reminder whose time has come.
    ///
    /// The persisted entry is removed *before* the notification is surfaced,
    /// so a reload immediately after firing cannot re-fire it. Display is
    /// skipped unless permission is granted.
    pub fn fire_due(&mut self) {
        let now = self.clock.now_epoch_ms();
        let due: Vec<NoteId> = self
            .armed
            .iter()
            .filter(|(_, fire_at)| **fire_at <= now)
            .map(|(note_id, _)| note_id.clone())
            .collect();

        if due.is_empty() {
            return;
        }

        let mut map = self.load_map();
        for note_id in due {
            self.armed.remove(&note_id);
            let Some(reminder) = map.remove(&note_id) else {
                continue;
            };
            self.persist_map(&map);
            if self.sink.permission() == NotificationPermission::Granted {
                self.sink.display(&reminder);
            }
        }
    }

    /// Reconciles persisted reminders against the live note set.
    ///
    /// Drops entries whose note no longer exists and entries already in the
    /// past, persists the cleaned map, then re-arms the remainder. Re-arming
    /// happens only when notification permission is currently granted, so
    /// entries survive in storage until permission arrives.
    pub fn reschedule_all(&mut self, existing_note_ids: &BTreeSet<NoteId>) {
        self.armed.clear();

        let now = self.clock.now_epoch_ms();
        let mut map = self.load_map();
        map.retain(|note_id, reminder| {
            existing_note_ids.contains(note_id) && reminder.remind_at > now
        });
        self.persist_map(&map);

        if self.sink.permission() == NotificationPermission::Granted {
            for (note_id, reminder) in &map {
                self.armed.insert(note_id.clone(), reminder.remind_at);
            }
        }
    }

    /// Note ids with an armed in-process timer. Intended for assertions.
    pub fn armed_note_ids(&self) -> Vec<NoteId> {
        self.armed.keys().cloned().collect()
    }

    fn load_map(&self) -> BTreeMap<NoteId, Reminder> {
        let raw = match self.store.get(&reminders_key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeMap::new(),
            Err(err) => {
                warn!("event=reminder_load module=reminder status=error error={err}");
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(err) => {
                warn!("event=reminder_load module=reminder status=error error={err}");
                BTreeMap::new()
            }
        }
    }

    fn persist_map(&self, map: &BTreeMap<NoteId, Reminder>) {
        let raw = match serde_json::to_string(map) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("event=reminder_persist module=reminder status=error error={err}");
                return;
            }
        };
        if let Err(err) = self.store.put(&reminders_key(), &raw) {
            warn!("event=reminder_persist module=reminder status=error error={err}");
        }
    }
}

/// Derives the short body snippet stored with a reminder.
pub fn preview_snippet(body: &str) -> String {
    let normalized = WHITESPACE_RE.replace_all(body, " ");
    normalized.trim().chars().take(PREVIEW_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::preview_snippet;

    #[test]
    fn preview_collapses_whitespace_and_limits_length() {
        let snippet = preview_snippet("  line one\n\n\tline   two  ");
        assert_eq!(snippet, "line one line two");

        let long = "x".repeat(500);
        assert_eq!(preview_snippet(&long).chars().count(), 100);
    }
}
