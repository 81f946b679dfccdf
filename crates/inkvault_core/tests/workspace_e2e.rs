use inkvault_core::db::open_db;
use inkvault_core::store::reminders_key;
use inkvault_core::vault::crypto::KdfParams;
use inkvault_core::{
    Clock, KeyValueStore, MemoryKeyValueStore, NotificationPermission, NotificationSink, Reminder,
    SnapshotStore, SqliteKeyValueStore, VaultError, Workspace, WorkspaceError,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone)]
struct FakeClock {
    now: Rc<Cell<i64>>,
}

impl FakeClock {
    fn at(now: i64) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    fn advance(&self, delta: i64) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for FakeClock {
    fn now_epoch_ms(&self) -> i64 {
        self.now.get()
    }
}

#[derive(Clone)]
struct RecordingSink {
    displayed: Rc<RefCell<Vec<Reminder>>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            displayed: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn displayed_count(&self) -> usize {
        self.displayed.borrow().len()
    }
}

impl NotificationSink for RecordingSink {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn display(&self, reminder: &Reminder) {
        self.displayed.borrow_mut().push(reminder.clone());
    }
}

fn fast_params() -> KdfParams {
    KdfParams { iterations: 1_000 }
}

fn build_workspace<'s, S: KeyValueStore>(
    store: &'s S,
    clock: FakeClock,
    sink: RecordingSink,
) -> Workspace<'s, S, FakeClock, RecordingSink> {
    Workspace::with_kdf_params(store, clock, sink, fast_params())
}

#[test]
fn unlock_create_lock_unlock_roundtrip_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("vault.db")).unwrap();
    let store = SqliteKeyValueStore::try_new(&conn).unwrap();

    let clock = FakeClock::at(1_000_000);
    let mut workspace = build_workspace(&store, clock.clone(), RecordingSink::new());

    let migrated = workspace.unlock("correct horse").unwrap();
    assert!(!migrated);
    assert!(workspace.active_notes().unwrap().is_empty());
    assert!(workspace.trashed_notes().unwrap().is_empty());

    let created = workspace.create_note("Hi", "World").unwrap();
    workspace.lock();
    assert!(!workspace.is_unlocked());
    assert!(matches!(
        workspace.active_notes(),
        Err(WorkspaceError::Locked)
    ));

    // Fresh orchestrator over the same persisted store.
    let mut reopened = build_workspace(&store, clock, RecordingSink::new());
    assert!(matches!(
        reopened.unlock("wrong"),
        Err(WorkspaceError::Vault(VaultError::Authentication))
    ));

    reopened.unlock("correct horse").unwrap();
    let active = reopened.active_notes().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, created.id);
    assert_eq!(active[0].title, "Hi");
    assert_eq!(active[0].body, "World");
}

#[test]
fn reminder_fires_once_after_simulated_delay() {
    let store = MemoryKeyValueStore::new();
    let clock = FakeClock::at(100_000);
    let sink = RecordingSink::new();
    let mut workspace = build_workspace(&store, clock.clone(), sink.clone());

    workspace.unlock("correct horse").unwrap();
    let note = workspace.create_note("Hi", "World").unwrap();
    workspace
        .set_reminder(&note.id, clock.now_epoch_ms() + 5_000)
        .unwrap();

    workspace.fire_due_reminders();
    assert_eq!(sink.displayed_count(), 0);

    clock.advance(5_000);
    workspace.fire_due_reminders();
    assert_eq!(sink.displayed_count(), 1);
    assert_eq!(store.get(&reminders_key()).unwrap().as_deref(), Some("{}"));

    workspace.fire_due_reminders();
    assert_eq!(sink.displayed_count(), 1);
}

#[test]
fn set_reminder_rejects_past_times() {
    let store = MemoryKeyValueStore::new();
    let clock = FakeClock::at(100_000);
    let mut workspace = build_workspace(&store, clock.clone(), RecordingSink::new());

    workspace.unlock("correct horse").unwrap();
    let note = workspace.create_note("Hi", "World").unwrap();

    assert!(matches!(
        workspace.set_reminder(&note.id, clock.now_epoch_ms() - 1),
        Err(WorkspaceError::Reminder(_))
    ));
}

#[test]
fn trashing_a_note_cancels_its_reminder() {
    let store = MemoryKeyValueStore::new();
    let clock = FakeClock::at(100_000);
    let sink = RecordingSink::new();
    let mut workspace = build_workspace(&store, clock.clone(), sink.clone());

    workspace.unlock("correct horse").unwrap();
    let note = workspace.create_note("Hi", "World").unwrap();
    workspace
        .set_reminder(&note.id, clock.now_epoch_ms() + 5_000)
        .unwrap();

    workspace.trash_note(&note.id).unwrap();

    clock.advance(10_000);
    workspace.fire_due_reminders();
    assert_eq!(sink.displayed_count(), 0);

    let trashed = workspace.trashed_notes().unwrap();
    assert_eq!(trashed.len(), 1);
    assert!(trashed[0].is_trashed());
    assert_eq!(trashed[0].reminder_at, None);
}

#[test]
fn trash_restore_purge_lifecycle() {
    let store = MemoryKeyValueStore::new();
    let mut workspace = build_workspace(&store, FakeClock::at(1_000), RecordingSink::new());

    workspace.unlock("correct horse").unwrap();
    let note = workspace.create_note("Hi", "World").unwrap();

    workspace.trash_note(&note.id).unwrap();
    assert!(workspace.active_notes().unwrap().is_empty());
    assert_eq!(workspace.trashed_notes().unwrap().len(), 1);

    workspace.restore_note(&note.id).unwrap();
    assert_eq!(workspace.active_notes().unwrap().len(), 1);
    assert!(!workspace.active_notes().unwrap()[0].is_trashed());

    workspace.trash_note(&note.id).unwrap();
    workspace.purge_note(&note.id).unwrap();
    assert!(workspace.trashed_notes().unwrap().is_empty());

    assert!(matches!(
        workspace.purge_note(&note.id),
        Err(WorkspaceError::NoteNotFound(_))
    ));
}

#[test]
fn updates_record_snapshots_with_dedup() {
    let store = MemoryKeyValueStore::new();
    let mut workspace = build_workspace(&store, FakeClock::at(1_000), RecordingSink::new());

    workspace.unlock("correct horse").unwrap();
    let note = workspace.create_note("Hi", "draft one").unwrap();
    workspace.update_note(&note.id, "Hi", "draft two").unwrap();
    workspace.update_note(&note.id, "Hi", "draft two").unwrap();

    let history = SnapshotStore::new(&store);
    let snapshots = history.list_snapshots(&note.id);
    assert_eq!(snapshots.len(), 2, "create + one distinct update");
    assert_eq!(snapshots[0].body, "draft two");
    assert_eq!(snapshots[1].body, "draft one");
}

#[test]
fn tag_and_pin_mutations_stamp_updated_at() {
    let store = MemoryKeyValueStore::new();
    let mut workspace = build_workspace(&store, FakeClock::at(1_000), RecordingSink::new());

    workspace.unlock("correct horse").unwrap();
    let note = workspace.create_note("Hi", "World").unwrap();

    let tagged = workspace
        .set_note_tags(&note.id, &["Work".to_string(), "work".to_string()])
        .unwrap();
    assert_eq!(tagged.tags, vec!["work".to_string()]);
    assert!(tagged.updated_at >= note.updated_at);

    let pinned = workspace.set_pinned(&note.id, true).unwrap();
    assert!(pinned.pinned);
}
