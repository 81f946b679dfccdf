//! Local reminder scheduling.
//!
//! # Responsibility
//! - Persist per-note reminder entries and arm in-process timers.
//! - Reconcile persisted reminders against the live note set.
//!
//! # Invariants
//! - At most one reminder (and one armed timer) per note id.
//! - A fired reminder is removed from persistence before it is displayed.
//! - Persistence failures are best-effort: logged, never propagated.

pub mod scheduler;

pub use scheduler::{
    Clock, NotificationPermission, NotificationSink, Reminder, ReminderError, ReminderScheduler,
    SystemClock,
};
