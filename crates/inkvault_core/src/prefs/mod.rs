//! Best-effort UI preference persistence.
//!
//! # Responsibility
//! - Persist theme and note-sort preferences under one storage key.
//!
//! # Invariants
//! - Loading never fails: missing or malformed state yields defaults.
//! - Saving is best-effort: failures are logged, never propagated.

pub mod settings;

pub use settings::{PreferenceStore, Preferences, SortOrder, Theme};
