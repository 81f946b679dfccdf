//! Preference blob and its store.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::store::{prefs_key, KeyValueStore};

/// UI color theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Note list ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    UpdatedDesc,
    CreatedDesc,
    TitleAsc,
}

/// Persisted preference blob.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub theme: Theme,
    pub sort_order: SortOrder,
}

/// Store facade for the preference blob.
pub struct PreferenceStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> PreferenceStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads preferences; any failure yields defaults.
    pub fn load(&self) -> Preferences {
        let raw = match self.store.get(&prefs_key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Preferences::default(),
            Err(err) => {
                warn!("event=prefs_load module=prefs status=error error={err}");
                return Preferences::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(prefs) => prefs,
            Err(err) => {
                warn!("event=prefs_load module=prefs status=error error={err}");
                Preferences::default()
            }
        }
    }

    /// Saves preferences best-effort.
    pub fn save(&self, prefs: &Preferences) {
        let raw = match serde_json::to_string(prefs) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("event=prefs_persist module=prefs status=error error={err}");
                return;
            }
        };
        if let Err(err) = self.store.put(&prefs_key(), &raw) {
            warn!("event=prefs_persist module=prefs status=error error={err}");
        }
    }
}
