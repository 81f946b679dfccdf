//! Plaintext vault payload: the decrypted note corpus.
//!
//! # Responsibility
//! - Define the serialized shape the cipher seals and opens.
//! - Enforce the id-uniqueness invariant across active and trashed notes.
//!
//! # Invariants
//! - A note id appears at most once in the union of both collections.
//! - Missing note arrays default to empty; a note without an id rejects the
//!   whole payload (it was written by this code or a trusted export).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::note::{Note, NoteId};
use crate::vault::{VaultError, VaultResult};

/// Payload schema version written by new saves.
pub const PAYLOAD_SCHEMA_VERSION: u32 = 1;

/// The decrypted note corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultPayload {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub active_notes: Vec<Note>,
    #[serde(default)]
    pub trashed_notes: Vec<Note>,
}

fn default_schema_version() -> u32 {
    PAYLOAD_SCHEMA_VERSION
}

impl Default for VaultPayload {
    fn default() -> Self {
        Self::empty()
    }
}

impl VaultPayload {
    pub fn empty() -> Self {
        Self {
            schema_version: PAYLOAD_SCHEMA_VERSION,
            active_notes: Vec::new(),
            trashed_notes: Vec::new(),
        }
    }

    pub fn new(active_notes: Vec<Note>, trashed_notes: Vec<Note>) -> Self {
        Self {
            schema_version: PAYLOAD_SCHEMA_VERSION,
            active_notes,
            trashed_notes,
        }
    }

    /// Parses decrypted plaintext bytes into a payload.
    pub fn from_bytes(bytes: &[u8]) -> VaultResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| VaultError::MalformedPayload("payload is not UTF-8".to_string()))?;
        serde_json::from_str(text)
            .map_err(|err| VaultError::MalformedPayload(format!("payload: {err}")))
    }

    /// Serializes the payload for encryption.
    pub fn to_bytes(&self) -> VaultResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|err| VaultError::MalformedPayload(format!("payload: {err}")))
    }

    /// Returns whether a note id exists in either collection.
    pub fn contains(&self, id: &str) -> bool {
        self.active_notes.iter().any(|note| note.id == id)
            || self.trashed_notes.iter().any(|note| note.id == id)
    }

    /// Enforces id uniqueness across active ∪ trashed, last write wins.
    ///
    /// When the same id appears more than once, the copy with the highest
    /// `updated_at` survives; on a tie the active copy is preferred. Relative
    /// order of surviving notes is preserved.
    pub fn dedupe_last_write_wins(&mut self) {
        let mut winners: BTreeMap<NoteId, (bool, i64)> = BTreeMap::new();
        for note in &self.active_notes {
            record_winner(&mut winners, &note.id, true, note.updated_at);
        }
        for note in &self.trashed_notes {
            record_winner(&mut winners, &note.id, false, note.updated_at);
        }

        let mut seen: BTreeMap<NoteId, ()> = BTreeMap::new();
        self.active_notes.retain(|note| {
            matches!(winners.get(&note.id), Some((true, at)) if *at == note.updated_at)
                && seen.insert(note.id.clone(), ()).is_none()
        });
        self.trashed_notes.retain(|note| {
            matches!(winners.get(&note.id), Some((false, at)) if *at == note.updated_at)
                && seen.insert(note.id.clone(), ()).is_none()
        });
    }
}

fn record_winner(
    winners: &mut BTreeMap<NoteId, (bool, i64)>,
    id: &str,
    active: bool,
    updated_at: i64,
) {
    let replaces = match winners.get(id) {
        Some(&(winner_active, winner_at)) => {
            updated_at > winner_at || (updated_at == winner_at && active && !winner_active)
        }
        None => true,
    };
    if replaces {
        winners.insert(id.to_string(), (active, updated_at));
    }
}

/// Parses a legacy plaintext note array permissively.
///
/// Entries that are not valid notes (most commonly: missing id) are dropped
/// rather than failing the whole read; legacy stores accumulated junk the
/// migration must survive.
pub fn parse_legacy_notes(raw: &str) -> Vec<Note> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(_) => return Vec::new(),
    };
    values
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, updated_at: i64) -> Note {
        let mut note = Note::new("t", "b", updated_at);
        note.id = id.to_string();
        note
    }

    #[test]
    fn bytes_roundtrip_preserves_payload() {
        let payload = VaultPayload::new(vec![note("a", 1)], vec![note("b", 2)]);
        let bytes = payload.to_bytes().unwrap();
        let parsed = VaultPayload::from_bytes(&bytes).unwrap();
        assert_eq!(payload, parsed);
    }

    #[test]
    fn missing_arrays_default_to_empty() {
        let parsed = VaultPayload::from_bytes(br#"{"schemaVersion":1}"#).unwrap();
        assert!(parsed.active_notes.is_empty());
        assert!(parsed.trashed_notes.is_empty());
    }

    #[test]
    fn note_without_id_rejects_payload() {
        let result = VaultPayload::from_bytes(br#"{"activeNotes":[{"title":"x"}]}"#);
        assert!(matches!(result, Err(VaultError::MalformedPayload(_))));
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            VaultPayload::from_bytes(b"\xff\xfe"),
            Err(VaultError::MalformedPayload(_))
        ));
    }

    #[test]
    fn dedupe_keeps_latest_copy_across_collections() {
        let mut payload = VaultPayload::new(vec![note("a", 100)], vec![note("a", 200)]);
        payload.dedupe_last_write_wins();
        assert!(payload.active_notes.is_empty());
        assert_eq!(payload.trashed_notes.len(), 1);
        assert_eq!(payload.trashed_notes[0].updated_at, 200);
    }

    #[test]
    fn dedupe_prefers_active_on_timestamp_tie() {
        let mut payload = VaultPayload::new(vec![note("a", 100)], vec![note("a", 100)]);
        payload.dedupe_last_write_wins();
        assert_eq!(payload.active_notes.len(), 1);
        assert!(payload.trashed_notes.is_empty());
    }

    #[test]
    fn parse_legacy_notes_drops_invalid_entries() {
        let notes =
            parse_legacy_notes(r#"[{"id":"a","title":"ok"},{"title":"no id"},42,{"id":"b"}]"#);
        let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn parse_legacy_notes_tolerates_non_array_input() {
        assert!(parse_legacy_notes("not json").is_empty());
        assert!(parse_legacy_notes(r#"{"id":"a"}"#).is_empty());
    }
}
