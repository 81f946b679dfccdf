//! Export document building and import parsing/merging.
//!
//! # Responsibility
//! - Serialize the working copy into the downloadable document shape.
//! - Parse the three accepted import shapes into note collections.
//!
//! # Invariants
//! - Accepted import shapes: versioned document, bare note array (legacy),
//!   `{notes: [...]}` wrapper (legacy).
//! - Entries that are not valid notes are dropped, not fatal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::note::Note;
use crate::vault::VaultPayload;

/// Export document schema version.
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

/// The downloadable/uploadable document shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub schema_version: u32,
    pub exported_at: i64,
    #[serde(default)]
    pub active_notes: Vec<Note>,
    #[serde(default)]
    pub trashed_notes: Vec<Note>,
}

/// Import parse error.
#[derive(Debug)]
pub enum TransferError {
    /// Input is not JSON or matches none of the accepted shapes.
    Malformed(String),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(details) => write!(f, "malformed import document: {details}"),
        }
    }
}

impl Error for TransferError {}

/// Note collections recovered from an import document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportedNotes {
    pub active_notes: Vec<Note>,
    pub trashed_notes: Vec<Note>,
}

/// Builds the export document for the current working copy.
pub fn export_document(active: &[Note], trashed: &[Note], exported_at: i64) -> ExportDocument {
    ExportDocument {
        schema_version: EXPORT_SCHEMA_VERSION,
        exported_at,
        active_notes: active.to_vec(),
        trashed_notes: trashed.to_vec(),
    }
}

/// Serializes the export document to pretty JSON for download.
pub fn export_json(
    active: &[Note],
    trashed: &[Note],
    exported_at: i64,
) -> Result<String, TransferError> {
    serde_json::to_string_pretty(&export_document(active, trashed, exported_at))
        .map_err(|err| TransferError::Malformed(err.to_string()))
}

/// Parses an uploaded document into note collections.
///
/// Accepts, in order of preference:
/// 1. the versioned document (`activeNotes`/`trashedNotes`),
/// 2. a legacy `{notes: [...]}` wrapper (all notes treated as active),
/// 3. a legacy bare `[Note...]` array (all notes treated as active).
pub fn parse_import(raw: &str) -> Result<ImportedNotes, TransferError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|err| TransferError::Malformed(err.to_string()))?;

    match value {
        serde_json::Value::Array(entries) => Ok(ImportedNotes {
            active_notes: collect_notes(entries),
            trashed_notes: Vec::new(),
        }),
        serde_json::Value::Object(mut fields) => {
            if fields.contains_key("activeNotes") || fields.contains_key("trashedNotes") {
                return Ok(ImportedNotes {
                    active_notes: take_note_array(&mut fields, "activeNotes"),
                    trashed_notes: take_note_array(&mut fields, "trashedNotes"),
                });
            }
            if let Some(serde_json::Value::Array(entries)) = fields.remove("notes") {
                return Ok(ImportedNotes {
                    active_notes: collect_notes(entries),
                    trashed_notes: Vec::new(),
                });
            }
            Err(TransferError::Malformed(
                "object carries neither note collections nor a `notes` array".to_string(),
            ))
        }
        other => Err(TransferError::Malformed(format!(
            "expected object or array, got {other}"
        ))),
    }
}

/// Merges imported notes into the working copy, incoming wins on conflict.
///
/// A conflicting current note is removed from whichever collection holds it
/// before the incoming copy is appended, preserving id uniqueness across
/// active ∪ trashed.
pub fn merge_import(payload: &mut VaultPayload, incoming: ImportedNotes) {
    let incoming_ids: BTreeSet<&str> = incoming
        .active_notes
        .iter()
        .chain(incoming.trashed_notes.iter())
        .map(|note| note.id.as_str())
        .collect();

    payload
        .active_notes
        .retain(|note| !incoming_ids.contains(note.id.as_str()));
    payload
        .trashed_notes
        .retain(|note| !incoming_ids.contains(note.id.as_str()));

    payload.active_notes.extend(incoming.active_notes);
    payload.trashed_notes.extend(incoming.trashed_notes);
    payload.dedupe_last_write_wins();
}

fn take_note_array(
    fields: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Vec<Note> {
    match fields.remove(key) {
        Some(serde_json::Value::Array(entries)) => collect_notes(entries),
        _ => Vec::new(),
    }
}

fn collect_notes(entries: Vec<serde_json::Value>) -> Vec<Note> {
    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect()
}
