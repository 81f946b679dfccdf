//! Export/import of the note corpus as user-held JSON documents.
//!
//! # Responsibility
//! - Produce the versioned export document.
//! - Accept current and legacy import shapes and merge them into state.
//!
//! # Invariants
//! - Import merge is keyed by note id with incoming-wins-on-conflict.
//! - Merging preserves id uniqueness across active ∪ trashed.

pub mod exchange;

pub use exchange::{
    export_document, export_json, merge_import, parse_import, ExportDocument, ImportedNotes,
    TransferError, EXPORT_SCHEMA_VERSION,
};
