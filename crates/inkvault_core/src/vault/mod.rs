//! Encrypted vault persistence.
//!
//! # Responsibility
//! - Derive symmetric keys from passphrases and encrypt the note corpus.
//! - Own the single persisted ciphertext record and its state machine.
//! - Migrate legacy plaintext storage into the encrypted record once.
//!
//! # Invariants
//! - Salt and nonce are freshly random on every save; never reused.
//! - A wrong passphrase is indistinguishable from a tampered record.
//! - Legacy keys are deleted only after the encrypted save succeeded.

pub mod crypto;
pub mod payload;
pub mod record;
pub mod store;

pub use payload::{VaultPayload, PAYLOAD_SCHEMA_VERSION};
pub use record::{EncryptedRecord, SCHEMA_TAG};
pub use store::{MigrationOutcome, UnlockOutcome, VaultState, VaultStore};

use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type VaultResult<T> = Result<T, VaultError>;

/// Vault-layer error taxonomy.
#[derive(Debug)]
pub enum VaultError {
    /// Decryption tag mismatch: wrong passphrase or tampered/corrupted data.
    /// Deliberately carries no detail distinguishing the two cases.
    Authentication,
    /// Persisted record carries a schema tag this build does not understand.
    UnknownSchema(String),
    /// Record or payload content could not be parsed or failed validation.
    MalformedPayload(String),
    /// Underlying storage failed; in-memory state is still valid.
    Storage(StoreError),
    /// No usable AEAD/KDF primitive in this runtime.
    CryptoUnsupported(String),
}

impl Display for VaultError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "incorrect passphrase or corrupted vault"),
            Self::UnknownSchema(tag) => write!(f, "unknown vault schema tag `{tag}`"),
            Self::MalformedPayload(details) => write!(f, "malformed vault payload: {details}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::CryptoUnsupported(details) => {
                write!(f, "cryptographic primitive unavailable: {details}")
            }
        }
    }
}

impl Error for VaultError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for VaultError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}
