//! Persisted encrypted-record envelope.
//!
//! # Responsibility
//! - Define the JSON envelope stored under the encrypted-record key.
//! - Validate schema tag and KDF/cipher descriptors before any decrypt.
//!
//! # Invariants
//! - `schema` must equal `SCHEMA_TAG` for this build to touch the record.
//! - Salt/iv/data are base64; decoded salt and iv have fixed lengths.
//! - Descriptor validation happens before key derivation, so a downgraded
//!   iteration count is rejected without burning KDF time.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::vault::crypto::{KdfParams, NONCE_LEN, SALT_LEN};
use crate::vault::{VaultError, VaultResult};

/// Schema tag marking a record this build understands.
pub const SCHEMA_TAG: &str = "enc_notes_v1";
/// KDF descriptor constants written by new saves.
pub const KDF_NAME: &str = "PBKDF2";
pub const KDF_HASH: &str = "SHA-256";
/// Cipher descriptor constant written by new saves.
pub const CIPHER_NAME: &str = "AES-GCM";

/// Key-derivation descriptor persisted alongside the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfDescriptor {
    pub name: String,
    pub hash: String,
    pub iterations: u32,
}

/// Cipher descriptor persisted alongside the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherDescriptor {
    pub name: String,
}

/// The single persisted vault record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedRecord {
    pub schema: String,
    pub kdf: KdfDescriptor,
    pub cipher: CipherDescriptor,
    /// Base64-encoded random salt, regenerated on every save.
    pub salt: String,
    /// Base64-encoded random nonce, regenerated on every save.
    pub iv: String,
    /// Base64-encoded ciphertext with appended authentication tag.
    pub data: String,
    /// Write time in epoch milliseconds; doubles as the write fence.
    pub updated_at: i64,
}

impl EncryptedRecord {
    /// Builds a record for freshly encrypted data.
    pub fn compose(
        salt: &[u8; SALT_LEN],
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
        params: &KdfParams,
        now: i64,
    ) -> Self {
        Self {
            schema: SCHEMA_TAG.to_string(),
            kdf: KdfDescriptor {
                name: KDF_NAME.to_string(),
                hash: KDF_HASH.to_string(),
                iterations: params.iterations,
            },
            cipher: CipherDescriptor {
                name: CIPHER_NAME.to_string(),
            },
            salt: base64_encode(salt),
            iv: base64_encode(nonce),
            data: base64_encode(ciphertext),
            updated_at: now,
        }
    }

    /// Parses a persisted record string.
    pub fn parse(raw: &str) -> VaultResult<Self> {
        serde_json::from_str(raw)
            .map_err(|err| VaultError::MalformedPayload(format!("encrypted record: {err}")))
    }

    /// Validates schema tag and descriptors.
    ///
    /// Schema mismatch is `UnknownSchema`; a record that names this schema
    /// but carries descriptors this build cannot honor is malformed. A
    /// record whose iteration count was downgraded below `min_iterations`
    /// is treated as not understood rather than silently accepted.
    pub fn validate(&self, min_iterations: u32) -> VaultResult<()> {
        if self.schema != SCHEMA_TAG {
            return Err(VaultError::UnknownSchema(self.schema.clone()));
        }
        if self.kdf.name != KDF_NAME || self.kdf.hash != KDF_HASH {
            return Err(VaultError::MalformedPayload(format!(
                "unsupported kdf descriptor `{}/{}`",
                self.kdf.name, self.kdf.hash
            )));
        }
        if self.kdf.iterations < min_iterations {
            return Err(VaultError::MalformedPayload(format!(
                "kdf iteration count {} below floor {min_iterations}",
                self.kdf.iterations
            )));
        }
        if self.cipher.name != CIPHER_NAME {
            return Err(VaultError::MalformedPayload(format!(
                "unsupported cipher `{}`",
                self.cipher.name
            )));
        }
        Ok(())
    }

    pub fn salt_bytes(&self) -> VaultResult<[u8; SALT_LEN]> {
        fixed_bytes(&self.salt, "salt")
    }

    pub fn nonce_bytes(&self) -> VaultResult<[u8; NONCE_LEN]> {
        fixed_bytes(&self.iv, "iv")
    }

    pub fn data_bytes(&self) -> VaultResult<Vec<u8>> {
        base64_decode(&self.data, "data")
    }

    pub fn to_json(&self) -> VaultResult<String> {
        serde_json::to_string(self)
            .map_err(|err| VaultError::MalformedPayload(format!("encrypted record: {err}")))
    }
}

/// Encode bytes as standard base64.
pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn base64_decode(data: &str, field: &str) -> VaultResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|err| VaultError::MalformedPayload(format!("invalid base64 in {field}: {err}")))
}

fn fixed_bytes<const N: usize>(data: &str, field: &str) -> VaultResult<[u8; N]> {
    let decoded = base64_decode(data, field)?;
    let len = decoded.len();
    decoded.try_into().map_err(|_| {
        VaultError::MalformedPayload(format!("{field} length {len}, expected {N} bytes"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::crypto::{KdfParams, MIN_KDF_ITERATIONS};

    fn sample_record() -> EncryptedRecord {
        EncryptedRecord::compose(
            &[1u8; SALT_LEN],
            &[2u8; NONCE_LEN],
            b"ciphertext",
            &KdfParams::default(),
            1_700_000_000_000,
        )
    }

    #[test]
    fn compose_parse_roundtrip() {
        let record = sample_record();
        let json = record.to_json().unwrap();
        let parsed = EncryptedRecord::parse(&json).unwrap();
        assert_eq!(record, parsed);
        parsed.validate(MIN_KDF_ITERATIONS).unwrap();
        assert_eq!(parsed.salt_bytes().unwrap(), [1u8; SALT_LEN]);
        assert_eq!(parsed.nonce_bytes().unwrap(), [2u8; NONCE_LEN]);
        assert_eq!(parsed.data_bytes().unwrap(), b"ciphertext".to_vec());
    }

    #[test]
    fn validate_rejects_unknown_schema() {
        let mut record = sample_record();
        record.schema = "enc_notes_v9".to_string();
        assert!(matches!(
            record.validate(MIN_KDF_ITERATIONS),
            Err(VaultError::UnknownSchema(tag)) if tag == "enc_notes_v9"
        ));
    }

    #[test]
    fn validate_rejects_downgraded_iterations() {
        let mut record = sample_record();
        record.kdf.iterations = 1_000;
        assert!(matches!(
            record.validate(MIN_KDF_ITERATIONS),
            Err(VaultError::MalformedPayload(_))
        ));
    }

    #[test]
    fn validate_rejects_foreign_cipher() {
        let mut record = sample_record();
        record.cipher.name = "XSalsa20".to_string();
        assert!(matches!(
            record.validate(MIN_KDF_ITERATIONS),
            Err(VaultError::MalformedPayload(_))
        ));
    }

    #[test]
    fn wrong_salt_length_is_malformed() {
        let mut record = sample_record();
        record.salt = base64_encode(&[0u8; 8]);
        assert!(matches!(
            record.salt_bytes(),
            Err(VaultError::MalformedPayload(_))
        ));
    }

    #[test]
    fn parse_rejects_non_json() {
        assert!(matches!(
            EncryptedRecord::parse("not json"),
            Err(VaultError::MalformedPayload(_))
        ));
    }
}
