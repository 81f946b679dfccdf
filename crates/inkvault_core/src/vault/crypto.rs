//! Passphrase key derivation and AES-256-GCM cipher operations.
//!
//! # Responsibility
//! - Derive 256-bit keys from passphrases via PBKDF2-HMAC-SHA256.
//! - Seal/open opaque byte payloads with authenticated encryption.
//!
//! # Invariants
//! - Key derivation is deterministic for fixed (passphrase, salt, params).
//! - `open` never returns unauthenticated plaintext; tag failure is an
//!   `Authentication` error.
//! - Derived key bytes are zeroized on drop and never logged.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::vault::{VaultError, VaultResult};

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Lowest iteration count this build accepts when reading a record.
pub const MIN_KDF_ITERATIONS: u32 = 250_000;
/// Iteration count written by new saves. Reviewed on cipher migrations.
pub const DEFAULT_KDF_ITERATIONS: u32 = 310_000;

/// PBKDF2 tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// PBKDF2-HMAC-SHA256 iteration count.
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

/// Key wrapper with automatic zeroization on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { key: bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Generate cryptographically secure random bytes.
pub fn generate_random<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    generate_random()
}

/// Generate a random nonce.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    generate_random()
}

/// Derive a 256-bit key from a passphrase.
///
/// Deliberately slow; callers must not run this on a latency-critical path
/// more often than once per unlock/save.
pub fn derive_key(passphrase: &str, salt: &[u8; SALT_LEN], params: &KdfParams) -> DerivedKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, params.iterations, &mut key);
    let derived = DerivedKey::from_bytes(key);
    key.zeroize();
    derived
}

/// Encrypt plaintext with AES-256-GCM.
///
/// Returns ciphertext with the 16-byte authentication tag appended.
pub fn seal(key: &DerivedKey, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> VaultResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| VaultError::CryptoUnsupported("AES-256-GCM key setup failed".to_string()))?;

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| VaultError::CryptoUnsupported("AES-GCM encryption failed".to_string()))
}

/// Decrypt ciphertext+tag with AES-256-GCM.
///
/// Any tag failure surfaces as `Authentication`: wrong passphrase, wrong
/// salt/nonce and tampered data are indistinguishable here on purpose.
pub fn open(
    key: &DerivedKey,
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> VaultResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| VaultError::CryptoUnsupported("AES-256-GCM key setup failed".to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| VaultError::Authentication)
}
