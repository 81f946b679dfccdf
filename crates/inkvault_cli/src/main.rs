//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `inkvault_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use inkvault_core::store::MemoryKeyValueStore;
use inkvault_core::{VaultState, VaultStore};

fn main() {
    println!("inkvault_core version={}", inkvault_core::core_version());

    // A fresh in-memory store must always classify as NoVault; this probes
    // the vault state machine without touching any on-disk profile.
    let store = MemoryKeyValueStore::new();
    let vault = VaultStore::new(&store);
    let state = match vault.detect_vault_state() {
        Ok(VaultState::NoVault) => "no_vault",
        Ok(VaultState::LegacyPresent) => "legacy_present",
        Ok(VaultState::Locked) => "locked",
        Ok(VaultState::Unlocked) => "unlocked",
        Err(_) => "error",
    };
    println!("inkvault_core vault_state={state}");
}
