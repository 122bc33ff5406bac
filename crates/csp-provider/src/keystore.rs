//! # Key Store Abstraction
//!
//! A [`KeyStore`] holds certificates, password-protected private keys and
//! secret keys under string aliases. Stores are read-only after
//! construction and safe for concurrent reads.
//!
//! - [`MemoryKeyStore`]: entries registered programmatically.
//! - [`DirectoryKeyStore`]: one file per entry in a directory.
//!
//! A missing entry is `Ok(None)`. `Err` is reserved for a store that cannot
//! be read, a wrong password, or an entry that cannot be decoded.

use std::collections::BTreeMap;

use csp_core::KeyStoreError;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::keys::{Certificate, PrivateKey, SymmetricKey};

mod directory;

pub use directory::DirectoryKeyStore;

/// Read access to aliased key material.
pub trait KeyStore: Send + Sync {
    /// Human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// All aliases, sorted.
    fn aliases(&self) -> Result<Vec<String>, KeyStoreError>;

    /// Certificate stored under `alias`.
    fn certificate(&self, alias: &str) -> Result<Option<Certificate>, KeyStoreError>;

    /// Private key stored under `alias`, opened with `password`.
    fn private_key(&self, alias: &str, password: &[u8])
        -> Result<Option<PrivateKey>, KeyStoreError>;

    /// Secret key stored under `alias`.
    fn secret_key(&self, alias: &str) -> Result<Option<SymmetricKey>, KeyStoreError>;

    /// Whether any entry exists under `alias`.
    fn contains(&self, alias: &str) -> Result<bool, KeyStoreError> {
        Ok(self.aliases()?.iter().any(|a| a == alias))
    }
}

// ─── MemoryKeyStore ──────────────────────────────────────────────────────

struct ProtectedKey {
    key: PrivateKey,
    password: Zeroizing<Vec<u8>>,
}

#[derive(Default)]
struct MemoryEntry {
    certificate: Option<Certificate>,
    private_key: Option<ProtectedKey>,
    secret_key: Option<SymmetricKey>,
}

/// In-memory key store for tests and embedded use.
///
/// Private keys are registered together with the password that unlocks
/// them; lookups compare passwords in constant time.
#[derive(Default)]
pub struct MemoryKeyStore {
    entries: BTreeMap<String, MemoryEntry>,
}

impl MemoryKeyStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a certificate (trusted or own).
    pub fn with_certificate(mut self, alias: impl Into<String>, cert: Certificate) -> Self {
        self.entries.entry(alias.into()).or_default().certificate = Some(cert);
        self
    }

    /// Register a private key protected by `password`.
    pub fn with_private_key(
        mut self,
        alias: impl Into<String>,
        key: PrivateKey,
        password: impl AsRef<[u8]>,
    ) -> Self {
        self.entries.entry(alias.into()).or_default().private_key = Some(ProtectedKey {
            key,
            password: Zeroizing::new(password.as_ref().to_vec()),
        });
        self
    }

    /// Register a secret key.
    pub fn with_secret_key(mut self, alias: impl Into<String>, key: SymmetricKey) -> Self {
        self.entries.entry(alias.into()).or_default().secret_key = Some(key);
        self
    }
}

impl KeyStore for MemoryKeyStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn aliases(&self) -> Result<Vec<String>, KeyStoreError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn certificate(&self, alias: &str) -> Result<Option<Certificate>, KeyStoreError> {
        Ok(self.entries.get(alias).and_then(|e| e.certificate.clone()))
    }

    fn private_key(
        &self,
        alias: &str,
        password: &[u8],
    ) -> Result<Option<PrivateKey>, KeyStoreError> {
        let Some(protected) = self.entries.get(alias).and_then(|e| e.private_key.as_ref()) else {
            return Ok(None);
        };
        if bool::from(protected.password.as_slice().ct_eq(password)) {
            Ok(Some(protected.key.clone()))
        } else {
            Err(KeyStoreError::WrongPassword {
                alias: alias.to_string(),
            })
        }
    }

    fn secret_key(&self, alias: &str) -> Result<Option<SymmetricKey>, KeyStoreError> {
        Ok(self.entries.get(alias).and_then(|e| e.secret_key.clone()))
    }

    fn contains(&self, alias: &str) -> Result<bool, KeyStoreError> {
        Ok(self.entries.contains_key(alias))
    }
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKeyStore")
            .field("aliases", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
