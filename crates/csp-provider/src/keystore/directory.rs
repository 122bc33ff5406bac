//! Directory-backed key store.
//!
//! Layout, one file per entry kind:
//!
//! ```text
//! <dir>/<alias>.crt   X.509 certificate, PEM or DER
//! <dir>/<alias>.key   PKCS#8 private key, PEM or DER, optionally encrypted
//! <dir>/<alias>.aes   AES secret key, hex
//! ```
//!
//! Files are read on every lookup, so rotating a file takes effect without
//! a restart.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use csp_core::KeyStoreError;
use zeroize::Zeroizing;

use super::KeyStore;
use crate::keys::{Certificate, KeyDecodeError, PrivateKey, SymmetricKey};

const CERT_EXT: &str = "crt";
const KEY_EXT: &str = "key";
const SECRET_EXT: &str = "aes";

/// Key store reading PEM/DER/hex files from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryKeyStore {
    root: PathBuf,
    name: String,
}

impl DirectoryKeyStore {
    /// Open a store rooted at `root`. The directory must exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, KeyStoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(KeyStoreError::Unavailable(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        let name = format!("directory:{}", root.display());
        Ok(Self { root, name })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, alias: &str, ext: &str) -> Result<PathBuf, KeyStoreError> {
        validate_alias(alias)?;
        Ok(self.root.join(format!("{alias}.{ext}")))
    }

    fn read_entry(&self, alias: &str, ext: &str) -> Result<Option<Vec<u8>>, KeyStoreError> {
        let path = self.entry_path(alias, ext)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KeyStoreError::Io(e)),
        }
    }
}

impl KeyStore for DirectoryKeyStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> Result<Vec<String>, KeyStoreError> {
        let mut aliases = BTreeSet::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let known_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e, CERT_EXT | KEY_EXT | SECRET_EXT));
            if !known_ext || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_alias(stem).is_ok() {
                    aliases.insert(stem.to_string());
                }
            }
        }
        Ok(aliases.into_iter().collect())
    }

    fn certificate(&self, alias: &str) -> Result<Option<Certificate>, KeyStoreError> {
        let Some(bytes) = self.read_entry(alias, CERT_EXT)? else {
            return Ok(None);
        };
        Certificate::from_bytes(&bytes)
            .map(Some)
            .map_err(|e| corrupt(alias, e))
    }

    fn private_key(
        &self,
        alias: &str,
        password: &[u8],
    ) -> Result<Option<PrivateKey>, KeyStoreError> {
        let Some(bytes) = self.read_entry(alias, KEY_EXT)? else {
            return Ok(None);
        };
        let bytes = Zeroizing::new(bytes);
        match PrivateKey::from_pkcs8(&bytes, password) {
            Ok(key) => Ok(Some(key)),
            Err(KeyDecodeError::WrongPassword) => Err(KeyStoreError::WrongPassword {
                alias: alias.to_string(),
            }),
            Err(e) => Err(corrupt(alias, e)),
        }
    }

    fn secret_key(&self, alias: &str) -> Result<Option<SymmetricKey>, KeyStoreError> {
        let Some(bytes) = self.read_entry(alias, SECRET_EXT)? else {
            return Ok(None);
        };
        let bytes = Zeroizing::new(bytes);
        let text = std::str::from_utf8(&bytes).map_err(|e| KeyStoreError::Corrupt {
            alias: alias.to_string(),
            reason: format!("secret key file is not UTF-8: {e}"),
        })?;
        SymmetricKey::from_hex(text)
            .map(Some)
            .map_err(|e| corrupt(alias, e))
    }

    fn contains(&self, alias: &str) -> Result<bool, KeyStoreError> {
        for ext in [CERT_EXT, KEY_EXT, SECRET_EXT] {
            if self.entry_path(alias, ext)?.is_file() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn corrupt(alias: &str, err: KeyDecodeError) -> KeyStoreError {
    KeyStoreError::Corrupt {
        alias: alias.to_string(),
        reason: err.to_string(),
    }
}

/// Aliases are file stems: `[A-Za-z0-9._-]+`, not starting with a dot.
fn validate_alias(alias: &str) -> Result<(), KeyStoreError> {
    let valid = !alias.is_empty()
        && !alias.starts_with('.')
        && alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(KeyStoreError::InvalidAlias(alias.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/keystore")
    }

    #[test]
    fn open_requires_directory() {
        let err = DirectoryKeyStore::open("/definitely/not/here").unwrap_err();
        assert!(matches!(err, KeyStoreError::Unavailable(_)));
    }

    #[test]
    fn lists_fixture_aliases() {
        let store = DirectoryKeyStore::open(fixture_dir()).unwrap();
        assert_eq!(
            store.aliases().unwrap(),
            vec!["internal", "partner", "signer", "tenant"]
        );
        assert!(store.name().starts_with("directory:"));
    }

    #[test]
    fn reads_fixture_entries() {
        let store = DirectoryKeyStore::open(fixture_dir()).unwrap();
        assert!(store.certificate("tenant").unwrap().is_some());
        assert!(store.certificate("partner").unwrap().is_some());
        assert!(store.private_key("partner", b"").unwrap().is_none());
        assert!(store.private_key("tenant", b"tenant-pass").unwrap().is_some());
        assert_eq!(store.secret_key("internal").unwrap().unwrap().bits(), 256);
        assert!(store.secret_key("tenant").unwrap().is_none());
        assert!(store.contains("signer").unwrap());
        assert!(!store.contains("nobody").unwrap());
    }

    #[test]
    fn wrong_password_is_reported() {
        let store = DirectoryKeyStore::open(fixture_dir()).unwrap();
        assert!(matches!(
            store.private_key("tenant", b"wrong"),
            Err(KeyStoreError::WrongPassword { .. })
        ));
    }

    #[test]
    fn rejects_path_like_aliases() {
        let store = DirectoryKeyStore::open(fixture_dir()).unwrap();
        for alias in ["../tenant", "a/b", "", ".hidden", "sp ace"] {
            assert!(
                matches!(store.certificate(alias), Err(KeyStoreError::InvalidAlias(_))),
                "{alias:?}"
            );
        }
    }

    #[test]
    fn corrupt_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.crt"), b"garbage").unwrap();
        std::fs::write(dir.path().join("bad.aes"), b"0011").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), b"x").unwrap();
        let store = DirectoryKeyStore::open(dir.path()).unwrap();
        assert_eq!(store.aliases().unwrap(), vec!["bad"]);
        assert!(matches!(
            store.certificate("bad"),
            Err(KeyStoreError::Corrupt { .. })
        ));
        assert!(matches!(
            store.secret_key("bad"),
            Err(KeyStoreError::Corrupt { .. })
        ));
    }
}
