//! # Internal Crypto Providers
//!
//! An internal crypto provider encrypts data the service keeps for itself
//! (stored secrets, tokens) with a key configured at startup rather than
//! one resolved from a caller context.
//!
//! - [`KeyStoreInternalProvider`] (`keystore`): the internal key is a
//!   key-store alias with a certificate and private key. Supports
//!   self-contained ciphertexts.
//! - [`SymmetricKeyInternalProvider`] (`symmetric`): the internal key is an
//!   AES secret key. Plain ciphertexts only.

use std::sync::Arc;

use csp_core::{
    AlgorithmSpec, Capabilities, Capability, CryptoContext, CryptoServiceError, DigestAlgorithm,
    DEFAULT_ASYMMETRIC_ALGORITHM, DEFAULT_SYMMETRIC_ALGORITHM,
};

use crate::envelope;
use crate::keys::KeyMaterial;
use crate::operations::KeyOperations;
use crate::resolver::KeyResolver;

/// Type name of [`KeyStoreInternalProvider`].
pub const KEYSTORE_PROVIDER_TYPE: &str = "keystore";

/// Type name of [`SymmetricKeyInternalProvider`].
pub const SYMMETRIC_PROVIDER_TYPE: &str = "symmetric";

/// Message of the default self-contained encryption method.
pub const SELF_CONTAINED_ENCRYPT_UNSUPPORTED: &str =
    "Encryption with self contained cipher text is not supported by this implementation.";

/// Message of the default self-contained decryption method.
pub const SELF_CONTAINED_DECRYPT_UNSUPPORTED: &str =
    "Decryption with self contained cipher text is not supported by this implementation.";

/// Encrypts and decrypts with a preconfigured internal key.
pub trait InternalCryptoProvider: Send + Sync {
    /// Type name used to select this provider.
    fn provider_type(&self) -> &str;

    /// Optional operations this provider implements.
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Encrypt `cleartext` with the internal key.
    fn encrypt(&self, cleartext: &[u8], spec: &AlgorithmSpec)
        -> Result<Vec<u8>, CryptoServiceError>;

    /// Decrypt `ciphertext` with the internal key.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError>;

    /// Encrypt and wrap the result in a self-contained envelope.
    fn encrypt_self_contained(
        &self,
        _cleartext: &[u8],
        _spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        Err(CryptoServiceError::NotSupported(
            SELF_CONTAINED_ENCRYPT_UNSUPPORTED.into(),
        ))
    }

    /// Decrypt a self-contained envelope.
    fn decrypt_self_contained(
        &self,
        _envelope: &[u8],
        _spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        Err(CryptoServiceError::NotSupported(
            SELF_CONTAINED_DECRYPT_UNSUPPORTED.into(),
        ))
    }
}

// ─── KeyStoreInternalProvider ───────────────────────────────────────────

/// Internal provider backed by a key-store alias.
///
/// Encrypts with the alias certificate's public key (or the alias secret
/// key for symmetric transformations) and decrypts with the alias private
/// key. Self-contained envelopes carry the SHA-1 thumbprint of the alias
/// certificate; on decryption the key is found by thumbprint, so
/// envelopes written under a previous internal alias still open as long as
/// that alias remains in the store.
pub struct KeyStoreInternalProvider {
    resolver: Arc<dyn KeyResolver>,
    operations: KeyOperations,
    context: CryptoContext,
}

impl KeyStoreInternalProvider {
    /// Provider using `alias` as the internal key.
    pub fn new(
        resolver: Arc<dyn KeyResolver>,
        operations: KeyOperations,
        alias: &str,
    ) -> Result<Self, CryptoServiceError> {
        Ok(Self {
            resolver,
            operations,
            context: CryptoContext::for_alias(alias)?,
        })
    }

    fn encryption_key(
        &self,
        ctx: &CryptoContext,
        spec: &AlgorithmSpec,
    ) -> Result<KeyMaterial, CryptoServiceError> {
        if is_symmetric(spec) {
            let key = self.resolver.resolve_secret_key(ctx)?.require("secret key")?;
            Ok(KeyMaterial::Symmetric(key))
        } else {
            let cert = self.resolver.resolve_certificate(ctx)?.require("certificate")?;
            tracing::debug!(subject = cert.subject(), "certificate used for encrypting");
            Ok(KeyMaterial::Certificate(cert))
        }
    }

    fn decryption_key(
        &self,
        ctx: &CryptoContext,
        spec: &AlgorithmSpec,
    ) -> Result<KeyMaterial, CryptoServiceError> {
        if is_symmetric(spec) {
            let key = self.resolver.resolve_secret_key(ctx)?.require("secret key")?;
            Ok(KeyMaterial::Symmetric(key))
        } else {
            let key = self.resolver.resolve_private_key(ctx)?.require("private key")?;
            Ok(KeyMaterial::Private(key))
        }
    }
}

impl InternalCryptoProvider for KeyStoreInternalProvider {
    fn provider_type(&self) -> &str {
        KEYSTORE_PROVIDER_TYPE
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with(Capability::SelfContainedCiphertext)
    }

    fn encrypt(
        &self,
        cleartext: &[u8],
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let key = self.encryption_key(&self.context, spec)?;
        self.operations.encrypt(cleartext, &key, spec)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let key = self.decryption_key(&self.context, spec)?;
        self.operations.decrypt(ciphertext, &key, spec)
    }

    fn encrypt_self_contained(
        &self,
        cleartext: &[u8],
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        // An empty cleartext with an explicit algorithm skips the cipher.
        let raw = if !spec.is_blank() && cleartext.is_empty() {
            tracing::debug!("plaintext is empty, using an empty ciphertext");
            Vec::new()
        } else {
            self.encrypt(cleartext, spec)?
        };
        let cert = self
            .resolver
            .resolve_certificate(&self.context)?
            .require("certificate")?;
        let effective = spec.or_default(DEFAULT_ASYMMETRIC_ALGORITHM);
        envelope::encode(&raw, effective.algorithm(), &cert, DigestAlgorithm::Sha1)
    }

    fn decrypt_self_contained(
        &self,
        envelope: &[u8],
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let parsed = envelope::decode(envelope)?;
        let entry = self
            .resolver
            .resolve_by_thumbprint(&parsed.thumbprint)?
            .require("internal key")?;
        if parsed.ciphertext.is_empty() {
            return Ok(Vec::new());
        }
        let recorded = AlgorithmSpec::new(parsed.transformation)
            .with_provider(spec.provider().unwrap_or_default());
        let ctx = CryptoContext::for_alias(&entry.alias)?;
        let key = self.decryption_key(&ctx, &recorded)?;
        self.operations.decrypt(&parsed.ciphertext, &key, &recorded)
    }
}

impl std::fmt::Debug for KeyStoreInternalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStoreInternalProvider")
            .field("alias", &self.context.alias())
            .finish()
    }
}

// ─── SymmetricKeyInternalProvider ───────────────────────────────────────

/// Internal provider backed by an AES secret key.
///
/// A blank algorithm means `AES/GCM/NoPadding`.
pub struct SymmetricKeyInternalProvider {
    resolver: Arc<dyn KeyResolver>,
    operations: KeyOperations,
    context: CryptoContext,
}

impl SymmetricKeyInternalProvider {
    /// Provider using the secret key stored under `alias`.
    pub fn new(
        resolver: Arc<dyn KeyResolver>,
        operations: KeyOperations,
        alias: &str,
    ) -> Result<Self, CryptoServiceError> {
        Ok(Self {
            resolver,
            operations,
            context: CryptoContext::for_alias(alias)?,
        })
    }

    fn key(&self) -> Result<KeyMaterial, CryptoServiceError> {
        let key = self
            .resolver
            .resolve_secret_key(&self.context)?
            .require("secret key")?;
        Ok(KeyMaterial::Symmetric(key))
    }
}

impl InternalCryptoProvider for SymmetricKeyInternalProvider {
    fn provider_type(&self) -> &str {
        SYMMETRIC_PROVIDER_TYPE
    }

    fn encrypt(
        &self,
        cleartext: &[u8],
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let spec = spec.or_default(DEFAULT_SYMMETRIC_ALGORITHM);
        self.operations.encrypt(cleartext, &self.key()?, &spec)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let spec = spec.or_default(DEFAULT_SYMMETRIC_ALGORITHM);
        self.operations.decrypt(ciphertext, &self.key()?, &spec)
    }
}

impl std::fmt::Debug for SymmetricKeyInternalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKeyInternalProvider")
            .field("alias", &self.context.alias())
            .finish()
    }
}

fn is_symmetric(spec: &AlgorithmSpec) -> bool {
    spec.transformation().is_ok_and(|t| t.is_symmetric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{Certificate, PrivateKey, SymmetricKey};
    use crate::keystore::MemoryKeyStore;
    use crate::resolver::KeyStoreResolver;

    const TENANT_KEY: &[u8] = include_bytes!("../tests/fixtures/keystore/tenant.key");
    const TENANT_CRT: &[u8] = include_bytes!("../tests/fixtures/keystore/tenant.crt");

    fn resolver() -> Arc<dyn KeyResolver> {
        let store = MemoryKeyStore::new()
            .with_certificate("tenant", Certificate::from_bytes(TENANT_CRT).unwrap())
            .with_private_key(
                "tenant",
                PrivateKey::from_pkcs8(TENANT_KEY, b"tenant-pass").unwrap(),
                "pw",
            )
            .with_secret_key("aes", SymmetricKey::new(vec![4u8; 32]).unwrap());
        Arc::new(KeyStoreResolver::new(Arc::new(store), "tenant", "pw"))
    }

    fn keystore_provider() -> KeyStoreInternalProvider {
        KeyStoreInternalProvider::new(resolver(), KeyOperations::default(), "tenant").unwrap()
    }

    #[test]
    fn plain_roundtrip() {
        let p = keystore_provider();
        let spec = AlgorithmSpec::new("RSA/ECB/OAEPWithSHA1AndMGF1Padding");
        let ct = p.encrypt(b"secret", &spec).unwrap();
        assert_eq!(p.decrypt(&ct, &spec).unwrap(), b"secret");
    }

    #[test]
    fn self_contained_roundtrip() {
        let p = keystore_provider();
        let spec = AlgorithmSpec::new("RSA");
        let env = p.encrypt_self_contained(b"secret", &spec).unwrap();
        let parsed = envelope::decode(&env).unwrap();
        assert_eq!(parsed.transformation, "RSA");
        assert_eq!(parsed.thumbprint.value(), "E53E6CBD69A9BE19773656D00500BC4C4A42B5DC");
        assert_eq!(p.decrypt_self_contained(&env, &AlgorithmSpec::default()).unwrap(), b"secret");
    }

    #[test]
    fn empty_cleartext_shortcut_needs_explicit_algorithm() {
        let p = keystore_provider();
        let env = p
            .encrypt_self_contained(b"", &AlgorithmSpec::new("RSA"))
            .unwrap();
        assert!(envelope::decode(&env).unwrap().ciphertext.is_empty());
        assert!(p
            .decrypt_self_contained(&env, &AlgorithmSpec::default())
            .unwrap()
            .is_empty());

        // Blank algorithm: the cipher runs and records the effective default.
        let env = p.encrypt_self_contained(b"", &AlgorithmSpec::new("")).unwrap();
        let parsed = envelope::decode(&env).unwrap();
        assert_eq!(parsed.ciphertext.len(), 256);
        assert_eq!(parsed.transformation, "RSA");
    }

    #[test]
    fn unknown_thumbprint_fails_resolution() {
        let p = keystore_provider();
        let env = format!(
            r#"{{"c":"AQI=","t":"RSA","tp":"{}","tpd":"SHA-1"}}"#,
            "00".repeat(20)
        );
        assert!(matches!(
            p.decrypt_self_contained(env.as_bytes(), &AlgorithmSpec::default()),
            Err(CryptoServiceError::KeyResolution(_))
        ));
    }

    #[test]
    fn symmetric_transformation_uses_secret_key() {
        let p = KeyStoreInternalProvider::new(resolver(), KeyOperations::default(), "aes").unwrap();
        let spec = AlgorithmSpec::new("AES/GCM/NoPadding");
        let ct = p.encrypt(b"x", &spec).unwrap();
        assert_eq!(p.decrypt(&ct, &spec).unwrap(), b"x");
    }

    #[test]
    fn symmetric_provider_defaults_and_capabilities() {
        let p =
            SymmetricKeyInternalProvider::new(resolver(), KeyOperations::default(), "aes").unwrap();
        assert_eq!(p.provider_type(), "symmetric");
        assert_eq!(p.capabilities(), Capabilities::NONE);
        let ct = p.encrypt(b"payload", &AlgorithmSpec::default()).unwrap();
        assert_eq!(p.decrypt(&ct, &AlgorithmSpec::default()).unwrap(), b"payload");

        let err = p
            .encrypt_self_contained(b"payload", &AlgorithmSpec::default())
            .unwrap_err();
        assert_eq!(err.to_string(), SELF_CONTAINED_ENCRYPT_UNSUPPORTED);
        assert!(p
            .decrypt_self_contained(b"{}", &AlgorithmSpec::default())
            .unwrap_err()
            .is_not_supported());
    }

    #[test]
    fn keystore_provider_capabilities() {
        let p = keystore_provider();
        assert_eq!(p.provider_type(), "keystore");
        assert!(p.capabilities().supports(Capability::SelfContainedCiphertext));
    }
}
