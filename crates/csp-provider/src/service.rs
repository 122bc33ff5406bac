//! # Crypto Service Facade
//!
//! [`CryptoService`] is the contract callers program against.
//! [`DefaultCryptoService`] implements it over a [`KeyResolver`], a
//! registry of [`InternalCryptoProvider`]s and an optional
//! [`HybridEnvelopeBuilder`].
//!
//! Two families of operations:
//!
//! - **Internal** (`encrypt`, `decrypt`): the service's own key, chosen by
//!   the selected internal provider. Optionally self-contained.
//! - **External** (`sign`, `encrypt_for`, `decrypt_from`,
//!   `verify_signature`, `certificate`): key material resolved from a
//!   caller-supplied [`CryptoContext`].

use std::collections::BTreeMap;
use std::sync::Arc;

use csp_core::{
    AlgorithmSpec, Capabilities, Capability, CryptoContext, CryptoServiceError,
    HybridEncryptionInput, HybridEncryptionOutput, OperationDescriptor,
};

use crate::hybrid::HybridEnvelopeBuilder;
use crate::internal::{InternalCryptoProvider, KEYSTORE_PROVIDER_TYPE};
use crate::keys::{Certificate, KeyMaterial};
use crate::operations::KeyOperations;
use crate::resolver::KeyResolver;

/// Message of the default hybrid encryption method.
pub const HYBRID_ENCRYPT_UNSUPPORTED: &str =
    "Hybrid encryption is not supported by this implementation.";

/// Message of the default hybrid decryption method.
pub const HYBRID_DECRYPT_UNSUPPORTED: &str =
    "Hybrid decryption is not supported by this implementation.";

/// Message when encryption names an unavailable internal provider type.
pub const PROVIDER_TYPE_ENCRYPT_UNSUPPORTED: &str =
    "Encryption with providing internal crypto provider type is not supported by this implementation.";

/// Message when decryption names an unavailable internal provider type.
pub const PROVIDER_TYPE_DECRYPT_UNSUPPORTED: &str =
    "Decryption with providing internal crypto provider type is not supported by this implementation.";

/// Encryption, decryption, signing and verification decoupled from where
/// the keys live.
pub trait CryptoService: Send + Sync {
    /// Optional operations this service supports.
    fn capabilities(&self) -> Capabilities;

    /// Encrypt with the internal key.
    fn encrypt(
        &self,
        cleartext: &[u8],
        op: &OperationDescriptor,
    ) -> Result<Vec<u8>, CryptoServiceError>;

    /// Decrypt with the internal key.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        op: &OperationDescriptor,
    ) -> Result<Vec<u8>, CryptoServiceError>;

    /// Sign with the private key resolved from `ctx`.
    fn sign(
        &self,
        data: &[u8],
        spec: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<Vec<u8>, CryptoServiceError>;

    /// Encrypt for the party whose certificate `ctx` resolves to.
    fn encrypt_for(
        &self,
        cleartext: &[u8],
        spec: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<Vec<u8>, CryptoServiceError>;

    /// Decrypt with the local private key resolved from `ctx`.
    fn decrypt_from(
        &self,
        ciphertext: &[u8],
        spec: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<Vec<u8>, CryptoServiceError>;

    /// Verify a signature against the certificate resolved from `ctx`.
    /// A mismatch is `Ok(false)`.
    fn verify_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        spec: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<bool, CryptoServiceError>;

    /// Certificate resolved from `ctx`.
    fn certificate(&self, ctx: &CryptoContext) -> Result<Certificate, CryptoServiceError>;

    /// Envelope-encrypt for the certificate resolved from `ctx`.
    fn hybrid_encrypt(
        &self,
        _input: &HybridEncryptionInput,
        _symmetric: &AlgorithmSpec,
        _asymmetric: &AlgorithmSpec,
        _ctx: &CryptoContext,
    ) -> Result<HybridEncryptionOutput, CryptoServiceError> {
        Err(CryptoServiceError::NotSupported(
            HYBRID_ENCRYPT_UNSUPPORTED.into(),
        ))
    }

    /// Open an envelope with the private key resolved from `ctx`.
    fn hybrid_decrypt(
        &self,
        _output: &HybridEncryptionOutput,
        _symmetric: &AlgorithmSpec,
        _asymmetric: &AlgorithmSpec,
        _ctx: &CryptoContext,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        Err(CryptoServiceError::NotSupported(
            HYBRID_DECRYPT_UNSUPPORTED.into(),
        ))
    }
}

/// Key-store-backed [`CryptoService`].
pub struct DefaultCryptoService {
    resolver: Arc<dyn KeyResolver>,
    operations: KeyOperations,
    providers: BTreeMap<String, Arc<dyn InternalCryptoProvider>>,
    default_provider: String,
    hybrid: Option<HybridEnvelopeBuilder>,
}

impl DefaultCryptoService {
    /// Start building a service over `resolver`.
    pub fn builder(resolver: Arc<dyn KeyResolver>) -> DefaultCryptoServiceBuilder {
        DefaultCryptoServiceBuilder {
            resolver,
            operations: KeyOperations::default(),
            providers: BTreeMap::new(),
            default_provider: KEYSTORE_PROVIDER_TYPE.to_string(),
            hybrid: false,
        }
    }

    /// Registered internal provider type names.
    pub fn internal_provider_types(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    fn provider(
        &self,
        op: &OperationDescriptor,
        unsupported: &str,
    ) -> Result<&Arc<dyn InternalCryptoProvider>, CryptoServiceError> {
        let name = op
            .internal_provider
            .as_deref()
            .unwrap_or(&self.default_provider);
        self.providers.get(name).ok_or_else(|| {
            tracing::debug!(provider_type = name, "unknown internal crypto provider type");
            CryptoServiceError::NotSupported(unsupported.to_string())
        })
    }
}

impl CryptoService for DefaultCryptoService {
    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::NONE;
        if self.hybrid.is_some() {
            caps = caps.with(Capability::HybridEncryption);
        }
        if self
            .providers
            .values()
            .any(|p| p.capabilities().supports(Capability::SelfContainedCiphertext))
        {
            caps = caps.with(Capability::SelfContainedCiphertext);
        }
        if self.providers.len() > 1 {
            caps = caps.with(Capability::ProviderSelection);
        }
        caps
    }

    fn encrypt(
        &self,
        cleartext: &[u8],
        op: &OperationDescriptor,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let provider = self.provider(op, PROVIDER_TYPE_ENCRYPT_UNSUPPORTED)?;
        if op.self_contained {
            provider.encrypt_self_contained(cleartext, &op.spec)
        } else {
            provider.encrypt(cleartext, &op.spec)
        }
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        op: &OperationDescriptor,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let provider = self.provider(op, PROVIDER_TYPE_DECRYPT_UNSUPPORTED)?;
        if op.self_contained {
            provider.decrypt_self_contained(ciphertext, &op.spec)
        } else {
            provider.decrypt(ciphertext, &op.spec)
        }
    }

    fn sign(
        &self,
        data: &[u8],
        spec: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let key = self.resolver.resolve_private_key(ctx)?.require("private key")?;
        self.operations.sign(data, &key, spec)
    }

    fn encrypt_for(
        &self,
        cleartext: &[u8],
        spec: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let cert = self.resolver.resolve_certificate(ctx)?.require("certificate")?;
        self.operations
            .encrypt(cleartext, &KeyMaterial::Certificate(cert), spec)
    }

    fn decrypt_from(
        &self,
        ciphertext: &[u8],
        spec: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let key = self.resolver.resolve_private_key(ctx)?.require("private key")?;
        self.operations
            .decrypt(ciphertext, &KeyMaterial::Private(key), spec)
    }

    fn verify_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        spec: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<bool, CryptoServiceError> {
        let cert = self.resolver.resolve_certificate(ctx)?.require("certificate")?;
        self.operations
            .verify(data, signature, cert.public_key(), spec)
    }

    fn certificate(&self, ctx: &CryptoContext) -> Result<Certificate, CryptoServiceError> {
        self.resolver.resolve_certificate(ctx)?.require("certificate")
    }

    fn hybrid_encrypt(
        &self,
        input: &HybridEncryptionInput,
        symmetric: &AlgorithmSpec,
        asymmetric: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<HybridEncryptionOutput, CryptoServiceError> {
        match &self.hybrid {
            Some(builder) => builder.build(input, symmetric, asymmetric, ctx),
            None => Err(CryptoServiceError::NotSupported(
                HYBRID_ENCRYPT_UNSUPPORTED.into(),
            )),
        }
    }

    fn hybrid_decrypt(
        &self,
        output: &HybridEncryptionOutput,
        symmetric: &AlgorithmSpec,
        asymmetric: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        match &self.hybrid {
            Some(builder) => builder.open(output, symmetric, asymmetric, ctx),
            None => Err(CryptoServiceError::NotSupported(
                HYBRID_DECRYPT_UNSUPPORTED.into(),
            )),
        }
    }
}

impl std::fmt::Debug for DefaultCryptoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultCryptoService")
            .field("providers", &self.internal_provider_types())
            .field("default_provider", &self.default_provider)
            .field("hybrid", &self.hybrid.is_some())
            .finish()
    }
}

/// Builder for [`DefaultCryptoService`].
pub struct DefaultCryptoServiceBuilder {
    resolver: Arc<dyn KeyResolver>,
    operations: KeyOperations,
    providers: BTreeMap<String, Arc<dyn InternalCryptoProvider>>,
    default_provider: String,
    hybrid: bool,
}

impl DefaultCryptoServiceBuilder {
    /// Use custom key operations (e.g. other primitives).
    pub fn operations(mut self, operations: KeyOperations) -> Self {
        self.operations = operations;
        self
    }

    /// Register an internal provider under its type name.
    pub fn internal_provider(mut self, provider: Arc<dyn InternalCryptoProvider>) -> Self {
        self.providers
            .insert(provider.provider_type().to_string(), provider);
        self
    }

    /// Provider type used when a descriptor names none. Defaults to `keystore`.
    pub fn default_internal_provider(mut self, provider_type: impl Into<String>) -> Self {
        self.default_provider = provider_type.into();
        self
    }

    /// Enable hybrid encryption.
    pub fn hybrid(mut self, enabled: bool) -> Self {
        self.hybrid = enabled;
        self
    }

    /// Build the service. The default internal provider must be registered.
    pub fn build(self) -> Result<DefaultCryptoService, CryptoServiceError> {
        if !self.providers.contains_key(&self.default_provider) {
            return Err(CryptoServiceError::Validation(format!(
                "default internal crypto provider '{}' is not registered",
                self.default_provider
            )));
        }
        let hybrid = self
            .hybrid
            .then(|| HybridEnvelopeBuilder::new(self.resolver.clone(), self.operations.clone()));
        tracing::debug!(
            providers = ?self.providers.keys().collect::<Vec<_>>(),
            default_provider = %self.default_provider,
            hybrid = hybrid.is_some(),
            "crypto service ready"
        );
        Ok(DefaultCryptoService {
            resolver: self.resolver,
            operations: self.operations,
            providers: self.providers,
            default_provider: self.default_provider,
            hybrid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::{KeyStoreInternalProvider, SymmetricKeyInternalProvider};
    use crate::keys::{PrivateKey, SymmetricKey};
    use crate::keystore::MemoryKeyStore;
    use crate::resolver::KeyStoreResolver;
    use csp_core::OwnerId;

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
            .with_secret_key("aes", SymmetricKey::new(vec![8u8; 32]).unwrap());
        Arc::new(KeyStoreResolver::new(Arc::new(store), "tenant", "pw"))
    }

    fn service(hybrid: bool) -> DefaultCryptoService {
        let r = resolver();
        let ops = KeyOperations::default();
        DefaultCryptoService::builder(r.clone())
            .internal_provider(Arc::new(
                KeyStoreInternalProvider::new(r.clone(), ops.clone(), "tenant").unwrap(),
            ))
            .internal_provider(Arc::new(
                SymmetricKeyInternalProvider::new(r, ops, "aes").unwrap(),
            ))
            .hybrid(hybrid)
            .build()
            .unwrap()
    }

    #[test]
    fn capabilities_follow_configuration() {
        let caps = service(true).capabilities();
        assert!(caps.supports(Capability::HybridEncryption));
        assert!(caps.supports(Capability::SelfContainedCiphertext));
        assert!(caps.supports(Capability::ProviderSelection));
        assert!(!service(false)
            .capabilities()
            .supports(Capability::HybridEncryption));
    }

    #[test]
    fn build_requires_default_provider() {
        let err = DefaultCryptoService::builder(resolver()).build().unwrap_err();
        assert!(matches!(err, CryptoServiceError::Validation(_)));
    }

    #[test]
    fn provider_selection() {
        let svc = service(false);
        let op = OperationDescriptor::default().internal_provider("symmetric");
        let ct = svc.encrypt(b"abc", &op).unwrap();
        assert_eq!(svc.decrypt(&ct, &op).unwrap(), b"abc");

        let unknown = OperationDescriptor::default().internal_provider("hsm");
        assert_eq!(
            svc.encrypt(b"abc", &unknown).unwrap_err().to_string(),
            PROVIDER_TYPE_ENCRYPT_UNSUPPORTED
        );
        assert!(svc.decrypt(b"abc", &unknown).unwrap_err().is_not_supported());
    }

    #[test]
    fn self_contained_on_symmetric_provider_is_not_supported() {
        let svc = service(false);
        let op = OperationDescriptor::default()
            .internal_provider("symmetric")
            .self_contained(true);
        let err = svc.encrypt(b"abc", &op).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Encryption with self contained cipher text is not supported by this implementation."
        );
    }

    #[test]
    fn hybrid_not_supported_without_builder() {
        let svc = service(false);
        let ctx = CryptoContext::new(OwnerId::new("tenant").unwrap());
        let d = AlgorithmSpec::default();
        let err = svc
            .hybrid_encrypt(&HybridEncryptionInput::new(b"x".to_vec()), &d, &d, &ctx)
            .unwrap_err();
        assert_eq!(err.to_string(), HYBRID_ENCRYPT_UNSUPPORTED);
    }

    #[test]
    fn trait_defaults_report_not_supported() {
        struct Minimal;
        impl CryptoService for Minimal {
            fn capabilities(&self) -> Capabilities {
                Capabilities::NONE
            }
            fn encrypt(&self, _: &[u8], _: &OperationDescriptor) -> Result<Vec<u8>, CryptoServiceError> {
                Ok(Vec::new())
            }
            fn decrypt(&self, _: &[u8], _: &OperationDescriptor) -> Result<Vec<u8>, CryptoServiceError> {
                Ok(Vec::new())
            }
            fn sign(&self, _: &[u8], _: &AlgorithmSpec, _: &CryptoContext) -> Result<Vec<u8>, CryptoServiceError> {
                Ok(Vec::new())
            }
            fn encrypt_for(&self, _: &[u8], _: &AlgorithmSpec, _: &CryptoContext) -> Result<Vec<u8>, CryptoServiceError> {
                Ok(Vec::new())
            }
            fn decrypt_from(&self, _: &[u8], _: &AlgorithmSpec, _: &CryptoContext) -> Result<Vec<u8>, CryptoServiceError> {
                Ok(Vec::new())
            }
            fn verify_signature(
                &self,
                _: &[u8],
                _: &[u8],
                _: &AlgorithmSpec,
                _: &CryptoContext,
            ) -> Result<bool, CryptoServiceError> {
                Ok(false)
            }
            fn certificate(&self, _: &CryptoContext) -> Result<Certificate, CryptoServiceError> {
                Err(CryptoServiceError::KeyResolution("none".into()))
            }
        }

        let svc: Box<dyn CryptoService> = Box::new(Minimal);
        let ctx = CryptoContext::new(OwnerId::new("x").unwrap());
        let d = AlgorithmSpec::default();
        let out = HybridEncryptionOutput {
            wrapped_key: vec![],
            ciphertext: vec![],
            nonce: vec![],
            associated_data: None,
            symmetric_algorithm: String::new(),
            asymmetric_algorithm: String::new(),
        };
        assert_eq!(
            svc.hybrid_decrypt(&out, &d, &d, &ctx).unwrap_err().to_string(),
            HYBRID_DECRYPT_UNSUPPORTED
        );
        assert!(svc
            .hybrid_encrypt(&HybridEncryptionInput::new(vec![]), &d, &d, &ctx)
            .unwrap_err()
            .is_not_supported());
    }
}
