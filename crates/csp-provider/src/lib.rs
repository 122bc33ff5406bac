//! # csp-provider — Key-Store-Backed Crypto Service
//!
//! Implements the [`CryptoService`] contract on top of a [`KeyStore`].
//!
//! ## Data Flow
//!
//! ```text
//! caller ─▶ service ─▶ resolver ─▶ key store
//!              │
//!              ├─▶ internal provider ─▶ operations ─▶ primitives
//!              │          └─▶ envelope (self-contained output)
//!              └─▶ hybrid builder ─▶ operations
//! ```
//!
//! Decryption of a self-contained ciphertext runs the other way: the
//! envelope is parsed, the resolver finds the certificate whose thumbprint
//! matches, and its private key decrypts the payload.
//!
//! ## Modules
//!
//! - [`keys`]: decoded private/public/secret keys and certificates.
//! - [`keystore`]: the [`KeyStore`] trait, [`MemoryKeyStore`], [`DirectoryKeyStore`].
//! - [`resolver`]: crypto context to key material.
//! - [`primitives`]: RSA, AES-GCM and Ed25519 behind [`CipherPrimitives`].
//! - [`operations`]: stateless operations with error wrapping.
//! - [`envelope`]: the self-contained ciphertext codec.
//! - [`internal`]: internal crypto providers.
//! - [`hybrid`]: hybrid envelope encryption.
//! - [`service`]: the facade.
//! - [`config`]: configuration and bootstrap.

pub mod config;
pub mod envelope;
pub mod hybrid;
pub mod internal;
pub mod keys;
pub mod keystore;
pub mod operations;
pub mod primitives;
pub mod resolver;
pub mod service;

pub use config::{ConfigError, CryptoServiceConfig};
pub use envelope::SelfContainedCiphertext;
pub use hybrid::HybridEnvelopeBuilder;
pub use internal::{InternalCryptoProvider, KeyStoreInternalProvider, SymmetricKeyInternalProvider};
pub use keys::{Certificate, KeyDecodeError, KeyMaterial, PrivateKey, PublicKey, SymmetricKey};
pub use keystore::{DirectoryKeyStore, KeyStore, MemoryKeyStore};
pub use operations::KeyOperations;
pub use primitives::{CipherPrimitives, RustCryptoPrimitives};
pub use resolver::{CertificateEntry, KeyResolver, KeyStoreResolver, NotFoundReason, Resolution};
pub use service::{CryptoService, DefaultCryptoService, DefaultCryptoServiceBuilder};
