//! # csp-core — Foundational Types for the Crypto Service
//!
//! This crate defines the vocabulary shared by every crypto service
//! implementation. It depends on nothing internal; `csp-provider` and
//! `csp-cli` build on top of it.
//!
//! ## Key Design Principles
//!
//! 1. **One error taxonomy.** Every operation surfaces a
//!    [`CryptoServiceError`]; primitive-level causes are preserved as
//!    [`PrimitiveError`] sources, never flattened into strings.
//!
//! 2. **Contexts, not aliases.** Callers describe *whose* key they need with
//!    a [`CryptoContext`]; turning that into an alias is the resolver's job.
//!
//! 3. **One operation descriptor.** The encrypt/decrypt overload family
//!    (algorithm, provider, self-contained flag, internal provider type)
//!    collapses into a single [`OperationDescriptor`].
//!
//! 4. **Lazy algorithm validation.** [`AlgorithmSpec`] holds names as given.
//!    They are parsed into [`Transformation`] / [`SignatureScheme`] only
//!    when an operation executes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `csp-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod algorithm;
pub mod capability;
pub mod context;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod hybrid;

// Re-export primary types for ergonomic imports.
pub use algorithm::{
    AlgorithmSpec, OaepDigest, OperationDescriptor, SignatureScheme, Transformation,
    DEFAULT_ASYMMETRIC_ALGORITHM, DEFAULT_SYMMETRIC_ALGORITHM,
};
pub use capability::{Capabilities, Capability};
pub use context::{CryptoContext, KeyUsage, OwnerId};
pub use digest::{DigestAlgorithm, Thumbprint};
pub use error::{CryptoServiceError, KeyStoreError, PrimitiveError};
pub use hybrid::{HybridEncryptionInput, HybridEncryptionOutput};
