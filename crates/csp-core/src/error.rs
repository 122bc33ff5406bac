//! # Error Types — Crypto Service Error Taxonomy
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - [`CryptoServiceError`] is the only error a caller of the service sees.
//! - Failures of the underlying cipher primitives are [`PrimitiveError`]s and
//!   travel as the `source` of a [`CryptoServiceError::CryptoOperation`].
//! - Failures of the key store are [`KeyStoreError`]s and travel as the
//!   `source` of a [`CryptoServiceError::KeyStoreAccess`].
//! - A signature that does not match is not an error. Verification returns
//!   `Ok(false)`.

use thiserror::Error;

/// Boxed error cause carried by service errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for crypto service operations.
#[derive(Error, Debug)]
pub enum CryptoServiceError {
    /// The crypto context could not be mapped to a key or certificate.
    #[error("key resolution failed: {0}")]
    KeyResolution(String),

    /// The key store could not be read (unreachable, locked, wrong password).
    #[error("key store access failed: {message}")]
    KeyStoreAccess {
        /// What the service was trying to do.
        message: String,
        /// Underlying store failure, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The underlying primitive rejected the input, algorithm, or key.
    #[error("{message}")]
    CryptoOperation {
        /// Operation summary (algorithm and security provider).
        message: String,
        /// Underlying primitive failure, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// A self-contained ciphertext could not be parsed.
    #[error("malformed self-contained ciphertext: {0}")]
    MalformedEnvelope(String),

    /// The optional capability is not implemented by this provider.
    #[error("{0}")]
    NotSupported(String),

    /// Caller input failed validation before any cryptography ran.
    #[error("validation error: {0}")]
    Validation(String),
}

impl CryptoServiceError {
    /// Build a [`CryptoServiceError::CryptoOperation`] wrapping a cause.
    pub fn operation(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::CryptoOperation {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build a [`CryptoServiceError::KeyStoreAccess`] wrapping a cause.
    pub fn store_access(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::KeyStoreAccess {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns `true` for [`CryptoServiceError::NotSupported`].
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }
}

/// Failure reported by the cipher primitive capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// The named algorithm or transformation is unknown or malformed.
    #[error("algorithm not available: {0}")]
    AlgorithmNotAvailable(String),

    /// The named security provider is not installed.
    #[error("security provider not available: {0}")]
    ProviderNotAvailable(String),

    /// The key cannot be used with the requested algorithm.
    #[error("key incompatible with algorithm: {0}")]
    KeyIncompatible(String),

    /// Missing or malformed parameters (IV, signature bytes, input size).
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Padding, block size, or authentication tag check failed.
    #[error("bad padding or authentication failure: {0}")]
    BadPadding(String),
}

/// Failure reported by a key store.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// The store cannot be opened or read.
    #[error("key store unavailable: {0}")]
    Unavailable(String),

    /// The password supplied for a key entry is wrong.
    #[error("wrong password for key entry '{alias}'")]
    WrongPassword {
        /// Alias of the protected entry.
        alias: String,
    },

    /// An entry exists but its contents cannot be decoded.
    #[error("key entry '{alias}' is corrupt: {reason}")]
    Corrupt {
        /// Alias of the corrupt entry.
        alias: String,
        /// Decoder message.
        reason: String,
    },

    /// The alias contains characters the store does not accept.
    #[error("invalid key alias: {0:?}")]
    InvalidAlias(String),

    /// I/O error (directory-backed stores).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
