//! # Key Operations
//!
//! Stateless encrypt/decrypt/sign/verify over already-resolved key
//! material. This is where algorithm names get parsed, the blank-algorithm
//! default is applied, and primitive failures are wrapped into
//! [`CryptoServiceError::CryptoOperation`] with their cause preserved.

use std::sync::Arc;

use csp_core::{
    AlgorithmSpec, CryptoServiceError, PrimitiveError, Transformation,
    DEFAULT_ASYMMETRIC_ALGORITHM,
};

use crate::keys::{KeyMaterial, PrivateKey, PublicKey, SymmetricKey};
use crate::primitives::{CipherPrimitives, RustCryptoPrimitives};

#[derive(Debug, Clone, Copy)]
enum Action {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
}

impl Action {
    fn gerund(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypting",
            Self::Decrypt => "decrypting",
            Self::Sign => "signing",
            Self::Verify => "verifying",
        }
    }
}

/// Stateless cryptographic operations over a [`CipherPrimitives`] backend.
#[derive(Clone)]
pub struct KeyOperations {
    primitives: Arc<dyn CipherPrimitives>,
}

impl Default for KeyOperations {
    fn default() -> Self {
        Self::new(Arc::new(RustCryptoPrimitives::new()))
    }
}

impl KeyOperations {
    /// Operations over the given primitives.
    pub fn new(primitives: Arc<dyn CipherPrimitives>) -> Self {
        Self { primitives }
    }

    /// The underlying primitives.
    pub fn primitives(&self) -> &Arc<dyn CipherPrimitives> {
        &self.primitives
    }

    /// Encrypt with `key`. A blank algorithm means `RSA`.
    pub fn encrypt(
        &self,
        cleartext: &[u8],
        key: &KeyMaterial,
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let spec = spec.or_default(DEFAULT_ASYMMETRIC_ALGORITHM);
        let result = spec.transformation().and_then(|t| {
            self.primitives
                .encrypt(t, spec.provider(), key, cleartext)
        });
        self.finish(Action::Encrypt, &spec, &key.describe(), result)
    }

    /// Decrypt with `key`. A blank algorithm means `RSA`.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &KeyMaterial,
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let spec = spec.or_default(DEFAULT_ASYMMETRIC_ALGORITHM);
        let result = spec.transformation().and_then(|t| {
            self.primitives
                .decrypt(t, spec.provider(), key, ciphertext)
        });
        self.finish(Action::Decrypt, &spec, &key.describe(), result)
    }

    /// AES-GCM with a caller-chosen nonce and associated data.
    pub fn seal(
        &self,
        cleartext: &[u8],
        key: &SymmetricKey,
        nonce: &[u8],
        aad: &[u8],
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let result = require_aead(spec).and_then(|()| {
            self.primitives
                .seal(spec.provider(), key, nonce, cleartext, aad)
        });
        self.finish(Action::Encrypt, spec, &format!("AES-{} key", key.bits()), result)
    }

    /// Inverse of [`KeyOperations::seal`].
    pub fn open(
        &self,
        ciphertext: &[u8],
        key: &SymmetricKey,
        nonce: &[u8],
        aad: &[u8],
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let result = require_aead(spec).and_then(|()| {
            self.primitives
                .open(spec.provider(), key, nonce, ciphertext, aad)
        });
        self.finish(Action::Decrypt, spec, &format!("AES-{} key", key.bits()), result)
    }

    /// Sign `data` with `key` under the named signature scheme.
    pub fn sign(
        &self,
        data: &[u8],
        key: &PrivateKey,
        spec: &AlgorithmSpec,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let result = spec
            .signature_scheme()
            .and_then(|s| self.primitives.sign(s, spec.provider(), key, data));
        let key = format!("{} private key", key.algorithm());
        self.finish(Action::Sign, spec, &key, result)
    }

    /// Verify `signature` over `data`. A mismatch is `Ok(false)`.
    pub fn verify(
        &self,
        data: &[u8],
        signature: &[u8],
        key: &PublicKey,
        spec: &AlgorithmSpec,
    ) -> Result<bool, CryptoServiceError> {
        let result = spec
            .signature_scheme()
            .and_then(|s| self.primitives.verify(s, spec.provider(), key, data, signature));
        let key = format!("{} public key", key.algorithm());
        let valid = self.finish(Action::Verify, spec, &key, result)?;
        if !valid {
            tracing::debug!(algorithm = spec.algorithm(), "signature did not match");
        }
        Ok(valid)
    }

    fn finish<T>(
        &self,
        action: Action,
        spec: &AlgorithmSpec,
        key: &str,
        result: Result<T, PrimitiveError>,
    ) -> Result<T, CryptoServiceError> {
        match result {
            Ok(value) => {
                tracing::debug!(
                    algorithm = spec.algorithm(),
                    provider = spec.provider_label(),
                    key,
                    "{} succeeded",
                    action.gerund()
                );
                Ok(value)
            }
            Err(cause) => {
                let message = operation_error_message(action, spec);
                tracing::debug!(error = %cause, "{message}");
                Err(CryptoServiceError::operation(message, cause))
            }
        }
    }
}

fn require_aead(spec: &AlgorithmSpec) -> Result<(), PrimitiveError> {
    match spec.transformation()? {
        Transformation::AesGcm => Ok(()),
        _ => Err(PrimitiveError::AlgorithmNotAvailable(format!(
            "{} is not an AEAD transformation",
            spec.algorithm()
        ))),
    }
}

fn operation_error_message(action: Action, spec: &AlgorithmSpec) -> String {
    format!(
        "An error occurred while {} using the algorithm '{}' and the security provider '{}'",
        action.gerund(),
        spec.algorithm(),
        spec.provider_label()
    )
}

impl std::fmt::Debug for KeyOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyOperations")
            .field("primitives", &self.primitives.name())
            .finish()
    }
}
