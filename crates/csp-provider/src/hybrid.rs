//! # Hybrid Envelope Encryption
//!
//! Payloads are encrypted with a fresh AES-256-GCM data key and a fresh
//! 96-bit nonce; the data key is wrapped with the recipient certificate's
//! public key. Only the wrapped key leaves this module.

use std::sync::Arc;

use csp_core::{
    AlgorithmSpec, CryptoContext, CryptoServiceError, HybridEncryptionInput,
    HybridEncryptionOutput, DEFAULT_ASYMMETRIC_ALGORITHM, DEFAULT_SYMMETRIC_ALGORITHM,
};
use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

use crate::keys::{KeyMaterial, SymmetricKey};
use crate::operations::KeyOperations;
use crate::primitives::GCM_NONCE_LEN;
use crate::resolver::KeyResolver;

/// Builds and opens hybrid envelopes for a resolved recipient.
#[derive(Clone)]
pub struct HybridEnvelopeBuilder {
    resolver: Arc<dyn KeyResolver>,
    operations: KeyOperations,
}

impl HybridEnvelopeBuilder {
    /// Builder over the given resolver and operations.
    pub fn new(resolver: Arc<dyn KeyResolver>, operations: KeyOperations) -> Self {
        Self {
            resolver,
            operations,
        }
    }

    /// Encrypt `input` for the certificate resolved from `ctx`.
    ///
    /// Blank algorithms default to `AES/GCM/NoPadding` and `RSA`.
    pub fn build(
        &self,
        input: &HybridEncryptionInput,
        symmetric: &AlgorithmSpec,
        asymmetric: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<HybridEncryptionOutput, CryptoServiceError> {
        let symmetric = symmetric.or_default(DEFAULT_SYMMETRIC_ALGORITHM);
        let asymmetric = asymmetric.or_default(DEFAULT_ASYMMETRIC_ALGORITHM);
        let cert = self.resolver.resolve_certificate(ctx)?.require("certificate")?;

        let data_key = SymmetricKey::generate();
        let mut nonce = [0u8; GCM_NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let aad = input.associated_data.as_deref().unwrap_or_default();

        let ciphertext =
            self.operations
                .seal(&input.cleartext, &data_key, &nonce, aad, &symmetric)?;
        let wrapped_key = self.operations.encrypt(
            data_key.as_bytes(),
            &KeyMaterial::Certificate(cert),
            &asymmetric,
        )?;
        tracing::debug!(%ctx, symmetric = %symmetric, asymmetric = %asymmetric, "built hybrid envelope");

        Ok(HybridEncryptionOutput {
            wrapped_key,
            ciphertext,
            nonce: nonce.to_vec(),
            associated_data: input.associated_data.clone(),
            symmetric_algorithm: symmetric.algorithm().to_string(),
            asymmetric_algorithm: asymmetric.algorithm().to_string(),
        })
    }

    /// Decrypt an envelope with the private key resolved from `ctx`.
    ///
    /// The algorithms must match those recorded in `output`.
    pub fn open(
        &self,
        output: &HybridEncryptionOutput,
        symmetric: &AlgorithmSpec,
        asymmetric: &AlgorithmSpec,
        ctx: &CryptoContext,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        let symmetric = symmetric.or_default(DEFAULT_SYMMETRIC_ALGORITHM);
        let asymmetric = asymmetric.or_default(DEFAULT_ASYMMETRIC_ALGORITHM);
        check_recorded("symmetric", &symmetric, &output.symmetric_algorithm)?;
        check_recorded("asymmetric", &asymmetric, &output.asymmetric_algorithm)?;

        let private_key = self.resolver.resolve_private_key(ctx)?.require("private key")?;
        let key_bytes = Zeroizing::new(self.operations.decrypt(
            &output.wrapped_key,
            &KeyMaterial::Private(private_key),
            &asymmetric,
        )?);
        let data_key = SymmetricKey::new(key_bytes.to_vec()).map_err(|e| {
            CryptoServiceError::operation("unwrapped data key is not a valid AES key", e)
        })?;
        let aad = output.associated_data.as_deref().unwrap_or_default();
        let cleartext =
            self.operations
                .open(&output.ciphertext, &data_key, &output.nonce, aad, &symmetric)?;
        tracing::debug!(%ctx, "opened hybrid envelope");
        Ok(cleartext)
    }
}

fn check_recorded(
    role: &str,
    requested: &AlgorithmSpec,
    recorded: &str,
) -> Result<(), CryptoServiceError> {
    if requested.algorithm().trim().eq_ignore_ascii_case(recorded.trim()) {
        Ok(())
    } else {
        Err(CryptoServiceError::Validation(format!(
            "{role} algorithm '{}' does not match the envelope's '{recorded}'",
            requested.algorithm()
        )))
    }
}

impl std::fmt::Debug for HybridEnvelopeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridEnvelopeBuilder")
            .field("operations", &self.operations)
            .finish()
    }
}
