//! # Hybrid Encryption Records
//!
//! Input and output records of envelope (hybrid) encryption. Byte fields
//! travel as base64 strings in JSON. The symmetric data key never appears
//! here in the clear, only wrapped under the recipient's public key.

use serde::{Deserialize, Serialize};

use crate::encoding::{base64_bytes, base64_opt};
use crate::error::CryptoServiceError;

/// Cleartext plus optional associated data to bind into the AEAD tag.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct HybridEncryptionInput {
    /// Payload to encrypt.
    #[serde(with = "base64_bytes")]
    pub cleartext: Vec<u8>,
    /// Authenticated but unencrypted data.
    #[serde(with = "base64_opt", skip_serializing_if = "Option::is_none")]
    pub associated_data: Option<Vec<u8>>,
}

// Cleartext is optional on the wire so a missing field can be reported as a
// validation failure rather than a parse error.
#[derive(Deserialize)]
struct RawHybridInput {
    #[serde(with = "base64_opt", default)]
    cleartext: Option<Vec<u8>>,
    #[serde(with = "base64_opt", default)]
    associated_data: Option<Vec<u8>>,
}

impl HybridEncryptionInput {
    /// Input without associated data.
    pub fn new(cleartext: impl Into<Vec<u8>>) -> Self {
        Self {
            cleartext: cleartext.into(),
            associated_data: None,
        }
    }

    /// Attach associated data.
    pub fn with_associated_data(mut self, aad: impl Into<Vec<u8>>) -> Self {
        self.associated_data = Some(aad.into());
        self
    }

    /// Parse from JSON. A missing or null `cleartext` is a validation error.
    pub fn from_json(json: &str) -> Result<Self, CryptoServiceError> {
        let raw: RawHybridInput = serde_json::from_str(json)
            .map_err(|e| CryptoServiceError::Validation(format!("hybrid input: {e}")))?;
        let cleartext = raw
            .cleartext
            .ok_or_else(|| CryptoServiceError::Validation("Plaintext can't be null.".into()))?;
        Ok(Self {
            cleartext,
            associated_data: raw.associated_data,
        })
    }
}

impl std::fmt::Debug for HybridEncryptionInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridEncryptionInput")
            .field("cleartext", &format_args!("[{} bytes]", self.cleartext.len()))
            .field(
                "associated_data",
                &self.associated_data.as_ref().map(|a| a.len()),
            )
            .finish()
    }
}

/// Result of hybrid encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridEncryptionOutput {
    /// Data key wrapped under the recipient's public key.
    #[serde(with = "base64_bytes")]
    pub wrapped_key: Vec<u8>,
    /// AEAD ciphertext including the authentication tag.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// AEAD nonce.
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,
    /// Associated data bound into the tag, if any.
    #[serde(with = "base64_opt", default, skip_serializing_if = "Option::is_none")]
    pub associated_data: Option<Vec<u8>>,
    /// Transformation used for the payload.
    pub symmetric_algorithm: String,
    /// Transformation used to wrap the data key.
    pub asymmetric_algorithm: String,
}

impl HybridEncryptionOutput {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, CryptoServiceError> {
        serde_json::to_string(self)
            .map_err(|e| CryptoServiceError::Validation(format!("hybrid output: {e}")))
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, CryptoServiceError> {
        serde_json::from_str(json).map_err(|e| {
            CryptoServiceError::MalformedEnvelope(format!("hybrid output: {e}"))
        })
    }
}
