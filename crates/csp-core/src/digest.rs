//! # Certificate Thumbprints
//!
//! A [`Thumbprint`] is the uppercase hex digest of a certificate's DER
//! encoding, tagged with the [`DigestAlgorithm`] that produced it. It lets a
//! decrypting party pick the right private key out of a store. It is a
//! matching aid, not a security guarantee.
//!
//! Algorithm names follow the `SHA-1` / `SHA-256` spelling used on the
//! wire by self-contained ciphertexts.

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::encoding::{bytes_to_hex_upper, hex_to_bytes};
use crate::error::CryptoServiceError;

/// Hash algorithm used for thumbprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-1. The default for self-contained ciphertexts.
    #[serde(rename = "SHA-1")]
    Sha1,
    /// SHA-256.
    #[serde(rename = "SHA-256")]
    Sha256,
    /// SHA-384.
    #[serde(rename = "SHA-384")]
    Sha384,
    /// SHA-512.
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl DigestAlgorithm {
    /// Returns the wire name (`SHA-1`, `SHA-256`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Length of the digest output in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Hash `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = CryptoServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHA-1" | "SHA1" => Ok(Self::Sha1),
            "SHA-256" | "SHA256" => Ok(Self::Sha256),
            "SHA-384" | "SHA384" => Ok(Self::Sha384),
            "SHA-512" | "SHA512" => Ok(Self::Sha512),
            _ => Err(CryptoServiceError::Validation(format!(
                "unknown digest algorithm: {s:?}"
            ))),
        }
    }
}

/// Digest of a certificate's DER encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Thumbprint {
    value: String,
    digest_algorithm: DigestAlgorithm,
}

impl Thumbprint {
    /// Compute the thumbprint of a DER-encoded certificate.
    pub fn compute(der: &[u8], digest_algorithm: DigestAlgorithm) -> Self {
        Self {
            value: bytes_to_hex_upper(&digest_algorithm.digest(der)),
            digest_algorithm,
        }
    }

    /// Parse a hex thumbprint as found in a ciphertext envelope.
    ///
    /// Case is normalized to uppercase. The length must match the digest
    /// algorithm's output size.
    pub fn from_hex(
        value: &str,
        digest_algorithm: DigestAlgorithm,
    ) -> Result<Self, CryptoServiceError> {
        let value = value.trim();
        let bytes = hex_to_bytes(value).map_err(CryptoServiceError::Validation)?;
        if bytes.len() != digest_algorithm.output_len() {
            return Err(CryptoServiceError::Validation(format!(
                "{digest_algorithm} thumbprint must be {} bytes, got {}",
                digest_algorithm.output_len(),
                bytes.len()
            )));
        }
        Ok(Self {
            value: value.to_ascii_uppercase(),
            digest_algorithm,
        })
    }

    /// Uppercase hex value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Algorithm that produced the value.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    /// Whether `der` hashes to this thumbprint.
    pub fn matches(&self, der: &[u8]) -> bool {
        Self::compute(der, self.digest_algorithm) == *self
    }
}

impl std::fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.digest_algorithm, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_lengths() {
        for alg in [
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            assert_eq!(alg.digest(b"abc").len(), alg.output_len());
        }
    }

    #[test]
    fn sha1_known_vector() {
        let tp = Thumbprint::compute(b"abc", DigestAlgorithm::Sha1);
        assert_eq!(tp.value(), "A9993E364706816ABA3E25717850C26C9CD0D89D");
        assert_eq!(tp.digest_algorithm(), DigestAlgorithm::Sha1);
        assert!(tp.matches(b"abc"));
        assert!(!tp.matches(b"abd"));
    }

    #[test]
    fn parse_algorithm_names() {
        assert_eq!("SHA-1".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha1);
        assert_eq!("sha1".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha1);
        assert_eq!(
            "SHA-256".parse::<DigestAlgorithm>().unwrap(),
            DigestAlgorithm::Sha256
        );
        assert!("MD5".parse::<DigestAlgorithm>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&DigestAlgorithm::Sha1).unwrap();
        assert_eq!(json, "\"SHA-1\"");
        let back: DigestAlgorithm = serde_json::from_str("\"SHA-512\"").unwrap();
        assert_eq!(back, DigestAlgorithm::Sha512);
    }

    #[test]
    fn from_hex_normalizes_case() {
        let tp = Thumbprint::from_hex(
            "a9993e364706816aba3e25717850c26c9cd0d89d",
            DigestAlgorithm::Sha1,
        )
        .unwrap();
        assert_eq!(tp, Thumbprint::compute(b"abc", DigestAlgorithm::Sha1));
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(Thumbprint::from_hex("XYZ", DigestAlgorithm::Sha1).is_err());
        assert!(Thumbprint::from_hex("ABCD", DigestAlgorithm::Sha1).is_err());
        assert!(Thumbprint::from_hex(
            "A9993E364706816ABA3E25717850C26C9CD0D89D",
            DigestAlgorithm::Sha256
        )
        .is_err());
    }

    #[test]
    fn display_includes_algorithm() {
        let tp = Thumbprint::compute(b"abc", DigestAlgorithm::Sha1);
        assert!(tp.to_string().starts_with("SHA-1:A9993E"));
    }
}
