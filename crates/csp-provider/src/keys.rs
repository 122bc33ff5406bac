//! # Key Material
//!
//! Decoded keys and certificates as handed out by a [`KeyStore`]. The core
//! clones what it needs per call and drops it when the call returns.
//!
//! ## Security Invariants
//!
//! - Private and symmetric key bytes are zeroized on drop (`rsa` and
//!   `ed25519-dalek` zeroize their own state, symmetric keys are held in
//!   [`Zeroizing`]).
//! - `Debug` output never contains key bytes.
//!
//! [`KeyStore`]: crate::keystore::KeyStore

use chrono::{DateTime, Utc};
use csp_core::encoding::{bytes_to_hex_upper, hex_to_bytes};
use csp_core::{DigestAlgorithm, Thumbprint};
use ed25519_dalek::{SigningKey, VerifyingKey};
use pkcs8::der::Document;
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncryptedPrivateKeyInfo};
use rand_core::{OsRng, RngCore};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;
use x509_cert::der::{Decode, DecodePem, Encode};
use zeroize::Zeroizing;

/// Why a key or certificate blob could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyDecodeError {
    /// The blob is encrypted and the password does not open it.
    #[error("wrong password")]
    WrongPassword,
    /// The blob is not a supported key or certificate.
    #[error("{0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Private keys
// ---------------------------------------------------------------------------

/// An asymmetric private key.
#[derive(Clone)]
pub enum PrivateKey {
    /// RSA private key.
    Rsa(Box<RsaPrivateKey>),
    /// Ed25519 signing key.
    Ed25519(SigningKey),
}

impl PrivateKey {
    /// Decode an unencrypted PKCS#8 `PrivateKeyInfo` (RSA first, then Ed25519).
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, KeyDecodeError> {
        if let Ok(key) = RsaPrivateKey::from_pkcs8_der(der) {
            return Ok(Self::Rsa(Box::new(key)));
        }
        SigningKey::from_pkcs8_der(der)
            .map(Self::Ed25519)
            .map_err(|e| KeyDecodeError::Malformed(format!("unsupported PKCS#8 private key: {e}")))
    }

    /// Decode a PKCS#8 key in PEM or DER form, decrypting it with `password`
    /// when it is an `EncryptedPrivateKeyInfo`. Unencrypted keys ignore the
    /// password.
    pub fn from_pkcs8(bytes: &[u8], password: &[u8]) -> Result<Self, KeyDecodeError> {
        if looks_like_pem(bytes) {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| KeyDecodeError::Malformed(format!("PEM is not UTF-8: {e}")))?;
            let (label, doc) = Document::from_pem(text)
                .map_err(|e| KeyDecodeError::Malformed(format!("invalid PEM: {e}")))?;
            return match label {
                "ENCRYPTED PRIVATE KEY" => Self::decrypt_pkcs8(doc.as_bytes(), password),
                "PRIVATE KEY" => Self::from_pkcs8_der(doc.as_bytes()),
                other => Err(KeyDecodeError::Malformed(format!(
                    "unexpected PEM label {other:?}"
                ))),
            };
        }
        if EncryptedPrivateKeyInfo::try_from(bytes).is_ok() {
            Self::decrypt_pkcs8(bytes, password)
        } else {
            Self::from_pkcs8_der(bytes)
        }
    }

    // A decryption that "succeeds" but yields an undecodable key is also a
    // wrong password: CBC padding alone cannot tell the two apart.
    fn decrypt_pkcs8(der: &[u8], password: &[u8]) -> Result<Self, KeyDecodeError> {
        let info = EncryptedPrivateKeyInfo::try_from(der)
            .map_err(|e| KeyDecodeError::Malformed(format!("invalid encrypted key: {e}")))?;
        let secret = info
            .decrypt(password)
            .map_err(|_| KeyDecodeError::WrongPassword)?;
        Self::from_pkcs8_der(secret.as_bytes()).map_err(|_| KeyDecodeError::WrongPassword)
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Rsa(key) => PublicKey::Rsa(key.to_public_key()),
            Self::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
        }
    }

    /// Key algorithm name.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "RSA",
            Self::Ed25519(_) => "Ed25519",
        }
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa(key) => write!(f, "PrivateKey::Rsa({} bits, [REDACTED])", key.size() * 8),
            Self::Ed25519(_) => f.write_str("PrivateKey::Ed25519([REDACTED])"),
        }
    }
}

// ---------------------------------------------------------------------------
// Public keys
// ---------------------------------------------------------------------------

/// An asymmetric public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// RSA public key.
    Rsa(RsaPublicKey),
    /// Ed25519 verifying key.
    Ed25519(VerifyingKey),
}

impl PublicKey {
    /// Decode a DER `SubjectPublicKeyInfo`.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, KeyDecodeError> {
        if let Ok(key) = RsaPublicKey::from_public_key_der(der) {
            return Ok(Self::Rsa(key));
        }
        VerifyingKey::from_public_key_der(der)
            .map(Self::Ed25519)
            .map_err(|e| KeyDecodeError::Malformed(format!("unsupported public key: {e}")))
    }

    /// Key algorithm name.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "RSA",
            Self::Ed25519(_) => "Ed25519",
        }
    }
}

// ---------------------------------------------------------------------------
// Symmetric keys
// ---------------------------------------------------------------------------

/// A secret AES key (128 or 256 bits).
#[derive(Clone)]
pub struct SymmetricKey(Zeroizing<Vec<u8>>);

impl SymmetricKey {
    /// Wrap raw key bytes. Only 16- and 32-byte keys are accepted.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, KeyDecodeError> {
        let bytes = Zeroizing::new(bytes.into());
        match bytes.len() {
            16 | 32 => Ok(Self(bytes)),
            n => Err(KeyDecodeError::Malformed(format!(
                "AES key must be 16 or 32 bytes, got {n}"
            ))),
        }
    }

    /// Parse a hex-encoded key. Surrounding whitespace is ignored.
    pub fn from_hex(hex: &str) -> Result<Self, KeyDecodeError> {
        let bytes = Zeroizing::new(hex_to_bytes(hex.trim()).map_err(KeyDecodeError::Malformed)?);
        Self::new(bytes.to_vec())
    }

    /// Fresh random 256-bit key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; 32]);
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bits.
    pub fn bits(&self) -> usize {
        self.0.len() * 8
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymmetricKey({} bits, [REDACTED])", self.bits())
    }
}

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

/// A parsed X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    public_key: PublicKey,
    subject: String,
    issuer: String,
    serial_number: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl Certificate {
    /// Parse a certificate from PEM or DER bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyDecodeError> {
        if looks_like_pem(bytes) {
            Self::from_pem(bytes)
        } else {
            Self::from_der(bytes)
        }
    }

    /// Parse a PEM `CERTIFICATE` block.
    pub fn from_pem(pem: &[u8]) -> Result<Self, KeyDecodeError> {
        let cert = x509_cert::Certificate::from_pem(pem)
            .map_err(|e| KeyDecodeError::Malformed(format!("invalid certificate PEM: {e}")))?;
        let der = cert
            .to_der()
            .map_err(|e| KeyDecodeError::Malformed(format!("certificate re-encoding: {e}")))?;
        Self::from_parsed(cert, der)
    }

    /// Parse a DER certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, KeyDecodeError> {
        let cert = x509_cert::Certificate::from_der(der)
            .map_err(|e| KeyDecodeError::Malformed(format!("invalid certificate DER: {e}")))?;
        Self::from_parsed(cert, der.to_vec())
    }

    fn from_parsed(cert: x509_cert::Certificate, der: Vec<u8>) -> Result<Self, KeyDecodeError> {
        let tbs = &cert.tbs_certificate;
        let spki = tbs
            .subject_public_key_info
            .to_der()
            .map_err(|e| KeyDecodeError::Malformed(format!("certificate public key: {e}")))?;
        let public_key = PublicKey::from_spki_der(&spki)?;
        Ok(Self {
            der,
            public_key,
            subject: tbs.subject.to_string(),
            issuer: tbs.issuer.to_string(),
            serial_number: bytes_to_hex_upper(tbs.serial_number.as_bytes()),
            not_before: to_utc(tbs.validity.not_before.to_unix_duration())?,
            not_after: to_utc(tbs.validity.not_after.to_unix_duration())?,
        })
    }

    /// DER encoding, the input of thumbprint computation.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Subject distinguished name (RFC 4514 string form).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer distinguished name.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Serial number as uppercase hex.
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Start of the validity window.
    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// End of the validity window.
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Whether `at` falls inside the validity window.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }

    /// Thumbprint of the DER encoding.
    pub fn thumbprint(&self, digest_algorithm: DigestAlgorithm) -> Thumbprint {
        Thumbprint::compute(&self.der, digest_algorithm)
    }
}

impl std::fmt::Display for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (serial {})", self.subject, self.serial_number)
    }
}

fn to_utc(since_epoch: std::time::Duration) -> Result<DateTime<Utc>, KeyDecodeError> {
    i64::try_from(since_epoch.as_secs())
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .ok_or_else(|| KeyDecodeError::Malformed("certificate validity out of range".into()))
}

fn looks_like_pem(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"-----BEGIN")
}

// ---------------------------------------------------------------------------
// KeyMaterial
// ---------------------------------------------------------------------------

/// Key material resolved for a single operation.
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    /// A private key (decrypt, sign).
    Private(PrivateKey),
    /// A bare public key (encrypt, verify).
    Public(PublicKey),
    /// A secret key (symmetric encrypt/decrypt).
    Symmetric(SymmetricKey),
    /// A certificate; its public key is used.
    Certificate(Certificate),
}

impl KeyMaterial {
    /// Short description for log lines. Never includes key bytes.
    pub fn describe(&self) -> String {
        match self {
            Self::Private(k) => format!("{} private key", k.algorithm()),
            Self::Public(k) => format!("{} public key", k.algorithm()),
            Self::Symmetric(k) => format!("AES-{} key", k.bits()),
            Self::Certificate(c) => format!("certificate {}", c.subject()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TENANT_KEY: &[u8] = include_bytes!("../tests/fixtures/keystore/tenant.key");
    const TENANT_CRT: &[u8] = include_bytes!("../tests/fixtures/keystore/tenant.crt");
    const SIGNER_KEY: &[u8] = include_bytes!("../tests/fixtures/keystore/signer.key");
    const SIGNER_CRT: &[u8] = include_bytes!("../tests/fixtures/keystore/signer.crt");
    const PARTNER_CRT: &[u8] = include_bytes!("../tests/fixtures/keystore/partner.crt");

    #[test]
    fn encrypted_rsa_key_decodes_with_password() {
        let key = PrivateKey::from_pkcs8(TENANT_KEY, b"tenant-pass").unwrap();
        assert_eq!(key.algorithm(), "RSA");
        let cert = Certificate::from_bytes(TENANT_CRT).unwrap();
        assert_eq!(&key.public_key(), cert.public_key());
    }

    #[test]
    fn encrypted_key_rejects_wrong_password() {
        assert_eq!(
            PrivateKey::from_pkcs8(TENANT_KEY, b"not-the-password").unwrap_err(),
            KeyDecodeError::WrongPassword
        );
    }

    #[test]
    fn ed25519_key_decodes() {
        let key = PrivateKey::from_pkcs8(SIGNER_KEY, b"signer-pass").unwrap();
        assert_eq!(key.algorithm(), "Ed25519");
        let cert = Certificate::from_bytes(SIGNER_CRT).unwrap();
        assert_eq!(cert.public_key().algorithm(), "Ed25519");
        assert_eq!(&key.public_key(), cert.public_key());
    }

    #[test]
    fn pem_and_der_certificates() {
        let pem = Certificate::from_bytes(TENANT_CRT).unwrap();
        assert!(pem.subject().contains("CN=tenant.example.org"));
        assert_eq!(
            pem.thumbprint(DigestAlgorithm::Sha1).value(),
            "E53E6CBD69A9BE19773656D00500BC4C4A42B5DC"
        );
        let der = Certificate::from_bytes(PARTNER_CRT).unwrap();
        assert!(der.subject().contains("CN=partner.example.net"));
        assert_eq!(der.der(), PARTNER_CRT);
        assert!(der.not_before() < der.not_after());
        assert!(der.is_valid_at(der.not_before()));
        assert!(!der.serial_number().is_empty());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            Certificate::from_bytes(b"not a certificate"),
            Err(KeyDecodeError::Malformed(_))
        ));
        assert!(matches!(
            PrivateKey::from_pkcs8(b"\x30\x03\x02\x01\x00", b""),
            Err(KeyDecodeError::Malformed(_))
        ));
    }

    #[test]
    fn symmetric_key_lengths() {
        assert!(SymmetricKey::new(vec![0u8; 16]).is_ok());
        assert!(SymmetricKey::new(vec![0u8; 32]).is_ok());
        assert!(SymmetricKey::new(vec![0u8; 20]).is_err());
        assert_eq!(SymmetricKey::generate().bits(), 256);
        assert!(SymmetricKey::from_hex("zz").is_err());
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = SymmetricKey::new(vec![0xAB; 16]).unwrap();
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.to_lowercase().contains("abab"));

        let rsa = PrivateKey::from_pkcs8(TENANT_KEY, b"tenant-pass").unwrap();
        assert_eq!(format!("{rsa:?}"), "PrivateKey::Rsa(2048 bits, [REDACTED])");
        assert_eq!(
            KeyMaterial::Private(rsa).describe(),
            "RSA private key"
        );
    }
}
