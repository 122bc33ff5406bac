//! # Algorithm Descriptors
//!
//! [`AlgorithmSpec`] carries a transformation (or signature scheme) name and
//! an optional security-provider hint exactly as the caller supplied them.
//! Names are only interpreted when an operation runs, through
//! [`Transformation::parse`] and [`SignatureScheme::parse`]. An unknown
//! name is therefore an operation failure, never a construction failure.
//!
//! [`OperationDescriptor`] bundles an [`AlgorithmSpec`] with the trailing
//! options of the internal encrypt/decrypt calls: whether the ciphertext is
//! self-contained and which internal provider type should run it.

use serde::{Deserialize, Serialize};

use crate::error::PrimitiveError;

/// Asymmetric transformation used when the caller leaves the algorithm blank.
pub const DEFAULT_ASYMMETRIC_ALGORITHM: &str = "RSA";

/// Symmetric transformation used by the symmetric internal provider.
pub const DEFAULT_SYMMETRIC_ALGORITHM: &str = "AES/GCM/NoPadding";

/// An algorithm name plus an optional named security provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlgorithmSpec {
    algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
}

impl AlgorithmSpec {
    /// Spec for the named algorithm on the platform default provider.
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            provider: None,
        }
    }

    /// Name a security provider. Blank names mean the platform default.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        let provider = provider.into();
        self.provider = if provider.trim().is_empty() {
            None
        } else {
            Some(provider)
        };
        self
    }

    /// The algorithm name as supplied (may be blank).
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The security-provider hint, if any.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Whether the algorithm name is blank.
    pub fn is_blank(&self) -> bool {
        self.algorithm.trim().is_empty()
    }

    /// Copy of this spec with a blank algorithm replaced by `default`.
    pub fn or_default(&self, default: &str) -> Self {
        if self.is_blank() {
            Self {
                algorithm: default.to_string(),
                provider: self.provider.clone(),
            }
        } else {
            self.clone()
        }
    }

    /// Parse the algorithm as a cipher transformation.
    pub fn transformation(&self) -> Result<Transformation, PrimitiveError> {
        Transformation::parse(&self.algorithm)
    }

    /// Parse the algorithm as a signature scheme.
    pub fn signature_scheme(&self) -> Result<SignatureScheme, PrimitiveError> {
        SignatureScheme::parse(&self.algorithm)
    }

    /// Provider label used in log lines and error messages.
    pub fn provider_label(&self) -> &str {
        self.provider().unwrap_or("")
    }
}

impl std::fmt::Display for AlgorithmSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.provider {
            Some(p) => write!(f, "{} ({p})", self.algorithm),
            None => f.write_str(&self.algorithm),
        }
    }
}

/// Digest used inside RSA-OAEP padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OaepDigest {
    /// OAEP with SHA-1 and MGF1.
    Sha1,
    /// OAEP with SHA-256 and MGF1.
    Sha256,
}

/// A parsed cipher transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transformation {
    /// RSA with PKCS#1 v1.5 encryption padding.
    RsaPkcs1,
    /// RSA with OAEP padding.
    RsaOaep(OaepDigest),
    /// AES in Galois/Counter mode (key size taken from the key).
    AesGcm,
}

impl Transformation {
    /// Parse a `cipher/mode/padding` name. Matching is case-insensitive.
    pub fn parse(name: &str) -> Result<Self, PrimitiveError> {
        let normalized = name.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "RSA" | "RSA/ECB/PKCS1PADDING" | "RSA/NONE/PKCS1PADDING" => Ok(Self::RsaPkcs1),
            "RSA/ECB/OAEPWITHSHA1ANDMGF1PADDING"
            | "RSA/ECB/OAEPWITHSHA-1ANDMGF1PADDING"
            | "RSA/NONE/OAEPWITHSHA1ANDMGF1PADDING" => Ok(Self::RsaOaep(OaepDigest::Sha1)),
            "RSA/ECB/OAEPWITHSHA-256ANDMGF1PADDING"
            | "RSA/ECB/OAEPWITHSHA256ANDMGF1PADDING"
            | "RSA/NONE/OAEPWITHSHA256ANDMGF1PADDING" => Ok(Self::RsaOaep(OaepDigest::Sha256)),
            "AES/GCM/NOPADDING" => Ok(Self::AesGcm),
            "" => Err(PrimitiveError::AlgorithmNotAvailable(
                "empty transformation".into(),
            )),
            _ => Err(PrimitiveError::AlgorithmNotAvailable(name.trim().to_string())),
        }
    }

    /// Whether this transformation uses a secret (symmetric) key.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Self::AesGcm)
    }
}

/// A parsed signature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureScheme {
    /// RSASSA-PKCS1-v1_5 over SHA-1.
    Sha1WithRsa,
    /// RSASSA-PKCS1-v1_5 over SHA-256.
    Sha256WithRsa,
    /// RSASSA-PKCS1-v1_5 over SHA-384.
    Sha384WithRsa,
    /// RSASSA-PKCS1-v1_5 over SHA-512.
    Sha512WithRsa,
    /// Pure Ed25519.
    Ed25519,
}

impl SignatureScheme {
    /// Parse a `<digest>with<cipher>` name. Matching is case-insensitive.
    pub fn parse(name: &str) -> Result<Self, PrimitiveError> {
        let normalized = name.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "SHA1WITHRSA" | "SHA-1WITHRSA" => Ok(Self::Sha1WithRsa),
            "SHA256WITHRSA" | "SHA-256WITHRSA" => Ok(Self::Sha256WithRsa),
            "SHA384WITHRSA" | "SHA-384WITHRSA" => Ok(Self::Sha384WithRsa),
            "SHA512WITHRSA" | "SHA-512WITHRSA" => Ok(Self::Sha512WithRsa),
            "ED25519" | "EDDSA" => Ok(Self::Ed25519),
            _ => Err(PrimitiveError::AlgorithmNotAvailable(name.trim().to_string())),
        }
    }

    /// Whether the scheme needs an RSA key.
    pub fn is_rsa(&self) -> bool {
        !matches!(self, Self::Ed25519)
    }
}

/// One structured argument for internal encrypt/decrypt calls.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Algorithm and provider hint.
    pub spec: AlgorithmSpec,
    /// Produce (or expect) a self-contained ciphertext envelope.
    #[serde(default)]
    pub self_contained: bool,
    /// Preferred internal crypto provider type (e.g. `keystore`, `symmetric`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_provider: Option<String>,
}

impl OperationDescriptor {
    /// Descriptor for a plain operation with the given spec.
    pub fn new(spec: AlgorithmSpec) -> Self {
        Self {
            spec,
            self_contained: false,
            internal_provider: None,
        }
    }

    /// Request (or expect) a self-contained ciphertext.
    pub fn self_contained(mut self, self_contained: bool) -> Self {
        self.self_contained = self_contained;
        self
    }

    /// Select an internal provider by type name. Blank names are ignored.
    pub fn internal_provider(mut self, provider_type: impl Into<String>) -> Self {
        let provider_type = provider_type.into();
        self.internal_provider = if provider_type.trim().is_empty() {
            None
        } else {
            Some(provider_type)
        };
        self
    }
}

impl From<AlgorithmSpec> for OperationDescriptor {
    fn from(spec: AlgorithmSpec) -> Self {
        Self::new(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transformation_names() {
        assert_eq!(Transformation::parse("RSA").unwrap(), Transformation::RsaPkcs1);
        assert_eq!(
            Transformation::parse("rsa/ecb/pkcs1padding").unwrap(),
            Transformation::RsaPkcs1
        );
        assert_eq!(
            Transformation::parse("RSA/ECB/OAEPwithSHA1andMGF1Padding").unwrap(),
            Transformation::RsaOaep(OaepDigest::Sha1)
        );
        assert_eq!(
            Transformation::parse("RSA/ECB/OAEPWithSHA-256AndMGF1Padding").unwrap(),
            Transformation::RsaOaep(OaepDigest::Sha256)
        );
        assert_eq!(
            Transformation::parse(" AES/GCM/NoPadding ").unwrap(),
            Transformation::AesGcm
        );
    }

    #[test]
    fn unknown_transformation_is_algorithm_not_available() {
        assert_eq!(
            Transformation::parse("DES/CBC/PKCS5Padding"),
            Err(PrimitiveError::AlgorithmNotAvailable(
                "DES/CBC/PKCS5Padding".into()
            ))
        );
        assert!(Transformation::parse("").is_err());
    }

    #[test]
    fn symmetric_flag() {
        assert!(Transformation::AesGcm.is_symmetric());
        assert!(!Transformation::RsaPkcs1.is_symmetric());
    }

    #[test]
    fn signature_scheme_names() {
        assert_eq!(
            SignatureScheme::parse("SHA256withRSA").unwrap(),
            SignatureScheme::Sha256WithRsa
        );
        assert_eq!(
            SignatureScheme::parse("sha1withrsa").unwrap(),
            SignatureScheme::Sha1WithRsa
        );
        assert_eq!(SignatureScheme::parse("EdDSA").unwrap(), SignatureScheme::Ed25519);
        assert!(SignatureScheme::Sha512WithRsa.is_rsa());
        assert!(!SignatureScheme::Ed25519.is_rsa());
        assert!(SignatureScheme::parse("MD5withRSA").is_err());
    }

    #[test]
    fn spec_is_not_validated_at_construction() {
        let spec = AlgorithmSpec::new("NOT/A/CIPHER");
        assert_eq!(spec.algorithm(), "NOT/A/CIPHER");
        assert!(spec.transformation().is_err());
    }

    #[test]
    fn blank_spec_falls_back_to_default() {
        let spec = AlgorithmSpec::new("  ").with_provider("rustcrypto");
        assert!(spec.is_blank());
        let resolved = spec.or_default(DEFAULT_ASYMMETRIC_ALGORITHM);
        assert_eq!(resolved.algorithm(), "RSA");
        assert_eq!(resolved.provider(), Some("rustcrypto"));

        let explicit = AlgorithmSpec::new("AES/GCM/NoPadding");
        assert_eq!(
            explicit.or_default(DEFAULT_ASYMMETRIC_ALGORITHM).algorithm(),
            "AES/GCM/NoPadding"
        );
    }

    #[test]
    fn blank_provider_means_default() {
        let spec = AlgorithmSpec::new("RSA").with_provider(" ");
        assert_eq!(spec.provider(), None);
        assert_eq!(spec.provider_label(), "");
        assert_eq!(spec.to_string(), "RSA");
        let named = AlgorithmSpec::new("RSA").with_provider("rustcrypto");
        assert_eq!(named.to_string(), "RSA (rustcrypto)");
    }

    #[test]
    fn descriptor_builder() {
        let op = OperationDescriptor::new(AlgorithmSpec::new("RSA"))
            .self_contained(true)
            .internal_provider("keystore");
        assert!(op.self_contained);
        assert_eq!(op.internal_provider.as_deref(), Some("keystore"));

        let plain: OperationDescriptor = AlgorithmSpec::new("RSA").into();
        assert!(!plain.self_contained);
        assert!(plain.internal_provider.is_none());
        assert!(OperationDescriptor::default()
            .internal_provider("")
            .internal_provider
            .is_none());
    }
}
