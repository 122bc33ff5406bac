//! # Cipher Primitives
//!
//! The narrow interface through which the service reaches actual
//! cryptography. Everything above this module deals in transformation
//! names and key material; everything below is RustCrypto.
//!
//! The `provider` argument mirrors a named security provider. A blank or
//! absent name selects the platform default; any name other than
//! [`RUSTCRYPTO_PROVIDER`] is [`PrimitiveError::ProviderNotAvailable`].

use aes_gcm::aead::{Aead, KeyInit, Nonce, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use csp_core::{DigestAlgorithm, OaepDigest, PrimitiveError, SignatureScheme, Transformation};
use ed25519_dalek::{Signature, Signer, Verifier};
use rand_core::{OsRng, RngCore};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::keys::{KeyMaterial, PrivateKey, PublicKey, SymmetricKey};

/// Name of the built-in provider.
pub const RUSTCRYPTO_PROVIDER: &str = "rustcrypto";

/// AES-GCM nonce length in bytes.
pub const GCM_NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const GCM_TAG_LEN: usize = 16;

/// Cipher, AEAD and signature primitives.
pub trait CipherPrimitives: Send + Sync {
    /// Provider name.
    fn name(&self) -> &str;

    /// Encrypt `data`. Asymmetric transformations use the public half of
    /// `key`. AES-GCM returns `nonce || ciphertext || tag` with a fresh
    /// random nonce.
    fn encrypt(
        &self,
        transformation: Transformation,
        provider: Option<&str>,
        key: &KeyMaterial,
        data: &[u8],
    ) -> Result<Vec<u8>, PrimitiveError>;

    /// Inverse of [`CipherPrimitives::encrypt`].
    fn decrypt(
        &self,
        transformation: Transformation,
        provider: Option<&str>,
        key: &KeyMaterial,
        data: &[u8],
    ) -> Result<Vec<u8>, PrimitiveError>;

    /// AES-GCM with a caller-chosen nonce. Returns `ciphertext || tag`.
    fn seal(
        &self,
        provider: Option<&str>,
        key: &SymmetricKey,
        nonce: &[u8],
        data: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, PrimitiveError>;

    /// Inverse of [`CipherPrimitives::seal`].
    fn open(
        &self,
        provider: Option<&str>,
        key: &SymmetricKey,
        nonce: &[u8],
        data: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, PrimitiveError>;

    /// Sign `data`.
    fn sign(
        &self,
        scheme: SignatureScheme,
        provider: Option<&str>,
        key: &PrivateKey,
        data: &[u8],
    ) -> Result<Vec<u8>, PrimitiveError>;

    /// Verify `signature` over `data`. A well-formed signature that does not
    /// match is `Ok(false)`; malformed signature bytes are an error.
    fn verify(
        &self,
        scheme: SignatureScheme,
        provider: Option<&str>,
        key: &PublicKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, PrimitiveError>;
}

/// [`CipherPrimitives`] over `rsa`, `aes-gcm` and `ed25519-dalek`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoPrimitives;

impl RustCryptoPrimitives {
    /// The built-in provider.
    pub fn new() -> Self {
        Self
    }

    fn check_provider(&self, provider: Option<&str>) -> Result<(), PrimitiveError> {
        match provider.map(str::trim) {
            None | Some("") => Ok(()),
            Some(p) if p.eq_ignore_ascii_case(RUSTCRYPTO_PROVIDER) => Ok(()),
            Some(p) => Err(PrimitiveError::ProviderNotAvailable(p.to_string())),
        }
    }
}

impl CipherPrimitives for RustCryptoPrimitives {
    fn name(&self) -> &str {
        RUSTCRYPTO_PROVIDER
    }

    fn encrypt(
        &self,
        transformation: Transformation,
        provider: Option<&str>,
        key: &KeyMaterial,
        data: &[u8],
    ) -> Result<Vec<u8>, PrimitiveError> {
        self.check_provider(provider)?;
        match transformation {
            Transformation::AesGcm => {
                let key = symmetric_key(key)?;
                let mut nonce = [0u8; GCM_NONCE_LEN];
                OsRng.fill_bytes(&mut nonce);
                let sealed = self.seal(provider, key, &nonce, data, &[])?;
                let mut out = Vec::with_capacity(GCM_NONCE_LEN + sealed.len());
                out.extend_from_slice(&nonce);
                out.extend_from_slice(&sealed);
                Ok(out)
            }
            Transformation::RsaPkcs1 => rsa_public_key(key)?
                .encrypt(&mut OsRng, Pkcs1v15Encrypt, data)
                .map_err(rsa_error),
            Transformation::RsaOaep(digest) => rsa_public_key(key)?
                .encrypt(&mut OsRng, oaep(digest), data)
                .map_err(rsa_error),
        }
    }

    fn decrypt(
        &self,
        transformation: Transformation,
        provider: Option<&str>,
        key: &KeyMaterial,
        data: &[u8],
    ) -> Result<Vec<u8>, PrimitiveError> {
        self.check_provider(provider)?;
        match transformation {
            Transformation::AesGcm => {
                let key = symmetric_key(key)?;
                if data.len() < GCM_NONCE_LEN + GCM_TAG_LEN {
                    return Err(PrimitiveError::InvalidParameters(format!(
                        "AES-GCM ciphertext must be at least {} bytes, got {}",
                        GCM_NONCE_LEN + GCM_TAG_LEN,
                        data.len()
                    )));
                }
                let (nonce, sealed) = data.split_at(GCM_NONCE_LEN);
                self.open(provider, key, nonce, sealed, &[])
            }
            Transformation::RsaPkcs1 => rsa_private_key(key)?
                .decrypt(Pkcs1v15Encrypt, data)
                .map_err(rsa_error),
            Transformation::RsaOaep(digest) => rsa_private_key(key)?
                .decrypt(oaep(digest), data)
                .map_err(rsa_error),
        }
    }

    fn seal(
        &self,
        provider: Option<&str>,
        key: &SymmetricKey,
        nonce: &[u8],
        data: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, PrimitiveError> {
        self.check_provider(provider)?;
        check_nonce(nonce)?;
        match key.as_bytes().len() {
            16 => gcm_seal::<Aes128Gcm>(key.as_bytes(), nonce, data, aad),
            32 => gcm_seal::<Aes256Gcm>(key.as_bytes(), nonce, data, aad),
            n => Err(unsupported_aes_key(n)),
        }
    }

    fn open(
        &self,
        provider: Option<&str>,
        key: &SymmetricKey,
        nonce: &[u8],
        data: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, PrimitiveError> {
        self.check_provider(provider)?;
        check_nonce(nonce)?;
        match key.as_bytes().len() {
            16 => gcm_open::<Aes128Gcm>(key.as_bytes(), nonce, data, aad),
            32 => gcm_open::<Aes256Gcm>(key.as_bytes(), nonce, data, aad),
            n => Err(unsupported_aes_key(n)),
        }
    }

    fn sign(
        &self,
        scheme: SignatureScheme,
        provider: Option<&str>,
        key: &PrivateKey,
        data: &[u8],
    ) -> Result<Vec<u8>, PrimitiveError> {
        self.check_provider(provider)?;
        match (scheme, key) {
            (SignatureScheme::Ed25519, PrivateKey::Ed25519(sk)) => {
                Ok(sk.sign(data).to_bytes().to_vec())
            }
            (scheme, PrivateKey::Rsa(sk)) if scheme.is_rsa() => {
                let (padding, digest) = pkcs1v15_sign(scheme);
                sk.sign(padding, &digest.digest(data)).map_err(rsa_error)
            }
            (scheme, key) => Err(incompatible(scheme, key.algorithm())),
        }
    }

    fn verify(
        &self,
        scheme: SignatureScheme,
        provider: Option<&str>,
        key: &PublicKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, PrimitiveError> {
        self.check_provider(provider)?;
        match (scheme, key) {
            (SignatureScheme::Ed25519, PublicKey::Ed25519(vk)) => {
                let sig = Signature::from_slice(signature).map_err(|e| {
                    PrimitiveError::InvalidParameters(format!("malformed Ed25519 signature: {e}"))
                })?;
                Ok(vk.verify(data, &sig).is_ok())
            }
            (scheme, PublicKey::Rsa(pk)) if scheme.is_rsa() => {
                if signature.len() != pk.size() {
                    return Err(PrimitiveError::InvalidParameters(format!(
                        "RSA signature must be {} bytes, got {}",
                        pk.size(),
                        signature.len()
                    )));
                }
                let (padding, digest) = pkcs1v15_sign(scheme);
                Ok(pk.verify(padding, &digest.digest(data), signature).is_ok())
            }
            (scheme, key) => Err(incompatible(scheme, key.algorithm())),
        }
    }
}

fn gcm_seal<C: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    data: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, PrimitiveError> {
    let cipher = C::new_from_slice(key).map_err(|_| unsupported_aes_key(key.len()))?;
    cipher
        .encrypt(Nonce::<C>::from_slice(nonce), Payload { msg: data, aad })
        .map_err(|_| PrimitiveError::InvalidParameters("AES-GCM encryption failed".into()))
}

fn gcm_open<C: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    data: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, PrimitiveError> {
    let cipher = C::new_from_slice(key).map_err(|_| unsupported_aes_key(key.len()))?;
    cipher
        .decrypt(Nonce::<C>::from_slice(nonce), Payload { msg: data, aad })
        .map_err(|_| PrimitiveError::BadPadding("AES-GCM tag mismatch".into()))
}

fn check_nonce(nonce: &[u8]) -> Result<(), PrimitiveError> {
    if nonce.len() == GCM_NONCE_LEN {
        Ok(())
    } else {
        Err(PrimitiveError::InvalidParameters(format!(
            "AES-GCM nonce must be {GCM_NONCE_LEN} bytes, got {}",
            nonce.len()
        )))
    }
}

// OAEPWithSHA-256AndMGF1Padding keeps MGF1 on SHA-1, the common provider
// default, so ciphertexts interoperate with other stacks.
fn oaep(digest: OaepDigest) -> Oaep {
    match digest {
        OaepDigest::Sha1 => Oaep::new::<Sha1>(),
        OaepDigest::Sha256 => Oaep::new_with_mgf_hash::<Sha256, Sha1>(),
    }
}

fn pkcs1v15_sign(scheme: SignatureScheme) -> (Pkcs1v15Sign, DigestAlgorithm) {
    match scheme {
        SignatureScheme::Sha1WithRsa => (Pkcs1v15Sign::new::<Sha1>(), DigestAlgorithm::Sha1),
        SignatureScheme::Sha384WithRsa => (Pkcs1v15Sign::new::<Sha384>(), DigestAlgorithm::Sha384),
        SignatureScheme::Sha512WithRsa => (Pkcs1v15Sign::new::<Sha512>(), DigestAlgorithm::Sha512),
        SignatureScheme::Sha256WithRsa | SignatureScheme::Ed25519 => {
            (Pkcs1v15Sign::new::<Sha256>(), DigestAlgorithm::Sha256)
        }
    }
}

fn symmetric_key(key: &KeyMaterial) -> Result<&SymmetricKey, PrimitiveError> {
    match key {
        KeyMaterial::Symmetric(k) => Ok(k),
        other => Err(PrimitiveError::KeyIncompatible(format!(
            "AES/GCM/NoPadding requires a secret key, got {}",
            other.describe()
        ))),
    }
}

fn rsa_public_key(key: &KeyMaterial) -> Result<RsaPublicKey, PrimitiveError> {
    match key {
        KeyMaterial::Public(PublicKey::Rsa(pk)) => Ok(pk.clone()),
        KeyMaterial::Certificate(cert) => match cert.public_key() {
            PublicKey::Rsa(pk) => Ok(pk.clone()),
            other => Err(PrimitiveError::KeyIncompatible(format!(
                "RSA encryption requires an RSA key, got {}",
                other.algorithm()
            ))),
        },
        KeyMaterial::Private(PrivateKey::Rsa(sk)) => Ok(sk.to_public_key()),
        other => Err(PrimitiveError::KeyIncompatible(format!(
            "RSA encryption requires an RSA public key, got {}",
            other.describe()
        ))),
    }
}

fn rsa_private_key(key: &KeyMaterial) -> Result<&RsaPrivateKey, PrimitiveError> {
    match key {
        KeyMaterial::Private(PrivateKey::Rsa(sk)) => Ok(&**sk),
        other => Err(PrimitiveError::KeyIncompatible(format!(
            "RSA decryption requires an RSA private key, got {}",
            other.describe()
        ))),
    }
}

fn incompatible(scheme: SignatureScheme, key_algorithm: &str) -> PrimitiveError {
    PrimitiveError::KeyIncompatible(format!("{scheme:?} cannot use a {key_algorithm} key"))
}

fn unsupported_aes_key(len: usize) -> PrimitiveError {
    PrimitiveError::KeyIncompatible(format!("AES key must be 16 or 32 bytes, got {len}"))
}

fn rsa_error(err: rsa::Error) -> PrimitiveError {
    match err {
        rsa::Error::Decryption | rsa::Error::Verification => {
            PrimitiveError::BadPadding(err.to_string())
        }
        rsa::Error::MessageTooLong | rsa::Error::InputNotHashed => {
            PrimitiveError::InvalidParameters(err.to_string())
        }
        other => PrimitiveError::KeyIncompatible(other.to_string()),
    }
}
