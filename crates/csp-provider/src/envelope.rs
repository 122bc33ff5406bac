//! # Self-Contained Ciphertext Envelope
//!
//! A self-contained ciphertext is a JSON record that carries, next to the
//! raw ciphertext, everything needed to decrypt it later:
//!
//! ```json
//! {"c":"<base64 ciphertext>","t":"<transformation>","tp":"<HEX>","tpd":"SHA-1"}
//! ```
//!
//! `tp` is the uppercase hex digest of the DER encoding of the certificate
//! whose private key decrypts `c`, and `tpd` names the digest. Keys are
//! emitted in exactly this order. The thumbprint only helps pick the right
//! key; it authenticates nothing.

use csp_core::encoding::{from_base64, to_base64};
use csp_core::{CryptoServiceError, DigestAlgorithm, Thumbprint};
use serde::{Deserialize, Serialize};

use crate::keys::Certificate;

/// A parsed self-contained ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfContainedCiphertext {
    /// Raw ciphertext.
    pub ciphertext: Vec<u8>,
    /// Transformation the ciphertext was produced with.
    pub transformation: String,
    /// Thumbprint of the certificate matching the decryption key.
    pub thumbprint: Thumbprint,
}

#[derive(Serialize, Deserialize)]
struct EnvelopeRecord {
    c: String,
    t: String,
    tp: String,
    tpd: String,
}

/// Wrap a raw ciphertext into a self-contained envelope.
pub fn encode(
    raw_ciphertext: &[u8],
    transformation: &str,
    certificate: &Certificate,
    digest_algorithm: DigestAlgorithm,
) -> Result<Vec<u8>, CryptoServiceError> {
    let thumbprint = certificate.thumbprint(digest_algorithm);
    let record = EnvelopeRecord {
        c: to_base64(raw_ciphertext),
        t: transformation.to_string(),
        tp: thumbprint.value().to_string(),
        tpd: digest_algorithm.as_str().to_string(),
    };
    let bytes = serde_json::to_vec(&record)
        .map_err(|e| CryptoServiceError::operation("failed to serialize ciphertext envelope", e))?;
    tracing::debug!(
        transformation,
        thumbprint = %thumbprint,
        subject = certificate.subject(),
        "built self-contained ciphertext"
    );
    Ok(bytes)
}

/// Parse a self-contained envelope. Any structural defect is
/// [`CryptoServiceError::MalformedEnvelope`].
pub fn decode(bytes: &[u8]) -> Result<SelfContainedCiphertext, CryptoServiceError> {
    let record: EnvelopeRecord = serde_json::from_slice(bytes)
        .map_err(|e| CryptoServiceError::MalformedEnvelope(e.to_string()))?;
    let ciphertext = from_base64(&record.c).map_err(CryptoServiceError::MalformedEnvelope)?;
    let digest_algorithm: DigestAlgorithm = record
        .tpd
        .parse()
        .map_err(|e: CryptoServiceError| CryptoServiceError::MalformedEnvelope(e.to_string()))?;
    let thumbprint = Thumbprint::from_hex(&record.tp, digest_algorithm)
        .map_err(|e| CryptoServiceError::MalformedEnvelope(e.to_string()))?;
    Ok(SelfContainedCiphertext {
        ciphertext,
        transformation: record.t,
        thumbprint,
    })
}

/// Whether `bytes` parse as a self-contained envelope.
pub fn is_self_contained(bytes: &[u8]) -> bool {
    bytes.first() == Some(&b'{') && decode(bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TENANT_CRT: &[u8] = include_bytes!("../tests/fixtures/keystore/tenant.crt");

    fn cert() -> Certificate {
        Certificate::from_bytes(TENANT_CRT).unwrap()
    }

    #[test]
    fn encodes_keys_in_order() {
        let bytes = encode(b"\x01\x02", "RSA", &cert(), DigestAlgorithm::Sha1).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            r#"{"c":"AQI=","t":"RSA","tp":"E53E6CBD69A9BE19773656D00500BC4C4A42B5DC","tpd":"SHA-1"}"#
        );
    }

    #[test]
    fn decodes_what_it_encodes() {
        let bytes = encode(b"cipher", "RSA/ECB/OAEPWithSHA1AndMGF1Padding", &cert(), DigestAlgorithm::Sha256)
            .unwrap();
        let parsed = decode(&bytes).unwrap();
        assert_eq!(parsed.ciphertext, b"cipher");
        assert_eq!(parsed.transformation, "RSA/ECB/OAEPWithSHA1AndMGF1Padding");
        assert_eq!(parsed.thumbprint, cert().thumbprint(DigestAlgorithm::Sha256));
        assert!(is_self_contained(&bytes));
    }

    #[test]
    fn empty_ciphertext_is_allowed() {
        let bytes = encode(b"", "RSA", &cert(), DigestAlgorithm::Sha1).unwrap();
        assert!(decode(&bytes).unwrap().ciphertext.is_empty());
    }

    #[test]
    fn malformed_inputs() {
        let tp = "E53E6CBD69A9BE19773656D00500BC4C4A42B5DC";
        let cases: Vec<Vec<u8>> = vec![
            b"not json".to_vec(),
            vec![0xff, 0xfe],
            br#"{"c":"AQI=","t":"RSA","tpd":"SHA-1"}"#.to_vec(),
            format!(r#"{{"c":"***","t":"RSA","tp":"{tp}","tpd":"SHA-1"}}"#).into_bytes(),
            br#"{"c":"AQI=","t":"RSA","tp":"NOTHEX","tpd":"SHA-1"}"#.to_vec(),
            format!(r#"{{"c":"AQI=","t":"RSA","tp":"{tp}","tpd":"MD5"}}"#).into_bytes(),
            format!(r#"{{"c":"AQI=","t":"RSA","tp":"{tp}","tpd":"SHA-256"}}"#).into_bytes(),
        ];
        for case in cases {
            let err = decode(&case).unwrap_err();
            assert!(
                matches!(err, CryptoServiceError::MalformedEnvelope(_)),
                "{}: {err}",
                String::from_utf8_lossy(&case)
            );
            assert!(!is_self_contained(&case));
        }
    }

    #[test]
    fn raw_ciphertext_is_not_self_contained() {
        assert!(!is_self_contained(&[0x30, 0x82, 0x01]));
        assert!(!is_self_contained(b""));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn envelope_roundtrip(
                raw in proptest::collection::vec(any::<u8>(), 0..512),
                transformation in "[A-Za-z0-9/-]{1,40}",
                sha256 in any::<bool>(),
            ) {
                let alg = if sha256 { DigestAlgorithm::Sha256 } else { DigestAlgorithm::Sha1 };
                let cert = cert();
                let parsed = decode(&encode(&raw, &transformation, &cert, alg).unwrap()).unwrap();
                prop_assert_eq!(parsed.ciphertext, raw);
                prop_assert_eq!(parsed.transformation, transformation);
                prop_assert_eq!(parsed.thumbprint, cert.thumbprint(alg));
            }

            #[test]
            fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
                let _ = decode(&bytes);
            }
        }
    }
}
