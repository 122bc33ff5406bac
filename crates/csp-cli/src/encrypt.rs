//! # Encrypt / Decrypt Subcommands
//!
//! Without `--owner` or `--alias` the commands use the service's internal
//! key (optionally as a self-contained ciphertext, optionally through a
//! named internal provider). Naming a party switches to party-to-party
//! encryption: `encrypt` uses that party's certificate, `decrypt` the
//! local private key the party resolves to.

use anyhow::Result;
use clap::Args;

use csp_core::encoding::to_base64;
use csp_core::OperationDescriptor;

use crate::{InputArgs, Session, TargetArgs};

/// Arguments shared by `csp encrypt` and `csp decrypt`.
#[derive(Args, Debug, Clone, Default)]
pub struct CipherArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Transformation, e.g. `RSA/ECB/OAEPWithSHA-256AndMGF1Padding`.
    /// Blank means `RSA`.
    #[arg(long, short, default_value = "")]
    pub algorithm: String,

    /// Security provider name.
    #[arg(long)]
    pub provider: Option<String>,

    /// Produce or consume a self-contained ciphertext.
    #[arg(long, conflicts_with_all = ["owner", "alias"])]
    pub self_contained: bool,

    /// Internal crypto provider type, e.g. `keystore` or `symmetric`.
    #[arg(long, conflicts_with_all = ["owner", "alias"])]
    pub internal_provider: Option<String>,
}

impl CipherArgs {
    fn descriptor(&self, session: &Session) -> OperationDescriptor {
        let mut op = OperationDescriptor::new(session.spec(&self.algorithm, self.provider.as_deref()))
            .self_contained(self.self_contained);
        if let Some(p) = &self.internal_provider {
            op = op.internal_provider(p);
        }
        op
    }
}

/// Encrypt and return the base64 ciphertext.
pub fn encrypt(args: &CipherArgs, session: &Session) -> Result<String> {
    let cleartext = args.input.read("Plaintext can't be null.")?;
    let ciphertext = if args.target.is_set() {
        let spec = session.spec(&args.algorithm, args.provider.as_deref());
        session
            .service()
            .encrypt_for(&cleartext, &spec, &args.target.context()?)?
    } else {
        session.service().encrypt(&cleartext, &args.descriptor(session))?
    };
    Ok(to_base64(&ciphertext))
}

/// Decrypt and return the base64 cleartext.
pub fn decrypt(args: &CipherArgs, session: &Session) -> Result<String> {
    let ciphertext = args.input.read("Ciphertext can't be null.")?;
    let cleartext = if args.target.is_set() {
        let spec = session.spec(&args.algorithm, args.provider.as_deref());
        session
            .service()
            .decrypt_from(&ciphertext, &spec, &args.target.context()?)?
    } else {
        session.service().decrypt(&ciphertext, &args.descriptor(session))?
    };
    Ok(to_base64(&cleartext))
}

/// Execute `csp encrypt`.
pub fn run_encrypt(args: &CipherArgs, session: &Session) -> Result<u8> {
    println!("{}", encrypt(args, session)?);
    Ok(0)
}

/// Execute `csp decrypt`.
pub fn run_decrypt(args: &CipherArgs, session: &Session) -> Result<u8> {
    println!("{}", decrypt(args, session)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{partner_session, session};
    use csp_core::encoding::from_base64;
    use csp_core::CryptoServiceError;

    fn args(data: &str) -> CipherArgs {
        CipherArgs {
            input: InputArgs::inline(data),
            ..CipherArgs::default()
        }
    }

    #[test]
    fn internal_roundtrip() {
        let s = session();
        let ct = encrypt(&args("aGVsbG8="), &s).unwrap();
        assert_eq!(decrypt(&args(&ct), &s).unwrap(), "aGVsbG8=");
    }

    #[test]
    fn self_contained_roundtrip() {
        let s = session();
        let mut a = args("aGVsbG8=");
        a.self_contained = true;
        a.algorithm = "RSA/ECB/OAEPWithSHA-1AndMGF1Padding".into();
        let ct = encrypt(&a, &s).unwrap();
        let envelope = String::from_utf8(from_base64(&ct).unwrap()).unwrap();
        assert!(envelope.contains("\"tpd\":\"SHA-1\""));

        let mut d = args(&ct);
        d.self_contained = true;
        assert_eq!(decrypt(&d, &s).unwrap(), "aGVsbG8=");
    }

    #[test]
    fn party_to_party() {
        let mut a = args("c2VjcmV0");
        a.target.alias = Some("partner".into());
        let ct = encrypt(&a, &session()).unwrap();

        let mut d = args(&ct);
        d.target.owner = Some("partner".into());
        assert_eq!(decrypt(&d, &partner_session()).unwrap(), "c2VjcmV0");
    }

    #[test]
    fn missing_plaintext() {
        let err = encrypt(&CipherArgs::default(), &session()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CryptoServiceError>(),
            Some(CryptoServiceError::Validation(m)) if m == "Plaintext can't be null."
        ));
    }

    #[test]
    fn unknown_internal_provider() {
        let mut a = args("aGVsbG8=");
        a.internal_provider = Some("vault".into());
        let err = encrypt(&a, &session()).unwrap_err();
        assert!(err
            .downcast_ref::<CryptoServiceError>()
            .is_some_and(CryptoServiceError::is_not_supported));
    }
}
