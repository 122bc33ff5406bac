//! # Certificate Subcommand
//!
//! Prints the certificate a target resolves to.

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use serde_json::json;

use csp_core::encoding::to_base64;
use csp_core::DigestAlgorithm;
use csp_provider::Certificate;

use crate::{Session, TargetArgs};

/// Arguments for `csp cert`.
#[derive(Args, Debug, Clone, Default)]
pub struct CertArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Include the base64 DER encoding.
    #[arg(long)]
    pub der: bool,
}

/// JSON summary of the resolved certificate.
pub fn describe(args: &CertArgs, session: &Session) -> Result<serde_json::Value> {
    let cert = session.service().certificate(&args.target.context()?)?;
    let mut summary = summarize(&cert);
    if args.der {
        summary["der"] = json!(to_base64(cert.der()));
    }
    Ok(summary)
}

fn summarize(cert: &Certificate) -> serde_json::Value {
    json!({
        "subject": cert.subject(),
        "issuer": cert.issuer(),
        "serial_number": cert.serial_number(),
        "not_before": cert.not_before().to_rfc3339(),
        "not_after": cert.not_after().to_rfc3339(),
        "valid_now": cert.is_valid_at(Utc::now()),
        "key_algorithm": cert.public_key().algorithm(),
        "thumbprints": {
            "SHA-1": cert.thumbprint(DigestAlgorithm::Sha1).value(),
            "SHA-256": cert.thumbprint(DigestAlgorithm::Sha256).value(),
        },
    })
}

/// Execute `csp cert`.
pub fn run_cert(args: &CertArgs, session: &Session) -> Result<u8> {
    let summary = describe(args, session)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(0)
}
