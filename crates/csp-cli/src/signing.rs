//! # Sign / Verify Subcommands
//!
//! Signs with the private key the target resolves to and verifies against
//! the target's certificate. A signature that does not match is reported
//! and exits with status 1; it is not an error.

use anyhow::{Context, Result};
use clap::Args;

use csp_core::encoding::{from_base64, to_base64};

use crate::{InputArgs, Session, TargetArgs};

/// Arguments for `csp sign`.
#[derive(Args, Debug, Clone)]
pub struct SignArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Signature scheme, e.g. `SHA256withRSA` or `Ed25519`.
    #[arg(long, short, default_value = "SHA256withRSA")]
    pub algorithm: String,

    /// Security provider name.
    #[arg(long)]
    pub provider: Option<String>,
}

/// Arguments for `csp verify`.
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub sign: SignArgs,

    /// Base64 signature to check.
    #[arg(long)]
    pub signature: String,
}

/// Sign and return the base64 signature.
pub fn sign(args: &SignArgs, session: &Session) -> Result<String> {
    let data = args.input.read("Data to sign can't be null.")?;
    let spec = session.spec(&args.algorithm, args.provider.as_deref());
    let signature = session
        .service()
        .sign(&data, &spec, &args.target.context()?)?;
    Ok(to_base64(&signature))
}

/// Whether the signature matches.
pub fn verify(args: &VerifyArgs, session: &Session) -> Result<bool> {
    let data = args.sign.input.read("Data to verify can't be null.")?;
    let signature = from_base64(&args.signature)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("invalid signature encoding")?;
    let spec = session.spec(&args.sign.algorithm, args.sign.provider.as_deref());
    let valid = session.service().verify_signature(
        &data,
        &signature,
        &spec,
        &args.sign.target.context()?,
    )?;
    Ok(valid)
}

/// Execute `csp sign`.
pub fn run_sign(args: &SignArgs, session: &Session) -> Result<u8> {
    println!("{}", sign(args, session)?);
    Ok(0)
}

/// Execute `csp verify`.
pub fn run_verify(args: &VerifyArgs, session: &Session) -> Result<u8> {
    if verify(args, session)? {
        println!("OK: signature is valid");
        Ok(0)
    } else {
        println!("FAIL: signature does not match");
        Ok(1)
    }
}
