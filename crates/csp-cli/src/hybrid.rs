//! # Hybrid Subcommand
//!
//! `seal` envelope-encrypts a payload for a target and prints the JSON
//! envelope; `open` reads such an envelope and prints the base64 cleartext.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use csp_core::encoding::to_base64;
use csp_core::{
    HybridEncryptionInput, HybridEncryptionOutput, DEFAULT_ASYMMETRIC_ALGORITHM,
    DEFAULT_SYMMETRIC_ALGORITHM,
};

use crate::{InputArgs, Session, TargetArgs};

/// Arguments for `csp hybrid`.
#[derive(Args, Debug)]
pub struct HybridArgs {
    #[command(subcommand)]
    pub command: HybridCommand,
}

/// Hybrid subcommands.
#[derive(Subcommand, Debug)]
pub enum HybridCommand {
    /// Encrypt a payload for a recipient certificate.
    Seal(SealArgs),
    /// Decrypt an envelope with the local private key.
    Open(OpenArgs),
}

/// Algorithms used on both sides of a hybrid envelope.
#[derive(Args, Debug, Clone)]
pub struct HybridAlgorithms {
    /// Payload transformation.
    #[arg(long, default_value = DEFAULT_SYMMETRIC_ALGORITHM)]
    pub symmetric: String,

    /// Key-wrapping transformation.
    #[arg(long, default_value = DEFAULT_ASYMMETRIC_ALGORITHM)]
    pub asymmetric: String,

    /// Security provider name.
    #[arg(long)]
    pub provider: Option<String>,
}

impl Default for HybridAlgorithms {
    fn default() -> Self {
        Self {
            symmetric: DEFAULT_SYMMETRIC_ALGORITHM.into(),
            asymmetric: DEFAULT_ASYMMETRIC_ALGORITHM.into(),
            provider: None,
        }
    }
}

/// Arguments for `csp hybrid seal`.
#[derive(Args, Debug, Clone, Default)]
pub struct SealArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// JSON request `{"cleartext": <base64>, "associated_data": <base64>}`
    /// instead of a bare payload.
    #[arg(long, conflicts_with_all = ["data", "input"])]
    pub request: Option<std::path::PathBuf>,

    /// Associated data, as UTF-8 text.
    #[arg(long)]
    pub aad: Option<String>,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub algorithms: HybridAlgorithms,
}

/// Arguments for `csp hybrid open`.
#[derive(Args, Debug, Clone, Default)]
pub struct OpenArgs {
    /// JSON envelope given inline.
    #[arg(long, conflicts_with = "envelope_file")]
    pub envelope: Option<String>,

    /// File holding the JSON envelope.
    #[arg(long = "in", value_name = "FILE")]
    pub envelope_file: Option<std::path::PathBuf>,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub algorithms: HybridAlgorithms,
}

fn request(args: &SealArgs) -> Result<HybridEncryptionInput> {
    let mut input = match &args.request {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read request: {}", path.display()))?;
            HybridEncryptionInput::from_json(&json)?
        }
        None => HybridEncryptionInput::new(args.input.read("Plaintext can't be null.")?),
    };
    if let Some(aad) = &args.aad {
        input = input.with_associated_data(aad.as_bytes());
    }
    Ok(input)
}

/// Seal and return the JSON envelope.
pub fn seal(args: &SealArgs, session: &Session) -> Result<String> {
    let input = request(args)?;
    let provider = args.algorithms.provider.as_deref();
    let output = session.service().hybrid_encrypt(
        &input,
        &session.spec(&args.algorithms.symmetric, provider),
        &session.spec(&args.algorithms.asymmetric, provider),
        &args.target.context()?,
    )?;
    Ok(output.to_json()?)
}

/// Open and return the base64 cleartext.
pub fn open(args: &OpenArgs, session: &Session) -> Result<String> {
    let json = match (&args.envelope, &args.envelope_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read envelope: {}", path.display()))?,
        (None, None) => {
            return Err(csp_core::CryptoServiceError::Validation(
                "Ciphertext can't be null.".into(),
            )
            .into())
        }
    };
    let output = HybridEncryptionOutput::from_json(&json)?;
    let provider = args.algorithms.provider.as_deref();
    let cleartext = session.service().hybrid_decrypt(
        &output,
        &session.spec(&args.algorithms.symmetric, provider),
        &session.spec(&args.algorithms.asymmetric, provider),
        &args.target.context()?,
    )?;
    Ok(to_base64(&cleartext))
}

/// Execute `csp hybrid`.
pub fn run_hybrid(args: &HybridArgs, session: &Session) -> Result<u8> {
    let out = match &args.command {
        HybridCommand::Seal(a) => seal(a, session)?,
        HybridCommand::Open(a) => open(a, session)?,
    };
    println!("{out}");
    Ok(0)
}
