//! # csp CLI entry point
//!
//! Parses command-line arguments, configures the crypto service and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use csp_cli::cert::{run_cert, CertArgs};
use csp_cli::encrypt::{run_decrypt, run_encrypt, CipherArgs};
use csp_cli::hybrid::{run_hybrid, HybridArgs};
use csp_cli::signing::{run_sign, run_verify, SignArgs, VerifyArgs};
use csp_cli::Session;

/// Crypto service CLI
///
/// Encrypts, decrypts, signs and verifies with keys held in a configured
/// key store. Binary payloads are base64 text.
#[derive(Parser, Debug)]
#[command(name = "csp", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// YAML configuration file. Without it, `CSP_*` environment variables
    /// are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt with the internal key or for another party.
    Encrypt(CipherArgs),

    /// Decrypt with the internal key or the local private key.
    Decrypt(CipherArgs),

    /// Sign with the resolved private key.
    Sign(SignArgs),

    /// Verify a signature against the resolved certificate.
    Verify(VerifyArgs),

    /// Show the resolved certificate.
    Cert(CertArgs),

    /// Hybrid (envelope) encryption.
    Hybrid(HybridArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("csp CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let result = Session::load(cli.config.as_deref()).and_then(|session| match &cli.command {
        Commands::Encrypt(args) => run_encrypt(args, &session),
        Commands::Decrypt(args) => run_decrypt(args, &session),
        Commands::Sign(args) => run_sign(args, &session),
        Commands::Verify(args) => run_verify(args, &session),
        Commands::Cert(args) => run_cert(args, &session),
        Commands::Hybrid(args) => run_hybrid(args, &session),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
