//! # csp-cli — Operator CLI for the Crypto Service
//!
//! Provides the `csp` command-line interface over a configured
//! [`DefaultCryptoService`].
//!
//! ## Subcommands
//!
//! - `csp encrypt` / `csp decrypt`: internal or party-to-party encryption.
//! - `csp sign` / `csp verify`: signatures with the resolved key.
//! - `csp cert`: inspect the certificate a context resolves to.
//! - `csp hybrid seal|open`: envelope encryption.
//!
//! Binary payloads are read and written as base64 text:
//!
//! ```bash
//! csp --config csp.yaml encrypt --data aGVsbG8= --self-contained
//! csp sign --owner acme --algorithm Ed25519 --in payload.b64
//! ```
//!
//! Without `--config` the service is configured from `CSP_*` environment
//! variables.

pub mod cert;
pub mod encrypt;
pub mod hybrid;
pub mod signing;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use csp_core::encoding::from_base64;
use csp_core::{AlgorithmSpec, CryptoContext, CryptoServiceError, OwnerId};
use csp_provider::{CryptoService, CryptoServiceConfig, DefaultCryptoService};

/// Owner used when a command names neither an owner nor an alias.
pub const DEFAULT_OWNER: &str = "local";

/// A configured service plus the settings commands need at call time.
#[derive(Debug)]
pub struct Session {
    service: DefaultCryptoService,
    config: CryptoServiceConfig,
}

impl Session {
    /// Build a session from an already loaded configuration.
    pub fn from_config(config: &CryptoServiceConfig) -> Result<Self> {
        let service = config
            .build_service()
            .context("failed to configure the crypto service")?;
        Ok(Self {
            service,
            config: config.clone(),
        })
    }

    /// Load configuration from a YAML file, or from the environment when no
    /// file is given.
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let config = match config {
            Some(path) => CryptoServiceConfig::from_yaml_file(path)
                .with_context(|| format!("failed to load config: {}", path.display()))?,
            None => CryptoServiceConfig::from_env()
                .context("failed to load config from environment")?,
        };
        tracing::debug!(?config, "loaded configuration");
        Self::from_config(&config)
    }

    /// The configured service.
    pub fn service(&self) -> &dyn CryptoService {
        &self.service
    }

    /// Algorithm spec for a command. A missing provider falls back to the
    /// configured security provider.
    pub fn spec(&self, algorithm: &str, provider: Option<&str>) -> AlgorithmSpec {
        self.config.algorithm(algorithm, provider)
    }
}

/// Where a command reads its base64 payload from.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Base64 payload given inline.
    #[arg(long, conflicts_with = "input")]
    pub data: Option<String>,

    /// File holding the base64 payload.
    #[arg(long = "in", value_name = "FILE")]
    pub input: Option<PathBuf>,
}

impl InputArgs {
    /// Inline payload.
    pub fn inline(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            input: None,
        }
    }

    /// Payload read from a file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            data: None,
            input: Some(path.into()),
        }
    }

    /// Raw text of the payload. A missing payload fails validation with
    /// `missing` as the message.
    pub fn read_text(&self, missing: &str) -> Result<String> {
        if let Some(data) = &self.data {
            return Ok(data.clone());
        }
        match &self.input {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read input: {}", path.display())),
            None => Err(CryptoServiceError::Validation(missing.to_string()).into()),
        }
    }

    /// Decoded payload bytes.
    pub fn read(&self, missing: &str) -> Result<Vec<u8>> {
        let text = self.read_text(missing)?;
        from_base64(&text).map_err(|e| anyhow::anyhow!("input is not valid base64: {e}"))
    }
}

/// Which party a command acts on.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Owner identifier, mapped to an alias by configuration.
    #[arg(long)]
    pub owner: Option<String>,

    /// Key store alias, bypassing owner mapping.
    #[arg(long)]
    pub alias: Option<String>,
}

impl TargetArgs {
    /// Whether any party was named.
    pub fn is_set(&self) -> bool {
        self.owner.is_some() || self.alias.is_some()
    }

    /// Crypto context for the named party.
    pub fn context(&self) -> Result<CryptoContext> {
        let owner = OwnerId::new(self.owner.as_deref().unwrap_or(DEFAULT_OWNER))?;
        let ctx = CryptoContext::new(owner);
        Ok(match &self.alias {
            Some(alias) => ctx.with_alias(alias),
            None => ctx,
        })
    }
}
