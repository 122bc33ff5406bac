//! # Key and Certificate Resolution
//!
//! Turns a [`CryptoContext`] into concrete key material at call time.
//!
//! Alias selection order:
//!
//! 1. the alias named explicitly by the context,
//! 2. the alias mapped to the context owner,
//! 3. the default alias.
//!
//! Outcomes are tagged: a missing entry or an alias without a usable
//! private key is [`Resolution::NotFound`], a wrong key password is
//! [`Resolution::AccessDenied`]. An alias the store rejects as malformed
//! is also [`Resolution::NotFound`]. `Err` is reserved for a store that
//! cannot be read at all.
//!
//! The context's [`KeyUsage`](csp_core::KeyUsage) does not influence
//! selection; it is carried into the resolution log only.

use std::collections::HashMap;
use std::sync::Arc;

use csp_core::{CryptoContext, CryptoServiceError, KeyStoreError, Thumbprint};
use zeroize::Zeroizing;

use crate::keys::{Certificate, PrivateKey, SymmetricKey};
use crate::keystore::KeyStore;

/// Why an alias did not yield the requested material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// Nothing is stored under the alias.
    MissingAlias,
    /// The alias exists but holds no private key.
    NoPrivateKey,
    /// The alias exists but holds no certificate.
    NoCertificate,
    /// The alias exists but holds no secret key.
    NoSecretKey,
}

impl std::fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::MissingAlias => "no entry",
            Self::NoPrivateKey => "no usable private key",
            Self::NoCertificate => "no certificate",
            Self::NoSecretKey => "no secret key",
        })
    }
}

/// Outcome of a resolution.
#[derive(Debug)]
pub enum Resolution<T> {
    /// The material was found.
    Found(T),
    /// The alias does not hold the requested material.
    NotFound {
        /// Alias (or thumbprint) that was looked up.
        alias: String,
        /// What was missing.
        reason: NotFoundReason,
    },
    /// The material exists but could not be unlocked.
    AccessDenied {
        /// Alias that was looked up.
        alias: String,
        /// Store message.
        reason: String,
    },
}

impl<T> Resolution<T> {
    /// Convert into a `Result`, naming the requested material in errors.
    ///
    /// `NotFound` becomes [`CryptoServiceError::KeyResolution`] and
    /// `AccessDenied` becomes [`CryptoServiceError::KeyStoreAccess`].
    pub fn require(self, what: &str) -> Result<T, CryptoServiceError> {
        match self {
            Self::Found(value) => Ok(value),
            Self::NotFound { alias, reason } => Err(CryptoServiceError::KeyResolution(format!(
                "cannot resolve {what} for '{alias}': {reason}"
            ))),
            Self::AccessDenied { alias, reason } => Err(CryptoServiceError::KeyStoreAccess {
                message: format!("access to {what} for '{alias}' denied: {reason}"),
                source: None,
            }),
        }
    }

    /// Whether the material was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Map the found value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Self::Found(value) => Resolution::Found(f(value)),
            Self::NotFound { alias, reason } => Resolution::NotFound { alias, reason },
            Self::AccessDenied { alias, reason } => Resolution::AccessDenied { alias, reason },
        }
    }
}

/// A certificate together with the alias it is stored under.
#[derive(Debug, Clone)]
pub struct CertificateEntry {
    /// Store alias.
    pub alias: String,
    /// The certificate.
    pub certificate: Certificate,
}

/// Resolves crypto contexts to key material.
pub trait KeyResolver: Send + Sync {
    /// Alias a context resolves to.
    fn alias_for(&self, ctx: &CryptoContext) -> String;

    /// Certificate for the context.
    fn resolve_certificate(
        &self,
        ctx: &CryptoContext,
    ) -> Result<Resolution<Certificate>, CryptoServiceError>;

    /// Private key for the context.
    fn resolve_private_key(
        &self,
        ctx: &CryptoContext,
    ) -> Result<Resolution<PrivateKey>, CryptoServiceError>;

    /// Secret key for the context.
    fn resolve_secret_key(
        &self,
        ctx: &CryptoContext,
    ) -> Result<Resolution<SymmetricKey>, CryptoServiceError>;

    /// Certificate whose thumbprint matches, searching every alias.
    fn resolve_by_thumbprint(
        &self,
        thumbprint: &Thumbprint,
    ) -> Result<Resolution<CertificateEntry>, CryptoServiceError>;
}

/// [`KeyResolver`] over a [`KeyStore`].
pub struct KeyStoreResolver {
    store: Arc<dyn KeyStore>,
    default_alias: String,
    owner_aliases: HashMap<String, String>,
    default_password: Zeroizing<String>,
    key_passwords: HashMap<String, Zeroizing<String>>,
}

impl KeyStoreResolver {
    /// Resolver that maps every context without an explicit alias to
    /// `default_alias`, whose private key opens with `default_password`.
    pub fn new(
        store: Arc<dyn KeyStore>,
        default_alias: impl Into<String>,
        default_password: impl Into<String>,
    ) -> Self {
        Self {
            store,
            default_alias: default_alias.into(),
            owner_aliases: HashMap::new(),
            default_password: Zeroizing::new(default_password.into()),
            key_passwords: HashMap::new(),
        }
    }

    /// Map an owner identifier to an alias.
    pub fn with_owner_alias(mut self, owner: impl Into<String>, alias: impl Into<String>) -> Self {
        self.owner_aliases.insert(owner.into(), alias.into());
        self
    }

    /// Use a dedicated password for one alias's private key.
    pub fn with_key_password(
        mut self,
        alias: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.key_passwords
            .insert(alias.into(), Zeroizing::new(password.into()));
        self
    }

    /// The configured default alias.
    pub fn default_alias(&self) -> &str {
        &self.default_alias
    }

    fn password_for(&self, alias: &str) -> &[u8] {
        self.key_passwords
            .get(alias)
            .unwrap_or(&self.default_password)
            .as_bytes()
    }

    fn store_error(&self, alias: &str, what: &str, err: KeyStoreError) -> CryptoServiceError {
        CryptoServiceError::store_access(
            format!("failed to read {what} '{alias}' from {}", self.store.name()),
            err,
        )
    }

    fn missing<T>(
        &self,
        alias: String,
        present_reason: NotFoundReason,
    ) -> Result<Resolution<T>, CryptoServiceError> {
        let reason = match self.store.contains(&alias) {
            Ok(true) => present_reason,
            Ok(false) => NotFoundReason::MissingAlias,
            Err(e) => return self.lookup_failed(alias, "entry", e),
        };
        tracing::debug!(alias = %alias, %reason, "key resolution found nothing");
        Ok(Resolution::NotFound { alias, reason })
    }

    // A malformed alias names nothing the store could hold.
    fn lookup_failed<T>(
        &self,
        alias: String,
        what: &str,
        err: KeyStoreError,
    ) -> Result<Resolution<T>, CryptoServiceError> {
        match err {
            KeyStoreError::InvalidAlias(_) => {
                tracing::debug!(alias = %alias, "alias is not a valid key store name");
                Ok(Resolution::NotFound {
                    alias,
                    reason: NotFoundReason::MissingAlias,
                })
            }
            other => Err(self.store_error(&alias, what, other)),
        }
    }
}

impl KeyResolver for KeyStoreResolver {
    fn alias_for(&self, ctx: &CryptoContext) -> String {
        if let Some(alias) = ctx.alias() {
            return alias.to_string();
        }
        self.owner_aliases
            .get(ctx.owner().as_str())
            .cloned()
            .unwrap_or_else(|| self.default_alias.clone())
    }

    fn resolve_certificate(
        &self,
        ctx: &CryptoContext,
    ) -> Result<Resolution<Certificate>, CryptoServiceError> {
        let alias = self.alias_for(ctx);
        match self.store.certificate(&alias) {
            Ok(Some(cert)) => {
                tracing::debug!(%ctx, usage = ?ctx.usage(), alias = %alias, subject = %cert.subject(), "resolved certificate");
                Ok(Resolution::Found(cert))
            }
            Ok(None) => self.missing(alias, NotFoundReason::NoCertificate),
            Err(e) => self.lookup_failed(alias, "certificate", e),
        }
    }

    fn resolve_private_key(
        &self,
        ctx: &CryptoContext,
    ) -> Result<Resolution<PrivateKey>, CryptoServiceError> {
        let alias = self.alias_for(ctx);
        match self.store.private_key(&alias, self.password_for(&alias)) {
            Ok(Some(key)) => {
                tracing::debug!(%ctx, usage = ?ctx.usage(), alias = %alias, algorithm = key.algorithm(), "resolved private key");
                Ok(Resolution::Found(key))
            }
            Ok(None) => self.missing(alias, NotFoundReason::NoPrivateKey),
            Err(err @ KeyStoreError::WrongPassword { .. }) => {
                tracing::warn!(alias = %alias, "private key access denied");
                Ok(Resolution::AccessDenied {
                    alias,
                    reason: err.to_string(),
                })
            }
            Err(e) => self.lookup_failed(alias, "private key", e),
        }
    }

    fn resolve_secret_key(
        &self,
        ctx: &CryptoContext,
    ) -> Result<Resolution<SymmetricKey>, CryptoServiceError> {
        let alias = self.alias_for(ctx);
        match self.store.secret_key(&alias) {
            Ok(Some(key)) => {
                tracing::debug!(%ctx, usage = ?ctx.usage(), alias = %alias, bits = key.bits(), "resolved secret key");
                Ok(Resolution::Found(key))
            }
            Ok(None) => self.missing(alias, NotFoundReason::NoSecretKey),
            Err(e) => self.lookup_failed(alias, "secret key", e),
        }
    }

    fn resolve_by_thumbprint(
        &self,
        thumbprint: &Thumbprint,
    ) -> Result<Resolution<CertificateEntry>, CryptoServiceError> {
        let aliases = self
            .store
            .aliases()
            .map_err(|e| self.store_error("*", "aliases", e))?;
        for alias in aliases {
            // Unreadable certificates elsewhere in the store must not hide a match.
            let cert = match self.store.certificate(&alias) {
                Ok(Some(cert)) => cert,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(alias = %alias, error = %e, "skipping unreadable certificate");
                    continue;
                }
            };
            if thumbprint.matches(cert.der()) {
                tracing::debug!(%thumbprint, alias = %alias, "resolved certificate by thumbprint");
                return Ok(Resolution::Found(CertificateEntry {
                    alias,
                    certificate: cert,
                }));
            }
        }
        Ok(Resolution::NotFound {
            alias: thumbprint.to_string(),
            reason: NotFoundReason::NoCertificate,
        })
    }
}

impl std::fmt::Debug for KeyStoreResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStoreResolver")
            .field("store", &self.store.name())
            .field("default_alias", &self.default_alias)
            .field("owner_aliases", &self.owner_aliases)
            .field("default_password", &"[REDACTED]")
            .field("key_passwords", &self.key_passwords.keys().collect::<Vec<_>>())
            .finish()
    }
}
