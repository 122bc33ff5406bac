//! # Crypto Context
//!
//! A [`CryptoContext`] tells the service *whose* key or certificate an
//! operation needs. It is built by the caller for a single operation and
//! never persisted.
//!
//! The resolver maps a context to a key-store alias in this order:
//! explicit alias override, then an owner-to-alias mapping, then the
//! default alias.

use serde::{Deserialize, Serialize};

use crate::error::CryptoServiceError;

/// Logical owner of key material (tenant domain, entity alias, partner id).
///
/// Validated on construction: blank identifiers are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create an owner identifier. Leading and trailing whitespace is trimmed.
    pub fn new(id: impl AsRef<str>) -> Result<Self, CryptoServiceError> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(CryptoServiceError::Validation(
                "owner identifier must not be blank".into(),
            ));
        }
        Ok(Self(id.to_string()))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the resolved key will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsage {
    /// Producing or verifying signatures.
    Signing,
    /// Encrypting or decrypting data.
    Encryption,
}

impl std::fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signing => f.write_str("signing"),
            Self::Encryption => f.write_str("encryption"),
        }
    }
}

/// Identifies whose key or certificate an operation should use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoContext {
    owner: OwnerId,
    usage: Option<KeyUsage>,
    alias: Option<String>,
}

impl CryptoContext {
    /// Context for the given owner with no usage hint and no alias override.
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            usage: None,
            alias: None,
        }
    }

    /// Context that names a key-store alias directly.
    ///
    /// The alias doubles as the owner identifier.
    pub fn for_alias(alias: impl AsRef<str>) -> Result<Self, CryptoServiceError> {
        let owner = OwnerId::new(alias.as_ref())?;
        let alias = owner.as_str().to_string();
        Ok(Self {
            owner,
            usage: None,
            alias: Some(alias),
        })
    }

    /// Attach a key-usage hint.
    pub fn with_usage(mut self, usage: KeyUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Override alias resolution with an explicit alias. Blank aliases are ignored.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        let trimmed = alias.trim();
        self.alias = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// The logical owner.
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// The key-usage hint, if any. Informational: resolvers log it but do
    /// not select keys by it.
    pub fn usage(&self) -> Option<KeyUsage> {
        self.usage
    }

    /// The explicit alias override, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

impl std::fmt::Display for CryptoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "owner:{}", self.owner)?;
        if let Some(usage) = self.usage {
            write!(f, " usage:{usage}")?;
        }
        if let Some(alias) = &self.alias {
            write!(f, " alias:{alias}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_id_rejects_blank() {
        assert!(OwnerId::new("").is_err());
        assert!(OwnerId::new("   ").is_err());
        assert!(matches!(
            OwnerId::new("\t"),
            Err(CryptoServiceError::Validation(_))
        ));
    }

    #[test]
    fn owner_id_trims() {
        let owner = OwnerId::new("  tenant.example ").unwrap();
        assert_eq!(owner.as_str(), "tenant.example");
        assert_eq!(owner.to_string(), "tenant.example");
    }

    #[test]
    fn context_builder() {
        let ctx = CryptoContext::new(OwnerId::new("tenant-a").unwrap())
            .with_usage(KeyUsage::Signing)
            .with_alias("signer");
        assert_eq!(ctx.owner().as_str(), "tenant-a");
        assert_eq!(ctx.usage(), Some(KeyUsage::Signing));
        assert_eq!(ctx.alias(), Some("signer"));
        assert_eq!(ctx.to_string(), "owner:tenant-a usage:signing alias:signer");
    }

    #[test]
    fn blank_alias_override_is_ignored() {
        let ctx = CryptoContext::new(OwnerId::new("tenant-a").unwrap()).with_alias("  ");
        assert_eq!(ctx.alias(), None);
    }

    #[test]
    fn for_alias_sets_owner_and_alias() {
        let ctx = CryptoContext::for_alias("internal-key").unwrap();
        assert_eq!(ctx.owner().as_str(), "internal-key");
        assert_eq!(ctx.alias(), Some("internal-key"));
        assert!(CryptoContext::for_alias("").is_err());
    }

    #[test]
    fn context_serde_roundtrip() {
        let ctx = CryptoContext::new(OwnerId::new("partner").unwrap())
            .with_usage(KeyUsage::Encryption);
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"encryption\""));
        let back: CryptoContext = serde_json::from_str(&json).unwrap();
        assert_eq!(ctx, back);
    }
}
