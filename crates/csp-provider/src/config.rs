//! Crypto service configuration and bootstrap.
//!
//! Loads from environment variables or a YAML file and builds a
//! [`DefaultCryptoService`] over a [`DirectoryKeyStore`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csp_core::{AlgorithmSpec, CryptoServiceError, KeyStoreError};
use serde::Deserialize;

use crate::internal::{
    KeyStoreInternalProvider, SymmetricKeyInternalProvider, KEYSTORE_PROVIDER_TYPE,
};
use crate::keystore::DirectoryKeyStore;
use crate::operations::KeyOperations;
use crate::resolver::{KeyResolver, KeyStoreResolver};
use crate::service::DefaultCryptoService;

/// Crypto service settings.
///
/// Custom `Debug` implementation redacts every password.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CryptoServiceConfig {
    /// Directory holding `<alias>.crt` / `.key` / `.aes` files.
    pub keystore_dir: PathBuf,
    /// Default alias, also the internal key of the `keystore` provider.
    pub key_alias: String,
    /// Password of the default alias's private key.
    pub key_password: String,
    /// Security provider applied by [`CryptoServiceConfig::algorithm`] when a
    /// request names none. Specs built elsewhere are passed through as is.
    #[serde(default)]
    pub security_provider: Option<String>,
    /// Internal provider type used when a request names none.
    #[serde(default = "default_internal_provider")]
    pub internal_provider: String,
    /// Alias of the secret key for the `symmetric` internal provider.
    #[serde(default)]
    pub symmetric_key_alias: Option<String>,
    /// Owner identifier to alias mapping.
    #[serde(default)]
    pub owner_aliases: BTreeMap<String, String>,
    /// Per-alias private key passwords.
    #[serde(default)]
    pub key_passwords: BTreeMap<String, String>,
    /// Whether hybrid encryption is available.
    #[serde(default = "default_true")]
    pub hybrid_enabled: bool,
}

fn default_internal_provider() -> String {
    KEYSTORE_PROVIDER_TYPE.to_string()
}

fn default_true() -> bool {
    true
}

impl std::fmt::Debug for CryptoServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoServiceConfig")
            .field("keystore_dir", &self.keystore_dir)
            .field("key_alias", &self.key_alias)
            .field("key_password", &"[REDACTED]")
            .field("security_provider", &self.security_provider)
            .field("internal_provider", &self.internal_provider)
            .field("symmetric_key_alias", &self.symmetric_key_alias)
            .field("owner_aliases", &self.owner_aliases)
            .field("key_passwords", &self.key_passwords.keys().collect::<Vec<_>>())
            .field("hybrid_enabled", &self.hybrid_enabled)
            .finish()
    }
}

impl CryptoServiceConfig {
    /// Minimal configuration: a key-store directory and its default key.
    pub fn new(
        keystore_dir: impl Into<PathBuf>,
        key_alias: impl Into<String>,
        key_password: impl Into<String>,
    ) -> Self {
        Self {
            keystore_dir: keystore_dir.into(),
            key_alias: key_alias.into(),
            key_password: key_password.into(),
            security_provider: None,
            internal_provider: default_internal_provider(),
            symmetric_key_alias: None,
            owner_aliases: BTreeMap::new(),
            key_passwords: BTreeMap::new(),
            hybrid_enabled: true,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CSP_KEYSTORE_DIR` (required)
    /// - `CSP_KEY_ALIAS` (required)
    /// - `CSP_KEY_PASSWORD` (required)
    /// - `CSP_SECURITY_PROVIDER`
    /// - `CSP_INTERNAL_PROVIDER` (default: `keystore`)
    /// - `CSP_SYMMETRIC_KEY_ALIAS`
    /// - `CSP_OWNER_ALIASES` (`owner=alias,owner=alias`)
    /// - `CSP_KEY_PASSWORDS` (`alias=password,alias=password`)
    /// - `CSP_HYBRID_ENABLED` (default: `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = Self {
            keystore_dir: PathBuf::from(required("CSP_KEYSTORE_DIR")?),
            key_alias: required("CSP_KEY_ALIAS")?,
            key_password: required("CSP_KEY_PASSWORD")?,
            security_provider: optional("CSP_SECURITY_PROVIDER"),
            internal_provider: optional("CSP_INTERNAL_PROVIDER")
                .unwrap_or_else(default_internal_provider),
            symmetric_key_alias: optional("CSP_SYMMETRIC_KEY_ALIAS"),
            owner_aliases: optional("CSP_OWNER_ALIASES")
                .map(|v| parse_pairs("CSP_OWNER_ALIASES", &v))
                .transpose()?
                .unwrap_or_default(),
            key_passwords: optional("CSP_KEY_PASSWORDS")
                .map(|v| parse_pairs("CSP_KEY_PASSWORDS", &v))
                .transpose()?
                .unwrap_or_default(),
            hybrid_enabled: optional("CSP_HYBRID_ENABLED")
                .map(|v| parse_bool("CSP_HYBRID_ENABLED", &v))
                .transpose()?
                .unwrap_or(true),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_yaml::from_str(&text)
            .map_err(|e| ConfigError::Yaml(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.key_alias.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "key_alias".into(),
                reason: "must not be blank".into(),
            });
        }
        if self.internal_provider.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "internal_provider".into(),
                reason: "must not be blank".into(),
            });
        }
        Ok(())
    }

    /// Algorithm spec for `name`. Without an explicit `provider` the
    /// configured security provider is used.
    pub fn algorithm(&self, name: &str, provider: Option<&str>) -> AlgorithmSpec {
        let spec = AlgorithmSpec::new(name);
        match provider.or(self.security_provider.as_deref()) {
            Some(p) => spec.with_provider(p),
            None => spec,
        }
    }

    /// Build the resolver this configuration describes.
    pub fn build_resolver(&self) -> Result<KeyStoreResolver, ConfigError> {
        let store = DirectoryKeyStore::open(&self.keystore_dir)?;
        let mut resolver =
            KeyStoreResolver::new(Arc::new(store), &self.key_alias, &self.key_password);
        for (owner, alias) in &self.owner_aliases {
            resolver = resolver.with_owner_alias(owner, alias);
        }
        for (alias, password) in &self.key_passwords {
            resolver = resolver.with_key_password(alias, password);
        }
        Ok(resolver)
    }

    /// Bootstrap a [`DefaultCryptoService`].
    pub fn build_service(&self) -> Result<DefaultCryptoService, ConfigError> {
        let resolver: Arc<dyn KeyResolver> = Arc::new(self.build_resolver()?);
        let operations = KeyOperations::default();

        let mut builder = DefaultCryptoService::builder(resolver.clone())
            .operations(operations.clone())
            .internal_provider(Arc::new(KeyStoreInternalProvider::new(
                resolver.clone(),
                operations.clone(),
                &self.key_alias,
            )?))
            .default_internal_provider(&self.internal_provider)
            .hybrid(self.hybrid_enabled);
        if let Some(alias) = &self.symmetric_key_alias {
            builder = builder.internal_provider(Arc::new(SymmetricKeyInternalProvider::new(
                resolver, operations, alias,
            )?));
        }
        let service = builder.build()?;
        tracing::debug!(config = ?self, "crypto service configured");
        Ok(service)
    }
}

fn parse_pairs(var: &str, raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (k, v) = item.split_once('=').ok_or_else(|| ConfigError::Invalid {
                field: var.to_string(),
                reason: format!("expected key=value, got {item:?}"),
            })?;
            let (k, v) = (k.trim(), v.trim());
            if k.is_empty() || v.is_empty() {
                return Err(ConfigError::Invalid {
                    field: var.to_string(),
                    reason: "empty key or value".into(),
                });
            }
            Ok((k.to_string(), v.to_string()))
        })
        .collect()
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            field: var.to_string(),
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML configuration: {0}")]
    Yaml(String),
    #[error("key store: {0}")]
    KeyStore(#[from] KeyStoreError),
    #[error("crypto service: {0}")]
    Service(#[from] CryptoServiceError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::CryptoService;
    use csp_core::{Capability, OperationDescriptor};
    use std::collections::HashMap;

    fn fixture_dir() -> String {
        format!("{}/tests/fixtures/keystore", env!("CARGO_MANIFEST_DIR"))
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn required_variables() {
        let err = CryptoServiceConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CSP_KEYSTORE_DIR")));
        let err = CryptoServiceConfig::from_lookup(lookup(&[
            ("CSP_KEYSTORE_DIR", "/tmp"),
            ("CSP_KEY_ALIAS", "tenant"),
            ("CSP_KEY_PASSWORD", " "),
        ]))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "CSP_KEY_PASSWORD environment variable is required"
        );
    }

    #[test]
    fn optional_variables() {
        let cfg = CryptoServiceConfig::from_lookup(lookup(&[
            ("CSP_KEYSTORE_DIR", "/keys"),
            ("CSP_KEY_ALIAS", "tenant"),
            ("CSP_KEY_PASSWORD", "pw"),
            ("CSP_SECURITY_PROVIDER", "rustcrypto"),
            ("CSP_INTERNAL_PROVIDER", "symmetric"),
            ("CSP_SYMMETRIC_KEY_ALIAS", "internal"),
            ("CSP_OWNER_ALIASES", "acme=tenant, partner-org = partner"),
            ("CSP_KEY_PASSWORDS", "signer=signer-pass"),
            ("CSP_HYBRID_ENABLED", "off"),
        ]))
        .unwrap();
        assert_eq!(cfg.keystore_dir, PathBuf::from("/keys"));
        assert_eq!(cfg.security_provider.as_deref(), Some("rustcrypto"));
        assert_eq!(cfg.internal_provider, "symmetric");
        assert_eq!(cfg.owner_aliases["partner-org"], "partner");
        assert_eq!(cfg.key_passwords["signer"], "signer-pass");
        assert!(!cfg.hybrid_enabled);
    }

    #[test]
    fn defaults() {
        let cfg = CryptoServiceConfig::from_lookup(lookup(&[
            ("CSP_KEYSTORE_DIR", "/keys"),
            ("CSP_KEY_ALIAS", "tenant"),
            ("CSP_KEY_PASSWORD", "pw"),
        ]))
        .unwrap();
        assert_eq!(cfg.internal_provider, "keystore");
        assert!(cfg.hybrid_enabled);
        assert!(cfg.owner_aliases.is_empty());
        assert!(cfg.security_provider.is_none());
    }

    #[test]
    fn malformed_pairs_and_bools() {
        let base = [
            ("CSP_KEYSTORE_DIR", "/keys"),
            ("CSP_KEY_ALIAS", "tenant"),
            ("CSP_KEY_PASSWORD", "pw"),
        ];
        let mut vars = base.to_vec();
        vars.push(("CSP_OWNER_ALIASES", "acme"));
        assert!(matches!(
            CryptoServiceConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { .. })
        ));
        let mut vars = base.to_vec();
        vars.push(("CSP_HYBRID_ENABLED", "maybe"));
        assert!(CryptoServiceConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn debug_redacts_passwords() {
        let mut cfg = CryptoServiceConfig::new("/keys", "tenant", "hunter2");
        cfg.key_passwords.insert("signer".into(), "signer-pass".into());
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains("signer-pass"));
        assert!(dbg.contains("signer"));
    }

    #[test]
    fn yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("csp.yaml");
        std::fs::write(
            &path,
            format!(
                "keystore_dir: {}\nkey_alias: tenant\nkey_password: tenant-pass\n\
                 symmetric_key_alias: internal\nowner_aliases:\n  partner-org: partner\n",
                fixture_dir()
            ),
        )
        .unwrap();
        let cfg = CryptoServiceConfig::from_yaml_file(&path).unwrap();
        assert_eq!(cfg.symmetric_key_alias.as_deref(), Some("internal"));
        assert_eq!(cfg.owner_aliases["partner-org"], "partner");

        std::fs::write(&path, "key_alias: [unclosed").unwrap();
        assert!(matches!(
            CryptoServiceConfig::from_yaml_file(&path),
            Err(ConfigError::Yaml(_))
        ));
        assert!(matches!(
            CryptoServiceConfig::from_yaml_file(dir.path().join("missing.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn build_service_from_fixtures() {
        let mut cfg = CryptoServiceConfig::new(fixture_dir(), "tenant", "tenant-pass");
        cfg.symmetric_key_alias = Some("internal".into());
        let svc = cfg.build_service().unwrap();
        let caps = svc.capabilities();
        assert!(caps.supports(Capability::HybridEncryption));
        assert!(caps.supports(Capability::ProviderSelection));

        let op = OperationDescriptor::default().self_contained(true);
        let ct = svc.encrypt(b"config", &op).unwrap();
        assert_eq!(svc.decrypt(&ct, &op).unwrap(), b"config");
    }

    #[test]
    fn configured_security_provider_reaches_the_primitives() {
        let mut cfg = CryptoServiceConfig::new(fixture_dir(), "tenant", "tenant-pass");
        assert_eq!(cfg.algorithm("RSA", None).provider(), None);

        cfg.security_provider = Some("rustcrypto".into());
        let svc = cfg.build_service().unwrap();
        let spec = cfg.algorithm("RSA", None);
        assert_eq!(spec.provider(), Some("rustcrypto"));
        let op = OperationDescriptor::new(spec);
        let ct = svc.encrypt(b"provider", &op).unwrap();
        assert_eq!(svc.decrypt(&ct, &op).unwrap(), b"provider");

        cfg.security_provider = Some("hsm-vendor".into());
        let op = OperationDescriptor::new(cfg.algorithm("RSA", None));
        assert!(matches!(
            svc.encrypt(b"x", &op),
            Err(CryptoServiceError::CryptoOperation { .. })
        ));
        assert_eq!(cfg.algorithm("RSA", Some("rustcrypto")).provider(), Some("rustcrypto"));
    }

    #[test]
    fn build_service_rejects_missing_directory() {
        let cfg = CryptoServiceConfig::new("/no/such/dir", "tenant", "pw");
        assert!(matches!(
            cfg.build_service(),
            Err(ConfigError::KeyStore(KeyStoreError::Unavailable(_)))
        ));
    }

    #[test]
    fn build_service_rejects_unregistered_default_provider() {
        let mut cfg = CryptoServiceConfig::new(fixture_dir(), "tenant", "tenant-pass");
        cfg.internal_provider = "symmetric".into();
        assert!(matches!(cfg.build_service(), Err(ConfigError::Service(_))));
    }
}
