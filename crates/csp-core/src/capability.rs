//! # Capability Flags
//!
//! Optional operations are declared up front instead of being discovered by
//! calling them and catching `NotSupported`.

use serde::{Deserialize, Serialize};

/// An optional operation a provider may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// `hybrid_encrypt` / `hybrid_decrypt`.
    HybridEncryption,
    /// Encrypt/decrypt with self-contained ciphertext envelopes.
    SelfContainedCiphertext,
    /// Routing an operation to a named internal provider.
    ProviderSelection,
}

/// Set of optional operations a provider supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Hybrid envelope encryption.
    pub hybrid_encryption: bool,
    /// Self-contained ciphertext envelopes.
    pub self_contained_ciphertext: bool,
    /// Internal provider selection by type name.
    pub provider_selection: bool,
}

impl Capabilities {
    /// No optional operations.
    pub const NONE: Self = Self {
        hybrid_encryption: false,
        self_contained_ciphertext: false,
        provider_selection: false,
    };

    /// Add a capability.
    pub fn with(mut self, capability: Capability) -> Self {
        match capability {
            Capability::HybridEncryption => self.hybrid_encryption = true,
            Capability::SelfContainedCiphertext => self.self_contained_ciphertext = true,
            Capability::ProviderSelection => self.provider_selection = true,
        }
        self
    }

    /// Whether the capability is present.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::HybridEncryption => self.hybrid_encryption,
            Capability::SelfContainedCiphertext => self.self_contained_ciphertext,
            Capability::ProviderSelection => self.provider_selection,
        }
    }

    /// Present capabilities, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        [
            Capability::HybridEncryption,
            Capability::SelfContainedCiphertext,
            Capability::ProviderSelection,
        ]
        .into_iter()
        .filter(|c| self.supports(*c))
    }
}
