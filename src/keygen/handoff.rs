//! Handoff to the key-derivation collaborator.
//!
//! Public-key derivation and address encoding live outside this crate.
//! The collaborator receives exactly 32 raw private-key bytes and reports
//! back the wallet artifacts it derived.

use super::PrivateKeyBytes;
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors reported by a derivation collaborator.
#[derive(Debug, Error)]
pub enum DerivationError {
    #[error("private key rejected: {0}")]
    InvalidKey(String),
    #[error("collaborator returned an empty public key")]
    EmptyPublicKey,
    #[error("{0}")]
    Other(String),
}

/// Artifacts derived from a private key.
pub struct WalletKeys {
    /// Wallet-import string. Secret, wiped on drop.
    pub wif: Zeroizing<String>,
    /// Primary address encoding.
    pub address: String,
    /// Legacy address encoding.
    pub legacy_address: String,
    /// Serialized public key.
    pub public_key: Vec<u8>,
}

impl std::fmt::Debug for WalletKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKeys")
            .field("address", &self.address)
            .field("legacy_address", &self.legacy_address)
            .field("public_key", &hex::encode(&self.public_key))
            .finish_non_exhaustive()
    }
}

/// External key derivation.
pub trait KeyDerivation {
    /// Derives wallet artifacts from a private key.
    fn derive(&self, key: &PrivateKeyBytes) -> Result<WalletKeys, DerivationError>;
}
