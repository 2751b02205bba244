//! Private key generation.
//!
//! One generation runs the whole pipeline on an acquired device:
//!
//! ```text
//! draw inputs → gather_entropy → select seed → SHA-256 → SHA-256 → key
//!      └──────────── wiped before the call returns ─────────────┘
//! ```
//!
//! The finished key may then be handed to a [`KeyDerivation`]
//! collaborator for public-key and address encoding.

mod generator;
mod handoff;
mod material;

pub use generator::{whiten, GeneratedKey, KeyGenerator, Workspace};
pub use handoff::{DerivationError, KeyDerivation, WalletKeys};
pub use material::{CandidateSeed, PrivateKeyBytes, SeedSelection, KEY_LEN, SEED_WORDS};

use crate::config::ConfigError;
use crate::device::DeviceError;
use thiserror::Error;

/// Errors raised by key generation.
#[derive(Debug, Error)]
pub enum KeygenError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
    #[error("key derivation failed: {0}")]
    Derivation(#[from] DerivationError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl KeygenError {
    /// Stable category name used in diagnostics and metrics labels.
    pub fn category(&self) -> &'static str {
        match self {
            KeygenError::Device(e) => e.category(),
            KeygenError::PreconditionViolation(_) => "PreconditionViolation",
            KeygenError::Derivation(_) => "DerivationError",
            KeygenError::Config(e) => e.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_stable() {
        assert_eq!(
            KeygenError::from(DeviceError::NoDeviceAvailable).category(),
            "NoDeviceAvailable"
        );
        assert_eq!(
            KeygenError::from(DeviceError::Compile("x".into())).category(),
            "CompileError"
        );
        assert_eq!(
            KeygenError::from(DeviceError::Execution("x".into())).category(),
            "BackendExecutionError"
        );
        assert_eq!(
            KeygenError::PreconditionViolation("x".into()).category(),
            "PreconditionViolation"
        );
        assert_eq!(
            KeygenError::from(DerivationError::EmptyPublicKey).category(),
            "DerivationError"
        );
    }
}
