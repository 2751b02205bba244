//! Fixed-size key material.

use super::KeygenError;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Bytes in a candidate seed or private key.
pub const KEY_LEN: usize = 32;

/// Mixed entropy words folded into a candidate seed.
pub const SEED_WORDS: usize = KEY_LEN / 8;

/// How the candidate seed is taken from the mixed entropy vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSelection {
    /// The first four lanes, serialized little-endian. Remaining lanes
    /// are computed and discarded.
    #[default]
    Leading,
    /// Every lane XORed into seed word `lane % 4`.
    FoldAll,
}

/// 32 bytes selected from the mixed entropy, before whitening.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CandidateSeed([u8; KEY_LEN]);

impl CandidateSeed {
    /// Builds the seed from mixed entropy words.
    pub fn from_mixed(mixed: &[u64], selection: SeedSelection) -> Result<Self, KeygenError> {
        if mixed.len() < SEED_WORDS {
            return Err(KeygenError::PreconditionViolation(format!(
                "{} mixed words cannot fill a {}-byte seed",
                mixed.len(),
                KEY_LEN
            )));
        }

        let mut words = [0u64; SEED_WORDS];
        match selection {
            SeedSelection::Leading => words.copy_from_slice(&mixed[..SEED_WORDS]),
            SeedSelection::FoldAll => {
                for (lane, word) in mixed.iter().enumerate() {
                    words[lane % SEED_WORDS] ^= word;
                }
            }
        }

        let mut bytes = [0u8; KEY_LEN];
        for (chunk, word) in bytes.chunks_exact_mut(8).zip(words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        words.zeroize();
        Ok(Self(bytes))
    }

    /// Wraps exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeygenError> {
        exact(bytes, "candidate seed").map(Self)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for CandidateSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateSeed").finish_non_exhaustive()
    }
}

/// The whitened 256-bit private key.
///
/// This is the only key material handed to the derivation collaborator.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKeyBytes([u8; KEY_LEN]);

impl PrivateKeyBytes {
    /// Wraps exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeygenError> {
        exact(bytes, "private key").map(Self)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for PrivateKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKeyBytes").finish_non_exhaustive()
    }
}

fn exact(bytes: &[u8], what: &str) -> Result<[u8; KEY_LEN], KeygenError> {
    <[u8; KEY_LEN]>::try_from(bytes).map_err(|_| {
        KeygenError::PreconditionViolation(format!(
            "{} must be {} bytes, got {}",
            what,
            KEY_LEN,
            bytes.len()
        ))
    })
}
