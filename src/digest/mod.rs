//! Hash primitives used to whiten candidate seeds.
//!
//! The default primitive is [`DigestEngine`], SHA-256 evaluated on the
//! compute device. Anything implementing [`HashPrimitive`] can stand in
//! for it, which is how mis-sized digests are exercised in tests.

mod engine;
mod padding;

pub use engine::{DigestEngine, DIGEST_LEN};
pub use padding::{block_count, pad_message, BLOCK_BYTES};

use crate::device::DeviceError;
use zeroize::Zeroizing;

/// A hash function producing fixed-length output.
pub trait HashPrimitive {
    /// Digest length in bytes.
    fn output_len(&self) -> usize;

    /// Hashes `data`.
    fn hash(&mut self, data: &[u8]) -> Result<Vec<u8>, DeviceError>;

    /// Hashes `data`, then hashes the result. The intermediate digest is
    /// wiped before returning.
    fn double_hash(&mut self, data: &[u8]) -> Result<Vec<u8>, DeviceError> {
        let first = Zeroizing::new(self.hash(data)?);
        self.hash(&first)
    }
}
