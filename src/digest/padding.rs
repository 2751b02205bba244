//! SHA-256 message padding.

use crate::kernels::lanes::BLOCK_WORDS;
use zeroize::Zeroizing;

/// Bytes per 512-bit message block.
pub const BLOCK_BYTES: usize = BLOCK_WORDS * 4;

/// Pads `data` to whole blocks and returns the big-endian message words.
///
/// Appends `0x80`, zero bytes up to 56 mod 64, and the 64-bit big-endian
/// bit length.
pub fn pad_message(data: &[u8]) -> Zeroizing<Vec<u32>> {
    let blocks = block_count(data.len());
    let mut bytes = Zeroizing::new(vec![0u8; blocks * BLOCK_BYTES]);
    bytes[..data.len()].copy_from_slice(data);
    bytes[data.len()] = 0x80;

    let bit_len = (data.len() as u64).wrapping_mul(8);
    let tail = bytes.len() - 8;
    bytes[tail..].copy_from_slice(&bit_len.to_be_bytes());

    Zeroizing::new(
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

/// Number of blocks the padded form of a `len`-byte message spans.
#[inline]
pub fn block_count(len: usize) -> usize {
    (len + 9).div_ceil(BLOCK_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_boundaries() {
        assert_eq!(block_count(0), 1);
        assert_eq!(block_count(55), 1);
        assert_eq!(block_count(56), 2);
        assert_eq!(block_count(64), 2);
        assert_eq!(block_count(119), 2);
        assert_eq!(block_count(120), 3);
    }

    #[test]
    fn test_pad_abc() {
        let words = pad_message(b"abc");
        assert_eq!(words.len(), 16);
        assert_eq!(words[0], 0x6162_6380);
        assert!(words[1..15].iter().all(|&w| w == 0));
        assert_eq!(words[15], 24);
    }

    #[test]
    fn test_pad_32_byte_seed() {
        let words = pad_message(&[0xFF; 32]);
        assert_eq!(words.len(), 16);
        assert_eq!(words[7], 0xFFFF_FFFF);
        assert_eq!(words[8], 0x8000_0000);
        assert_eq!(words[15], 256);
    }
}
