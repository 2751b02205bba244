//! Native lane functions mirroring `entropy_sha256.wgsl`.
//!
//! Each function computes what one work-item of the matching WGSL entry
//! point computes, with the same 32-bit wrapping arithmetic.

const GOLDEN_GAMMA: u32 = 0x9e37_79b9;
const FNV_PRIME: u32 = 0x0100_0193;

const ROUND_K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

const INITIAL_STATE: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Words in one expanded message schedule.
pub(crate) const SCHEDULE_WORDS: usize = 64;

/// Words in one 64-byte message block.
pub(crate) const BLOCK_WORDS: usize = 16;

#[inline]
fn fmix32(x: u32) -> u32 {
    let mut h = x;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// One work-item of `gather_entropy`.
///
/// `seed` and `nonce` are `[low, high]` halves of the lane's 64-bit words.
/// Returns the lane's mixed word in the same layout.
pub(crate) fn gather_lane(
    lane: u32,
    seed: [u32; 2],
    nonce: [u32; 2],
    sample_words: &[u32],
    sample_len: u32,
) -> [u32; 2] {
    let mut acc_a = seed[0] ^ fmix32(nonce[1] ^ lane.wrapping_mul(GOLDEN_GAMMA));
    let mut acc_b = seed[1] ^ fmix32(nonce[0].wrapping_add(GOLDEN_GAMMA));

    for i in 0..sample_len {
        let bits = (sample_words[(i >> 2) as usize] >> ((i & 3) * 8)) & 0xff;
        acc_a = (acc_a ^ bits).wrapping_mul(FNV_PRIME);
        acc_b = acc_b.rotate_left(5) ^ acc_a;
    }

    let lo = fmix32(acc_a ^ acc_b.rotate_left(13) ^ nonce[0]);
    let hi = fmix32(acc_b ^ acc_a.rotate_left(27) ^ seed[0] ^ nonce[1]);
    [lo, hi]
}

/// One work-item of `sha256_schedule`: expands `block` of `message` into `out`.
pub(crate) fn schedule_block(message: &[u32], block: usize, out: &mut [u32]) {
    let words = &message[block * BLOCK_WORDS..(block + 1) * BLOCK_WORDS];
    out[..BLOCK_WORDS].copy_from_slice(words);
    for t in BLOCK_WORDS..SCHEDULE_WORDS {
        let w15 = out[t - 15];
        let w2 = out[t - 2];
        let s0 = w15.rotate_right(7) ^ w15.rotate_right(18) ^ (w15 >> 3);
        let s1 = w2.rotate_right(17) ^ w2.rotate_right(19) ^ (w2 >> 10);
        out[t] = out[t - 16]
            .wrapping_add(s0)
            .wrapping_add(out[t - 7])
            .wrapping_add(s1);
    }
}

/// The single work-item of `sha256_compress`.
pub(crate) fn compress(schedule: &[u32], block_count: usize) -> [u32; 8] {
    let mut hs = INITIAL_STATE;

    for w in schedule.chunks_exact(SCHEDULE_WORDS).take(block_count) {
        let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = hs;

        for t in 0..SCHEDULE_WORDS {
            let big_s1 = e.rotate_right(6) ^ e.rotate_right(11) ^ e.rotate_right(25);
            let choose = (e & f) ^ (!e & g);
            let t1 = h
                .wrapping_add(big_s1)
                .wrapping_add(choose)
                .wrapping_add(ROUND_K[t])
                .wrapping_add(w[t]);
            let big_s0 = a.rotate_right(2) ^ a.rotate_right(13) ^ a.rotate_right(22);
            let majority = (a & b) ^ (a & c) ^ (b & c);
            let t2 = big_s0.wrapping_add(majority);
            h = g;
            g = f;
            f = e;
            e = d.wrapping_add(t1);
            d = c;
            c = b;
            b = a;
            a = t1.wrapping_add(t2);
        }

        for (state, word) in hs.iter_mut().zip([a, b, c, d, e, f, g, h]) {
            *state = state.wrapping_add(word);
        }
    }

    hs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmix32_zero_is_fixed_point() {
        assert_eq!(fmix32(0), 0);
        assert_ne!(fmix32(1), 1);
    }

    #[test]
    fn test_gather_lane_depends_on_every_input() {
        let samples = [0x0403_0201u32, 0x0807_0605];
        let base = gather_lane(3, [7, 0], [11, 0], &samples, 8);

        assert_ne!(base, gather_lane(3, [8, 0], [11, 0], &samples, 8));
        assert_ne!(base, gather_lane(3, [7, 0], [12, 0], &samples, 8));
        assert_ne!(base, gather_lane(3, [7, 0], [11, 0], &[0x0403_0201, 0x0807_0604], 8));
        assert_ne!(base, gather_lane(4, [7, 0], [11, 0], &samples, 8));
    }

    #[test]
    fn test_gather_lane_ignores_bytes_past_len() {
        let a = gather_lane(0, [1, 2], [3, 4], &[0x0000_00aa, 0xdead_beef], 1);
        let b = gather_lane(0, [1, 2], [3, 4], &[0x1234_56aa, 0x0000_0000], 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_compress_empty_message_block() {
        // SHA-256("") is a single block: 0x80 followed by zeros.
        let mut message = [0u32; BLOCK_WORDS];
        message[0] = 0x8000_0000;
        let mut schedule = [0u32; SCHEDULE_WORDS];
        schedule_block(&message, 0, &mut schedule);

        let state = compress(&schedule, 1);
        assert_eq!(state[0], 0xe3b0_c442);
        assert_eq!(state[7], 0x7852_b855);
    }
}
