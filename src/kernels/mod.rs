//! Kernel program shared by every compute device.
//!
//! The WGSL source is the contract between host and device code. Devices
//! that execute the WGSL directly (the `gpu` feature) compile it; the host
//! device validates it the same way and then runs the native lane functions
//! below, which compute the same values bit for bit.

pub(crate) mod lanes;

/// Kernel program source, embedded at compile time.
pub const KERNEL_SOURCE: &str = include_str!("entropy_sha256.wgsl");

/// Entry point of the entropy mixer.
///
/// Arguments: `mixed` (out, u64 per lane), `seed_block` (u64 per lane),
/// `time_nonce` (u64 per lane), `sample_data` (bytes), `sample_len` (scalar).
pub const GATHER_ENTROPY: &str = "gather_entropy";

/// Entry point expanding one SHA-256 message schedule per 64-byte block.
///
/// Arguments: `message` (big-endian words), `block_count` (scalar),
/// `schedule` (64 words per block, read/write).
pub const SHA256_SCHEDULE: &str = "sha256_schedule";

/// Entry point running the SHA-256 compression chain over all schedules.
///
/// Arguments: `block_count` (scalar), `schedule`, `digest_out` (8 words).
pub const SHA256_COMPRESS: &str = "sha256_compress";

/// Every entry point the key generator launches.
pub const REQUIRED_KERNELS: [&str; 3] = [GATHER_ENTROPY, SHA256_SCHEDULE, SHA256_COMPRESS];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_declares_all_kernels() {
        for name in REQUIRED_KERNELS {
            assert!(
                KERNEL_SOURCE.contains(&format!("fn {}(", name)),
                "missing entry point {}",
                name
            );
        }
    }
}
