//! Mixer inputs and the randomness capability that draws them.

use crate::sanitize::Sensitive;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, OsRng, RngCore, SeedableRng};
use zeroize::Zeroize;

/// Source of the time component of per-lane nonces.
pub trait TimeSource {
    /// Current time in nanoseconds since an arbitrary epoch.
    fn now_nanos(&self) -> u64;
}

/// Wall-clock time via `chrono`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now_nanos(&self) -> u64 {
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .map(|n| n as u64)
            .unwrap_or_default()
    }
}

/// A clock frozen at one instant (tests and reproducible runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock(pub u64);

impl TimeSource for FixedClock {
    fn now_nanos(&self) -> u64 {
        self.0
    }
}

/// The three input classes of one mixer launch.
///
/// All three vectors are sensitive and are wiped by the generator before
/// it returns.
#[derive(Default)]
pub struct MixerInputs {
    entropy_block: Vec<u64>,
    samples: Vec<u8>,
    time_nonce: Vec<u64>,
}

impl MixerInputs {
    /// Assembles inputs from explicit vectors.
    ///
    /// Production code draws them through [`EntropySources::draw`]; fixed
    /// vectors are for reproducible runs.
    pub fn new(entropy_block: Vec<u64>, samples: Vec<u8>, time_nonce: Vec<u64>) -> Self {
        Self {
            entropy_block,
            samples,
            time_nonce,
        }
    }

    /// Per-lane pseudo-random seed words.
    #[inline]
    pub fn entropy_block(&self) -> &[u64] {
        &self.entropy_block
    }

    /// Auxiliary sample bytes shared by every lane.
    #[inline]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Per-lane time-derived nonces.
    #[inline]
    pub fn time_nonce(&self) -> &[u64] {
        &self.time_nonce
    }

    /// Number of lanes the inputs describe.
    #[inline]
    pub fn width(&self) -> usize {
        self.entropy_block.len()
    }
}

impl Sensitive for MixerInputs {
    fn wipe(&mut self) {
        self.entropy_block.wipe();
        self.samples.wipe();
        self.time_nonce.wipe();
    }

    fn is_wiped(&self) -> bool {
        self.entropy_block.is_wiped() && self.samples.is_wiped() && self.time_nonce.is_wiped()
    }
}

impl std::fmt::Debug for MixerInputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixerInputs")
            .field("lanes", &self.entropy_block.len())
            .field("sample_bytes", &self.samples.len())
            .finish_non_exhaustive()
    }
}

/// Randomness capability passed into each generation call.
///
/// Bundles a cryptographic RNG with a clock. Injecting both keeps
/// production runs unpredictable while letting tests fix every input.
pub struct EntropySources<R, C = SystemClock> {
    rng: R,
    clock: C,
}

impl EntropySources<ChaCha20Rng, SystemClock> {
    /// ChaCha20 seeded from the OS entropy source, wall-clock time.
    pub fn from_os_entropy() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        let rng = ChaCha20Rng::from_seed(seed);
        seed.zeroize();

        Self::new(rng, SystemClock)
    }
}

impl<R: RngCore + CryptoRng, C: TimeSource> EntropySources<R, C> {
    pub fn new(rng: R, clock: C) -> Self {
        Self { rng, clock }
    }

    /// Draws fresh inputs for `width` lanes and `sample_len` sample bytes.
    ///
    /// Each nonce combines a fresh RNG word with the current time offset
    /// by the lane index, so nonces differ across lanes and calls.
    pub fn draw(&mut self, width: usize, sample_len: usize) -> MixerInputs {
        let entropy_block: Vec<u64> = (0..width).map(|_| self.rng.next_u64()).collect();

        let mut samples = vec![0u8; sample_len];
        self.rng.fill_bytes(&mut samples);

        let now = self.clock.now_nanos();
        let time_nonce = (0..width as u64)
            .map(|lane| self.rng.next_u64() ^ now.wrapping_add(lane))
            .collect();

        tracing::trace!(lanes = width, sample_bytes = sample_len, "Drew mixer inputs");

        MixerInputs {
            entropy_block,
            samples,
            time_nonce,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u8) -> EntropySources<ChaCha20Rng, FixedClock> {
        EntropySources::new(ChaCha20Rng::from_seed([seed; 32]), FixedClock(1_000))
    }

    #[test]
    fn test_draw_shapes() {
        let inputs = seeded(1).draw(256, 1024);
        assert_eq!(inputs.width(), 256);
        assert_eq!(inputs.entropy_block().len(), 256);
        assert_eq!(inputs.time_nonce().len(), 256);
        assert_eq!(inputs.samples().len(), 1024);
    }

    #[test]
    fn test_same_seed_same_inputs() {
        let a = seeded(3).draw(8, 16);
        let b = seeded(3).draw(8, 16);
        assert_eq!(a.entropy_block(), b.entropy_block());
        assert_eq!(a.samples(), b.samples());
        assert_eq!(a.time_nonce(), b.time_nonce());
    }

    #[test]
    fn test_nonces_differ_across_draws() {
        let mut sources = seeded(5);
        let first = sources.draw(4, 4);
        let second = sources.draw(4, 4);
        assert_ne!(first.time_nonce(), second.time_nonce());
    }

    #[test]
    fn test_wipe_keeps_lengths() {
        let mut inputs = seeded(9).draw(4, 10);
        inputs.wipe();
        assert!(inputs.is_wiped());
        assert_eq!(inputs.width(), 4);
        assert_eq!(inputs.samples().len(), 10);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let first = clock.now_nanos();
        let second = clock.now_nanos();
        assert!(first > 0);
        assert!(second >= first);
    }
}
