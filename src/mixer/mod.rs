//! Parallel entropy mixing.
//!
//! Each work-item of the `gather_entropy` kernel folds one pseudo-random
//! seed word, one time-derived nonce and the whole shared sample buffer
//! into a single 64-bit word. The mix depends on all three input classes
//! at once and is deterministic for identical inputs.

mod gather;
mod inputs;

pub use gather::EntropyMixer;
pub use inputs::{EntropySources, FixedClock, MixerInputs, SystemClock, TimeSource};
