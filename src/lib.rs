//! GPU Key Generation Library
//!
//! Generates 256-bit private keys from entropy gathered by massively
//! parallel compute kernels. Key material never outlives the call that
//! produced it, except for the key itself.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! device → mixer → seed selection → digest → digest → key → derivation
//!             ↓                        ↓
//!           sanitize (wipe on every exit path)
//! ```
//!
//! # Design Principles
//!
//! - **Injected randomness**: RNG and clock are passed into each call
//! - **One device, released once**: acquisition is scoped, teardown runs on drop
//! - **Standard primitives**: ChaCha20 for seed material, SHA-256 for whitening
//! - **Fail loudly**: no retries, no partial keys, no silent length coercion
//!
//! # Example
//!
//! ```no_run
//! use gpu_keygen::{EntropySources, FileConfig, KeyGenerator};
//!
//! let config = FileConfig::default();
//! let mut generator = KeyGenerator::from_config(&config).unwrap();
//! let mut sources = EntropySources::from_os_entropy();
//!
//! let key = generator.generate(&mut sources).unwrap();
//! println!("{}", key.private_key.to_hex());
//!
//! generator.release();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod device;
pub mod digest;
pub mod kernels;
pub mod keygen;
pub mod metrics;
pub mod mixer;
pub mod sanitize;

// Re-export commonly used types at crate root
pub use config::{ConfigError, FileConfig};
pub use device::{acquire_device, Device, DeviceError, DeviceInfo, DeviceKind};
pub use digest::{DigestEngine, HashPrimitive};
pub use keygen::{
    CandidateSeed, GeneratedKey, KeyDerivation, KeyGenerator, KeygenError, PrivateKeyBytes,
    SeedSelection, WalletKeys,
};
pub use mixer::{EntropyMixer, EntropySources, MixerInputs, TimeSource};
pub use sanitize::{Sensitive, WipeOnDrop};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
