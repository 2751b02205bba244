//! The generation pipeline.

use super::{
    CandidateSeed, DerivationError, KeyDerivation, KeygenError, PrivateKeyBytes, SeedSelection,
    WalletKeys, KEY_LEN, SEED_WORDS,
};
use crate::config::FileConfig;
use crate::device::{acquire_device, default_platforms, Device, Program};
use crate::digest::{DigestEngine, HashPrimitive};
use crate::kernels::REQUIRED_KERNELS;
use crate::mixer::{EntropyMixer, EntropySources, MixerInputs, TimeSource};
use crate::sanitize::{Sensitive, WipeOnDrop};
use rand_core::{CryptoRng, RngCore};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// Host storage for one generation: the drawn inputs and the mixed output.
///
/// Every field is wiped before the generation call returns.
#[derive(Default)]
pub struct Workspace {
    inputs: MixerInputs,
    mixed: Vec<u64>,
}

impl Workspace {
    pub fn new(inputs: MixerInputs) -> Self {
        Self {
            inputs,
            mixed: Vec::new(),
        }
    }

    #[inline]
    pub fn inputs(&self) -> &MixerInputs {
        &self.inputs
    }

    /// Mixer output of the last generation, zeroed once it returned.
    #[inline]
    pub fn mixed(&self) -> &[u64] {
        &self.mixed
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("inputs", &self.inputs)
            .field("mixed_lanes", &self.mixed.len())
            .finish_non_exhaustive()
    }
}

impl Sensitive for Workspace {
    fn wipe(&mut self) {
        self.inputs.wipe();
        self.mixed.wipe();
    }

    fn is_wiped(&self) -> bool {
        self.inputs.is_wiped() && self.mixed.is_wiped()
    }
}

/// Result of one generation.
#[derive(Debug)]
pub struct GeneratedKey {
    /// The candidate seed, kept only when the generator retains entropy.
    pub entropy: Option<CandidateSeed>,
    /// The whitened key.
    pub private_key: PrivateKeyBytes,
}

/// Double-hashes a candidate seed into a private key.
///
/// The primitive must produce 32-byte digests; any other size is a
/// precondition violation rather than a truncation or padding.
pub fn whiten<H: HashPrimitive + ?Sized>(
    primitive: &mut H,
    seed: &CandidateSeed,
) -> Result<PrivateKeyBytes, KeygenError> {
    if primitive.output_len() != KEY_LEN {
        return Err(KeygenError::PreconditionViolation(format!(
            "hash primitive yields {}-byte digests, private keys need {}",
            primitive.output_len(),
            KEY_LEN
        )));
    }

    let digest = Zeroizing::new(primitive.double_hash(seed.as_bytes())?);
    PrivateKeyBytes::from_bytes(&digest)
}

/// Generates private keys on an acquired compute device.
///
/// Owns the device for the lifetime of the run. Calls take `&mut self`,
/// so generations on one generator are serialized.
pub struct KeyGenerator {
    device: Device,
    program: Program,
    width: usize,
    sample_len: usize,
    selection: SeedSelection,
    retain_entropy: bool,
    generations: u64,
    failures: BTreeMap<&'static str, u64>,
}

impl KeyGenerator {
    /// Builds the kernel program on `device`.
    pub fn new(mut device: Device, source: &str, config: &FileConfig) -> Result<Self, KeygenError> {
        config.validate()?;
        let program = device.load_program(source, &REQUIRED_KERNELS)?;

        Ok(Self {
            device,
            program,
            width: config.mixer.width as usize,
            sample_len: config.mixer.sample_len(),
            selection: config.seed.selection,
            retain_entropy: false,
            generations: 0,
            failures: BTreeMap::new(),
        })
    }

    /// Acquires a device from the default platforms and builds the program.
    pub fn from_config(config: &FileConfig) -> Result<Self, KeygenError> {
        let source = config.kernel_source()?;
        let device = acquire_device(&default_platforms(), config.device.allow_cpu_fallback)?;
        Self::new(device, &source, config)
    }

    /// Keep the candidate seed in each [`GeneratedKey`] for display.
    pub fn retain_entropy(mut self, retain: bool) -> Self {
        self.retain_entropy = retain;
        self
    }

    /// The device in use.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Completed generations.
    pub fn generations(&self) -> u64 {
        self.generations
    }

    /// Failed generations by error category.
    pub fn failures(&self) -> &BTreeMap<&'static str, u64> {
        &self.failures
    }

    /// Draws fresh inputs from `sources` and generates a key.
    pub fn generate<R, C>(&mut self, sources: &mut EntropySources<R, C>) -> Result<GeneratedKey, KeygenError>
    where
        R: RngCore + CryptoRng,
        C: TimeSource,
    {
        let mut workspace = Workspace::new(sources.draw(self.width, self.sample_len));
        self.generate_in(&mut workspace)
    }

    /// Generates a key from explicit inputs.
    pub fn generate_from(&mut self, inputs: MixerInputs) -> Result<GeneratedKey, KeygenError> {
        let mut workspace = Workspace::new(inputs);
        self.generate_in(&mut workspace)
    }

    /// Generates a key, wiping `workspace` before returning on every path.
    pub fn generate_in(&mut self, workspace: &mut Workspace) -> Result<GeneratedKey, KeygenError> {
        let result = {
            let mut guard = WipeOnDrop::new(workspace);
            self.run(&mut guard)
        };

        match &result {
            Ok(_) => {
                self.generations += 1;
                tracing::info!(
                    device = %self.device.info().name,
                    lanes = self.width,
                    selection = ?self.selection,
                    "Private key generated"
                );
            }
            Err(e) => {
                *self.failures.entry(e.category()).or_insert(0) += 1;
                tracing::debug!(category = e.category(), "Generation failed");
            }
        }
        result
    }

    fn run(&mut self, workspace: &mut Workspace) -> Result<GeneratedKey, KeygenError> {
        let width = workspace.inputs.width();
        if width < SEED_WORDS {
            return Err(KeygenError::PreconditionViolation(format!(
                "{} lanes cannot fill a {}-byte seed",
                width, KEY_LEN
            )));
        }

        EntropyMixer::new(&mut self.device, &self.program)
            .gather(&workspace.inputs, &mut workspace.mixed)?;

        let seed = CandidateSeed::from_mixed(&workspace.mixed, self.selection)?;
        tracing::debug!(selection = ?self.selection, "Candidate seed selected");

        let mut engine = DigestEngine::new(&mut self.device, &self.program);
        let private_key = whiten(&mut engine, &seed)?;

        Ok(GeneratedKey {
            entropy: self.retain_entropy.then(|| seed.clone()),
            private_key,
        })
    }

    /// Generates a key and hands it to `derivation`.
    pub fn generate_wallet<R, C>(
        &mut self,
        sources: &mut EntropySources<R, C>,
        derivation: &dyn KeyDerivation,
    ) -> Result<(GeneratedKey, WalletKeys), KeygenError>
    where
        R: RngCore + CryptoRng,
        C: TimeSource,
    {
        let key = self.generate(sources)?;
        let wallet = derivation.derive(&key.private_key).and_then(|wallet| {
            if wallet.public_key.is_empty() {
                Err(DerivationError::EmptyPublicKey)
            } else {
                Ok(wallet)
            }
        });

        match wallet {
            Ok(wallet) => Ok((key, wallet)),
            Err(e) => {
                let err = KeygenError::from(e);
                *self.failures.entry(err.category()).or_insert(0) += 1;
                Err(err)
            }
        }
    }

    /// Releases the device. Later generations fail.
    pub fn release(&mut self) {
        self.device.release();
    }
}

impl std::fmt::Debug for KeyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGenerator")
            .field("device", &self.device)
            .field("width", &self.width)
            .field("sample_len", &self.sample_len)
            .field("selection", &self.selection)
            .field("generations", &self.generations)
            .finish_non_exhaustive()
    }
}
