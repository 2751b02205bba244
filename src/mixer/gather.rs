//! Host side of the `gather_entropy` kernel.

use super::MixerInputs;
use crate::device::{AccessMode, BufferInit, Device, DeviceError, KernelArg, Program};
use crate::kernels::GATHER_ENTROPY;
use zeroize::Zeroizing;

/// Launches the entropy mixer over one lane per entropy word.
pub struct EntropyMixer<'a> {
    device: &'a mut Device,
    program: &'a Program,
}

impl<'a> EntropyMixer<'a> {
    pub fn new(device: &'a mut Device, program: &'a Program) -> Self {
        Self { device, program }
    }

    /// Mixes `inputs` into `out`, one word per lane.
    ///
    /// `out` is resized to the lane count. On error its contents are
    /// unspecified and must not be used.
    pub fn gather(&mut self, inputs: &MixerInputs, out: &mut Vec<u64>) -> Result<(), DeviceError> {
        let width = inputs.width();
        if width == 0 || inputs.time_nonce().len() != width {
            return Err(DeviceError::Execution(format!(
                "mixer needs matching non-empty lanes, got {} seed words and {} nonces",
                width,
                inputs.time_nonce().len()
            )));
        }
        let lanes = u32::try_from(width)
            .map_err(|_| DeviceError::Execution(format!("{} lanes exceed the launch limit", width)))?;
        let sample_len = u32::try_from(inputs.samples().len()).map_err(|_| {
            DeviceError::Execution(format!(
                "{}-byte sample buffer exceeds the kernel limit",
                inputs.samples().len()
            ))
        })?;

        let seed_bytes = words_to_le_bytes(inputs.entropy_block());
        let nonce_bytes = words_to_le_bytes(inputs.time_nonce());
        let mut mixed_bytes = Zeroizing::new(vec![0u8; width * 8]);

        let program = self.program;
        self.device.with_buffers(|device, set| {
            let mixed = set.allocate(device, BufferInit::Zeroed(width * 8), AccessMode::WriteOnly)?;
            let seed = set.allocate(device, BufferInit::Data(&seed_bytes), AccessMode::ReadOnly)?;
            let nonce = set.allocate(device, BufferInit::Data(&nonce_bytes), AccessMode::ReadOnly)?;
            let samples =
                set.allocate(device, BufferInit::Data(inputs.samples()), AccessMode::ReadOnly)?;

            device.launch(
                program,
                GATHER_ENTROPY,
                lanes,
                &[
                    set.arg(mixed),
                    set.arg(seed),
                    set.arg(nonce),
                    set.arg(samples),
                    KernelArg::Scalar(sample_len),
                ],
            )?;
            device.read_back(set.get(mixed), &mut mixed_bytes)
        })?;

        out.clear();
        out.extend(mixed_bytes.chunks_exact(8).map(|chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            u64::from_le_bytes(word)
        }));

        tracing::debug!(lanes = width, sample_bytes = sample_len, "Entropy gathered");
        Ok(())
    }
}

fn words_to_le_bytes(words: &[u64]) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(words.iter().flat_map(|w| w.to_le_bytes()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{HostBackend, HostPlatform, Platform};
    use crate::kernels::{KERNEL_SOURCE, REQUIRED_KERNELS};

    fn device_and_program() -> (Device, Program) {
        let info = HostPlatform::new().devices().remove(0);
        let mut device = Device::new(Box::new(HostBackend::new(info)));
        let program = device.load_program(KERNEL_SOURCE, &REQUIRED_KERNELS).unwrap();
        (device, program)
    }

    fn inputs(width: usize) -> MixerInputs {
        MixerInputs::new(
            (1..=width as u64).collect(),
            (0..512).map(|i| (i * 7) as u8).collect(),
            (0..width as u64).map(|i| i * 31).collect(),
        )
    }

    #[test]
    fn test_gather_is_deterministic() {
        let (mut device, program) = device_and_program();
        let mut first = Vec::new();
        let mut second = Vec::new();

        EntropyMixer::new(&mut device, &program)
            .gather(&inputs(32), &mut first)
            .unwrap();
        EntropyMixer::new(&mut device, &program)
            .gather(&inputs(32), &mut second)
            .unwrap();

        assert_eq!(first.len(), 32);
        assert_eq!(first, second);
    }

    #[test]
    fn test_gather_matches_lane_function() {
        let (mut device, program) = device_and_program();
        let inputs = inputs(8);
        let mut mixed = Vec::new();
        EntropyMixer::new(&mut device, &program)
            .gather(&inputs, &mut mixed)
            .unwrap();

        let sample_words: Vec<u32> = inputs
            .samples()
            .chunks(4)
            .map(|c| {
                let mut b = [0u8; 4];
                b[..c.len()].copy_from_slice(c);
                u32::from_le_bytes(b)
            })
            .collect();
        let split = |w: u64| [w as u32, (w >> 32) as u32];

        let lane = 5;
        let [lo, hi] = crate::kernels::lanes::gather_lane(
            lane as u32,
            split(inputs.entropy_block()[lane]),
            split(inputs.time_nonce()[lane]),
            &sample_words,
            inputs.samples().len() as u32,
        );
        assert_eq!(mixed[lane], (lo as u64) | ((hi as u64) << 32));
    }

    #[test]
    fn test_mismatched_nonce_width_rejected() {
        let (mut device, program) = device_and_program();
        let bad = MixerInputs::new(vec![1, 2, 3, 4], vec![0; 8], vec![0; 3]);
        let mut mixed = Vec::new();

        let result = EntropyMixer::new(&mut device, &program).gather(&bad, &mut mixed);
        assert!(matches!(result, Err(DeviceError::Execution(_))));
        assert_eq!(device.stats().kernel_launches, 0);
    }
}
