//! SHA-256 evaluated by the `sha256_schedule` and `sha256_compress` kernels.

use super::padding::{block_count, pad_message};
use super::HashPrimitive;
use crate::device::{AccessMode, BufferInit, Device, DeviceError, KernelArg, Program};
use crate::kernels::lanes::SCHEDULE_WORDS;
use crate::kernels::{SHA256_COMPRESS, SHA256_SCHEDULE};
use zeroize::Zeroizing;

/// Output length of SHA-256 in bytes.
pub const DIGEST_LEN: usize = 32;

/// Device-resident SHA-256.
///
/// Message schedules for all blocks are expanded in parallel, one
/// work-item per block. The compression chain is inherently sequential
/// and runs as a single work-item.
pub struct DigestEngine<'a> {
    device: &'a mut Device,
    program: &'a Program,
}

impl<'a> DigestEngine<'a> {
    pub fn new(device: &'a mut Device, program: &'a Program) -> Self {
        Self { device, program }
    }

    /// SHA-256 of `data`.
    pub fn digest(&mut self, data: &[u8]) -> Result<[u8; DIGEST_LEN], DeviceError> {
        let blocks = block_count(data.len());
        let block_scalar = u32::try_from(blocks)
            .map_err(|_| DeviceError::Execution(format!("{}-byte message is too long", data.len())))?;

        let words = pad_message(data);
        let message_bytes = Zeroizing::new(
            words
                .iter()
                .flat_map(|w| w.to_le_bytes())
                .collect::<Vec<u8>>(),
        );
        let mut state_bytes = Zeroizing::new([0u8; DIGEST_LEN]);

        let program = self.program;
        self.device.with_buffers(|device, set| {
            let message =
                set.allocate(device, BufferInit::Data(&message_bytes), AccessMode::ReadOnly)?;
            let schedule = set.allocate(
                device,
                BufferInit::Zeroed(blocks * SCHEDULE_WORDS * 4),
                AccessMode::ReadWrite,
            )?;
            let digest = set.allocate(device, BufferInit::Zeroed(DIGEST_LEN), AccessMode::WriteOnly)?;

            device.launch(
                program,
                SHA256_SCHEDULE,
                block_scalar,
                &[set.arg(message), KernelArg::Scalar(block_scalar), set.arg(schedule)],
            )?;
            device.launch(
                program,
                SHA256_COMPRESS,
                1,
                &[KernelArg::Scalar(block_scalar), set.arg(schedule), set.arg(digest)],
            )?;
            device.read_back(set.get(digest), state_bytes.as_mut_slice())
        })?;

        // State words come back in device order; the digest is big-endian.
        let mut out = [0u8; DIGEST_LEN];
        for (dst, src) in out.chunks_exact_mut(4).zip(state_bytes.chunks_exact(4)) {
            let word = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
            dst.copy_from_slice(&word.to_be_bytes());
        }

        tracing::trace!(bytes = data.len(), blocks, "Digest computed");
        Ok(out)
    }

    /// SHA-256 applied twice. The intermediate digest is wiped.
    pub fn double_digest(&mut self, data: &[u8]) -> Result<[u8; DIGEST_LEN], DeviceError> {
        let first = Zeroizing::new(self.digest(data)?);
        self.digest(first.as_slice())
    }
}

impl HashPrimitive for DigestEngine<'_> {
    fn output_len(&self) -> usize {
        DIGEST_LEN
    }

    fn hash(&mut self, data: &[u8]) -> Result<Vec<u8>, DeviceError> {
        let digest = Zeroizing::new(self.digest(data)?);
        Ok(digest.to_vec())
    }
}
