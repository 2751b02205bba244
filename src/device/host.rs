//! Host device: kernels executed on a `rayon` thread pool.
//!
//! The host device builds WGSL programs exactly like a GPU device (parse,
//! validate, reflect) and then runs the native lane functions from
//! [`crate::kernels`] for each entry point, one rayon task per work-item.
//! Those functions mirror the embedded program only, so any other source is
//! refused at build time.
//! Buffer memory is kept as little-endian `u32` words, the layout the WGSL
//! kernels see on a GPU.

use super::{
    program, AccessMode, Buffer, BufferInit, ComputeBackend, DeviceError, DeviceInfo, DeviceKind,
    KernelArg, KernelSignature, Platform, Program,
};
use crate::kernels::{
    lanes::{self, BLOCK_WORDS, SCHEDULE_WORDS},
    GATHER_ENTROPY, KERNEL_SOURCE, SHA256_COMPRESS, SHA256_SCHEDULE,
};
use rayon::prelude::*;
use std::collections::HashMap;
use zeroize::Zeroize;

/// Platform offering the host device.
#[derive(Debug, Clone)]
pub struct HostPlatform {
    threads: usize,
}

impl HostPlatform {
    pub fn new() -> Self {
        Self {
            threads: rayon::current_num_threads(),
        }
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for HostPlatform {
    fn name(&self) -> &str {
        "host"
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        vec![DeviceInfo {
            name: format!("host ({} threads)", self.threads),
            kind: DeviceKind::Cpu,
            platform: self.name().to_string(),
            index: 0,
        }]
    }

    fn open(&self, device: &DeviceInfo) -> Result<Box<dyn ComputeBackend>, DeviceError> {
        Ok(Box::new(HostBackend::new(device.clone())))
    }
}

/// Compute device backed by host threads.
pub struct HostBackend {
    info: DeviceInfo,
    buffers: HashMap<u64, Vec<u32>>,
    next_buffer: u64,
    next_program: u64,
}

impl HostBackend {
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            info,
            buffers: HashMap::new(),
            next_buffer: 0,
            next_program: 0,
        }
    }

    /// Number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    fn words(&self, arg: &KernelArg<'_>) -> Result<&[u32], DeviceError> {
        match arg {
            KernelArg::Buffer(buffer) => self
                .buffers
                .get(&buffer.id())
                .map(Vec::as_slice)
                .ok_or_else(|| unknown_buffer(buffer.id())),
            KernelArg::Scalar(_) => Err(DeviceError::Execution(
                "scalar passed where a buffer was expected".to_string(),
            )),
        }
    }

    /// Removes the output buffer from the arena while a kernel writes it.
    fn take(&mut self, arg: &KernelArg<'_>) -> Result<(u64, Vec<u32>), DeviceError> {
        match arg {
            KernelArg::Buffer(buffer) => self
                .buffers
                .remove(&buffer.id())
                .map(|words| (buffer.id(), words))
                .ok_or_else(|| unknown_buffer(buffer.id())),
            KernelArg::Scalar(_) => Err(DeviceError::Execution(
                "scalar passed where a buffer was expected".to_string(),
            )),
        }
    }

    fn run_with_output(
        &mut self,
        output: &KernelArg<'_>,
        kernel: impl FnOnce(&Self, &mut [u32]) -> Result<(), DeviceError>,
    ) -> Result<(), DeviceError> {
        let (id, mut words) = self.take(output)?;
        let result = kernel(self, &mut words);
        self.buffers.insert(id, words);
        result
    }

    fn gather_entropy(&mut self, work_size: u32, args: &[KernelArg<'_>]) -> Result<(), DeviceError> {
        self.run_with_output(&args[0], |host, mixed| {
            let seed = host.words(&args[1])?;
            let nonce = host.words(&args[2])?;
            let samples = host.words(&args[3])?;
            let sample_len = scalar(&args[4])?;

            if sample_len as usize > samples.len() * 4 {
                return Err(DeviceError::Execution(format!(
                    "sample_len {} exceeds the {}-byte sample buffer",
                    sample_len,
                    samples.len() * 4
                )));
            }

            let lane_count = (work_size as usize).min(mixed.len() / 2);
            if seed.len() < lane_count * 2 || nonce.len() < lane_count * 2 {
                return Err(DeviceError::Execution(format!(
                    "{} lanes need {} seed and nonce words",
                    lane_count,
                    lane_count * 2
                )));
            }

            mixed[..lane_count * 2]
                .par_chunks_mut(2)
                .enumerate()
                .for_each(|(lane, out)| {
                    let word = lanes::gather_lane(
                        lane as u32,
                        [seed[lane * 2], seed[lane * 2 + 1]],
                        [nonce[lane * 2], nonce[lane * 2 + 1]],
                        samples,
                        sample_len,
                    );
                    out.copy_from_slice(&word);
                });
            Ok(())
        })
    }

    fn sha256_schedule(&mut self, work_size: u32, args: &[KernelArg<'_>]) -> Result<(), DeviceError> {
        self.run_with_output(&args[2], |host, schedule| {
            let message = host.words(&args[0])?;
            let block_count = scalar(&args[1])? as usize;

            if message.len() < block_count * BLOCK_WORDS
                || schedule.len() < block_count * SCHEDULE_WORDS
            {
                return Err(DeviceError::Execution(format!(
                    "buffers too small for {} message blocks",
                    block_count
                )));
            }

            let blocks = (work_size as usize).min(block_count);
            schedule
                .par_chunks_mut(SCHEDULE_WORDS)
                .take(blocks)
                .enumerate()
                .for_each(|(block, out)| lanes::schedule_block(message, block, out));
            Ok(())
        })
    }

    fn sha256_compress(&mut self, args: &[KernelArg<'_>]) -> Result<(), DeviceError> {
        self.run_with_output(&args[2], |host, digest| {
            let block_count = scalar(&args[0])? as usize;
            let schedule = host.words(&args[1])?;

            if schedule.len() < block_count * SCHEDULE_WORDS || digest.len() < 8 {
                return Err(DeviceError::Execution(format!(
                    "buffers too small to compress {} blocks",
                    block_count
                )));
            }

            digest[..8].copy_from_slice(&lanes::compress(schedule, block_count));
            Ok(())
        })
    }
}

impl ComputeBackend for HostBackend {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn load_program(&mut self, source: &str, kernels: &[&str]) -> Result<Program, DeviceError> {
        let signatures = program::reflect(source, kernels)?;
        if source != KERNEL_SOURCE {
            return Err(DeviceError::Compile(
                "host device executes only the embedded kernel program".to_string(),
            ));
        }
        self.next_program += 1;
        Ok(Program::new(self.next_program, signatures))
    }

    fn allocate(&mut self, init: BufferInit<'_>, access: AccessMode) -> Result<Buffer, DeviceError> {
        let words = match init {
            BufferInit::Data(data) => data
                .chunks(4)
                .map(|chunk| {
                    let mut bytes = [0u8; 4];
                    bytes[..chunk.len()].copy_from_slice(chunk);
                    u32::from_le_bytes(bytes)
                })
                .collect(),
            BufferInit::Zeroed(len) => vec![0u32; len.div_ceil(4)],
        };

        self.next_buffer += 1;
        self.buffers.insert(self.next_buffer, words);
        Ok(Buffer::new(self.next_buffer, init.len(), access))
    }

    fn launch(
        &mut self,
        _program: &Program,
        kernel: &KernelSignature,
        work_size: u32,
        args: &[KernelArg<'_>],
    ) -> Result<(), DeviceError> {
        match kernel.name() {
            GATHER_ENTROPY => self.gather_entropy(work_size, args),
            SHA256_SCHEDULE => self.sha256_schedule(work_size, args),
            SHA256_COMPRESS => self.sha256_compress(args),
            other => Err(DeviceError::Execution(format!(
                "host device has no native implementation of kernel `{}`",
                other
            ))),
        }
    }

    fn read_back(&mut self, buffer: &Buffer, host: &mut [u8]) -> Result<(), DeviceError> {
        let words = self
            .buffers
            .get(&buffer.id())
            .ok_or_else(|| unknown_buffer(buffer.id()))?;

        for (chunk, word) in host.chunks_mut(4).zip(words) {
            let bytes = word.to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
        Ok(())
    }

    fn free(&mut self, buffer: Buffer) {
        if let Some(mut words) = self.buffers.remove(&buffer.id()) {
            words.zeroize();
        }
    }

    fn release(&mut self) {
        for (_, mut words) in self.buffers.drain() {
            words.zeroize();
        }
    }
}

fn scalar(arg: &KernelArg<'_>) -> Result<u32, DeviceError> {
    match arg {
        KernelArg::Scalar(value) => Ok(*value),
        KernelArg::Buffer(_) => Err(DeviceError::Execution(
            "buffer passed where a scalar was expected".to_string(),
        )),
    }
}

fn unknown_buffer(id: u64) -> DeviceError {
    DeviceError::Execution(format!("buffer {} does not belong to this device", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use crate::kernels::REQUIRED_KERNELS;

    fn backend() -> HostBackend {
        HostBackend::new(HostPlatform::new().devices().remove(0))
    }

    #[test]
    fn test_platform_offers_one_cpu_device() {
        let devices = HostPlatform::new().devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].kind, DeviceKind::Cpu);
    }

    #[test]
    fn test_allocate_and_read_back_round_trips_bytes() {
        let mut host = backend();
        let data = [1u8, 2, 3, 4, 5, 6, 7];
        let buffer = host
            .allocate(BufferInit::Data(&data), AccessMode::ReadOnly)
            .unwrap();

        let mut out = [0u8; 7];
        host.read_back(&buffer, &mut out).unwrap();
        assert_eq!(out, data);
        host.free(buffer);
        assert_eq!(host.live_buffers(), 0);
    }

    #[test]
    fn test_release_drops_every_buffer() {
        let mut host = backend();
        host.allocate(BufferInit::Zeroed(32), AccessMode::WriteOnly)
            .unwrap();
        host.allocate(BufferInit::Data(&[9; 12]), AccessMode::ReadOnly)
            .unwrap();
        assert_eq!(host.live_buffers(), 2);

        host.release();
        assert_eq!(host.live_buffers(), 0);
    }

    #[test]
    fn test_load_program_refuses_other_sources() {
        let mut host = backend();
        let edited = format!("{}\n// local edit\n", KERNEL_SOURCE);

        match host.load_program(&edited, &REQUIRED_KERNELS) {
            Err(DeviceError::Compile(msg)) => assert!(msg.contains("embedded")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(host.load_program(KERNEL_SOURCE, &REQUIRED_KERNELS).is_ok());
    }

    #[test]
    fn test_gather_rejects_oversized_sample_len() {
        let mut device = Device::new(Box::new(backend()));
        let program = device.load_program(KERNEL_SOURCE, &REQUIRED_KERNELS).unwrap();

        let result = device.with_buffers(|device, set| {
            let mixed = set.allocate(device, BufferInit::Zeroed(8), AccessMode::WriteOnly)?;
            let seed = set.allocate(device, BufferInit::Data(&[0; 8]), AccessMode::ReadOnly)?;
            let nonce = set.allocate(device, BufferInit::Data(&[0; 8]), AccessMode::ReadOnly)?;
            let samples = set.allocate(device, BufferInit::Data(&[0; 4]), AccessMode::ReadOnly)?;
            device.launch(
                &program,
                GATHER_ENTROPY,
                1,
                &[
                    set.arg(mixed),
                    set.arg(seed),
                    set.arg(nonce),
                    set.arg(samples),
                    KernelArg::Scalar(5),
                ],
            )
        });

        assert!(matches!(result, Err(DeviceError::Execution(_))));
    }
}
