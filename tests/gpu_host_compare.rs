//! wgpu device vs host device comparison.
//!
//! Skips when no GPU adapter is present.

#![cfg(feature = "gpu")]

use gpu_keygen::device::{acquire_device, HostBackend, HostPlatform, Platform, WgpuPlatform};
use gpu_keygen::kernels::KERNEL_SOURCE;
use gpu_keygen::mixer::FixedClock;
use gpu_keygen::{Device, DigestEngine, EntropySources, FileConfig, KeyGenerator, MixerInputs};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

fn gpu_device() -> Option<Device> {
    let platforms: Vec<Box<dyn Platform>> = vec![Box::new(WgpuPlatform::new())];
    match acquire_device(&platforms, false) {
        Ok(device) => Some(device),
        Err(_) => {
            println!("No GPU adapter - skipping");
            None
        }
    }
}

fn host_device() -> Device {
    let info = HostPlatform::new().devices().remove(0);
    Device::new(Box::new(HostBackend::new(info)))
}

#[test]
fn test_gpu_vs_host_keys() {
    let Some(gpu) = gpu_device() else { return };
    let config = FileConfig::default();

    let mut on_gpu = KeyGenerator::new(gpu, KERNEL_SOURCE, &config).unwrap();
    let mut on_host = KeyGenerator::new(host_device(), KERNEL_SOURCE, &config).unwrap();

    for seed in 0..4u8 {
        let mut a = EntropySources::new(ChaCha20Rng::from_seed([seed; 32]), FixedClock(77));
        let mut b = EntropySources::new(ChaCha20Rng::from_seed([seed; 32]), FixedClock(77));

        let gpu_key = on_gpu.generate(&mut a).unwrap();
        let host_key = on_host.generate(&mut b).unwrap();
        assert_eq!(gpu_key.private_key, host_key.private_key, "seed {}", seed);
    }

    on_gpu.release();
    on_host.release();
}

#[test]
fn test_gpu_golden_scenario() {
    let Some(gpu) = gpu_device() else { return };

    let mut generator = KeyGenerator::new(gpu, KERNEL_SOURCE, &FileConfig::default()).unwrap();
    let inputs = MixerInputs::new((1..=256).collect(), vec![0u8; 65536], vec![0u64; 256]);
    let key = generator.generate_from(inputs).unwrap();

    assert_eq!(
        key.private_key.to_hex(),
        "6dd45852b4d4b0f5d38e7231cb571ac286b394845ef1a07a8942f73e8a633928"
    );
}

#[test]
fn test_gpu_digest_lengths() {
    let Some(mut gpu) = gpu_device() else { return };
    let program = gpu
        .load_program(KERNEL_SOURCE, &gpu_keygen::kernels::REQUIRED_KERNELS)
        .unwrap();
    let mut host = host_device();
    let host_program = host
        .load_program(KERNEL_SOURCE, &gpu_keygen::kernels::REQUIRED_KERNELS)
        .unwrap();

    for len in [0usize, 1, 55, 56, 64, 200, 1000] {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let on_gpu = DigestEngine::new(&mut gpu, &program).digest(&data).unwrap();
        let on_host = DigestEngine::new(&mut host, &host_program)
            .digest(&data)
            .unwrap();
        assert_eq!(on_gpu, on_host, "length {}", len);
    }
}
