use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gpu_keygen::device::{HostBackend, HostPlatform, Platform};
use gpu_keygen::kernels::{KERNEL_SOURCE, REQUIRED_KERNELS};
use gpu_keygen::mixer::FixedClock;
use gpu_keygen::{
    Device, DigestEngine, EntropyMixer, EntropySources, FileConfig, KeyGenerator, MixerInputs,
};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

fn host_device() -> Device {
    let info = HostPlatform::new().devices().remove(0);
    Device::new(Box::new(HostBackend::new(info)))
}

fn bench_gather_entropy(c: &mut Criterion) {
    let mut device = host_device();
    let program = device.load_program(KERNEL_SOURCE, &REQUIRED_KERNELS).unwrap();
    let inputs = MixerInputs::new((1..=256).collect(), vec![7u8; 65536], vec![3u64; 256]);
    let mut mixed = Vec::with_capacity(256);

    c.bench_function("EntropyMixer::gather (256 lanes, 64 KiB samples)", |b| {
        b.iter(|| {
            EntropyMixer::new(&mut device, &program)
                .gather(black_box(&inputs), &mut mixed)
                .unwrap()
        })
    });
}

fn bench_double_digest(c: &mut Criterion) {
    let mut device = host_device();
    let program = device.load_program(KERNEL_SOURCE, &REQUIRED_KERNELS).unwrap();
    let seed = [0x5Au8; 32];

    c.bench_function("DigestEngine::double_digest (32 bytes)", |b| {
        b.iter(|| {
            DigestEngine::new(&mut device, &program)
                .double_digest(black_box(&seed))
                .unwrap()
        })
    });
}

fn bench_generate(c: &mut Criterion) {
    let mut generator = KeyGenerator::new(host_device(), KERNEL_SOURCE, &FileConfig::default()).unwrap();
    let mut sources = EntropySources::new(ChaCha20Rng::from_seed([1; 32]), FixedClock(0));

    c.bench_function("KeyGenerator::generate (default config)", |b| {
        b.iter(|| generator.generate(&mut sources).unwrap())
    });
}

criterion_group!(benches, bench_gather_entropy, bench_double_digest, bench_generate);
criterion_main!(benches);
