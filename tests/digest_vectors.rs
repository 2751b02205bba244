//! Device SHA-256 against FIPS 180-4 vectors and the `sha2` crate.

use gpu_keygen::device::{HostBackend, HostPlatform, Platform};
use gpu_keygen::kernels::{KERNEL_SOURCE, REQUIRED_KERNELS};
use gpu_keygen::{Device, DigestEngine, HashPrimitive};
use proptest::prelude::*;
use sha2::{Digest, Sha256};

fn host_device() -> (Device, gpu_keygen::device::Program) {
    let info = HostPlatform::new().devices().remove(0);
    let mut device = Device::new(Box::new(HostBackend::new(info)));
    let program = device.load_program(KERNEL_SOURCE, &REQUIRED_KERNELS).unwrap();
    (device, program)
}

fn digest_hex(data: &[u8]) -> String {
    let (mut device, program) = host_device();
    let digest = DigestEngine::new(&mut device, &program).digest(data).unwrap();
    hex::encode(digest)
}

#[test]
fn test_empty_input() {
    assert_eq!(
        digest_hex(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn test_two_block_vector() {
    assert_eq!(
        digest_hex(b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq"),
        "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1"
    );
}

#[test]
fn test_four_block_vector() {
    assert_eq!(
        digest_hex(
            b"abcdefghbcdefghicdefghijdefghijkefghijklfghijklmghijklmnhijklmnoijklmnopjklmnopqklmnopqrlmnopqrsmnopqrstnopqrstu"
        ),
        "cf5b16a778af8380036ce59e7b0492370b249b11e8f07a51afac45037afee9d1"
    );
}

#[test]
fn test_million_a() {
    assert_eq!(
        digest_hex(&vec![b'a'; 1_000_000]),
        "cdc76e5c9914fb9281a1c7e284d73e67f1809a48a497200e046d39ccc7112cd0"
    );
}

#[test]
fn test_padding_boundaries_match_reference() {
    let (mut device, program) = host_device();
    let mut engine = DigestEngine::new(&mut device, &program);

    for len in [55, 56, 63, 64, 65, 119, 120, 128] {
        let data: Vec<u8> = (0..len).map(|i| (i * 13) as u8).collect();
        let expected: [u8; 32] = Sha256::digest(&data).into();
        assert_eq!(engine.digest(&data).unwrap(), expected, "length {}", len);
    }
}

#[test]
fn test_double_hash_trait_matches_inherent() {
    let (mut device, program) = host_device();
    let mut engine = DigestEngine::new(&mut device, &program);

    let via_trait = engine.double_hash(b"hello").unwrap();
    let inherent = engine.double_digest(b"hello").unwrap();
    assert_eq!(via_trait, inherent.to_vec());
    assert_eq!(engine.output_len(), 32);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_digest_matches_sha2(data in proptest::collection::vec(any::<u8>(), 0..300)) {
        let (mut device, program) = host_device();
        let digest = DigestEngine::new(&mut device, &program).digest(&data).unwrap();
        let expected: [u8; 32] = Sha256::digest(&data).into();
        prop_assert_eq!(digest, expected);
    }

    #[test]
    fn prop_double_digest_is_digest_of_digest(data in proptest::collection::vec(any::<u8>(), 0..200)) {
        let (mut device, program) = host_device();
        let mut engine = DigestEngine::new(&mut device, &program);

        let once = engine.digest(&data).unwrap();
        let twice = engine.digest(&once).unwrap();
        prop_assert_eq!(engine.double_digest(&data).unwrap(), twice);

        let expected: [u8; 32] = Sha256::digest(Sha256::digest(&data)).into();
        prop_assert_eq!(twice, expected);
    }
}
