mod common;

use std::sync::Arc;
use std::thread;

use nautilus_facekey::bch::{BchCodec, M, T};
use nautilus_facekey::{BchParams, FaceKeyError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.random_range(0..2u8)).collect()
}

fn corrupt(data: &[u8], ecc: &[u8], flips: &[usize]) -> (Vec<u8>, Vec<u8>) {
    let mut word: Vec<u8> = data.iter().chain(ecc).copied().collect();
    for &p in flips {
        word[p] ^= 1;
    }
    let ecc = word.split_off(data.len());
    (word, ecc)
}

#[test]
fn production_code_dimensions() {
    let params = common::params();
    assert_eq!(params.n(), (1 << M) - 1);
    assert_eq!(params.t(), T);
    assert_eq!(params.k() + params.ecc_bits(), params.n());
    assert!(params.ecc_bits() <= M as usize * T);
    // The payload must pack into at least a 32-byte secret.
    assert!(params.k() >= 256);
}

#[test]
fn encode_is_deterministic() {
    let mut codec = BchCodec::new(common::params());
    let data = random_payload(codec.params().k(), 1);
    assert_eq!(codec.encode(&data).unwrap(), codec.encode(&data).unwrap());
}

#[test]
fn decodes_clean_codeword() {
    let mut codec = BchCodec::new(common::params());
    let data = random_payload(codec.params().k(), 2);
    let ecc = codec.encode(&data).unwrap();
    assert!(codec.decode(&data, &ecc).unwrap().is_empty());
}

#[test]
fn corrects_exactly_t_errors() {
    let mut codec = BchCodec::new(common::params());
    let (n, k) = (codec.params().n(), codec.params().k());
    let data = random_payload(k, 3);
    let ecc = codec.encode(&data).unwrap();

    let mut flips = common::positions(n, T, 30);
    let (mut received, received_ecc) = corrupt(&data, &ecc, &flips);

    let locations = codec.decode(&received, &received_ecc).unwrap();
    flips.sort_unstable();
    assert_eq!(locations, flips);

    codec.correct(&mut received, &locations);
    assert_eq!(received, data);
}

#[test]
fn corrects_errors_confined_to_payload() {
    let mut codec = BchCodec::new(common::params());
    let k = codec.params().k();
    let data = random_payload(k, 4);
    let ecc = codec.encode(&data).unwrap();

    let flips = common::positions(k, 200, 40);
    let (mut received, received_ecc) = corrupt(&data, &ecc, &flips);

    let locations = codec.decode(&received, &received_ecc).unwrap();
    assert_eq!(locations.len(), 200);
    codec.correct(&mut received, &locations);
    assert_eq!(received, data);
}

#[test]
fn one_error_past_t_fails() {
    let mut codec = BchCodec::new(common::params());
    let (n, k) = (codec.params().n(), codec.params().k());
    let data = random_payload(k, 5);
    let ecc = codec.encode(&data).unwrap();

    let flips = common::positions(n, T + 1, 50);
    let (received, received_ecc) = corrupt(&data, &ecc, &flips);
    assert_eq!(codec.decode(&received, &received_ecc), Err(FaceKeyError::CodecFailure));
}

#[test]
fn far_beyond_t_fails() {
    let mut codec = BchCodec::new(common::params());
    let (n, k) = (codec.params().n(), codec.params().k());
    let data = random_payload(k, 6);
    let ecc = codec.encode(&data).unwrap();

    let flips = common::positions(n, 2 * T, 60);
    let (received, received_ecc) = corrupt(&data, &ecc, &flips);
    assert_eq!(codec.decode(&received, &received_ecc), Err(FaceKeyError::CodecFailure));
}

#[test]
fn codecs_sharing_tables_work_in_parallel() {
    let params = common::params();
    let handles: Vec<_> = (0..4u64)
        .map(|seed| {
            let params = Arc::clone(&params);
            thread::spawn(move || {
                let mut codec = BchCodec::new(params);
                let (n, k) = (codec.params().n(), codec.params().k());
                let data = random_payload(k, 100 + seed);
                let ecc = codec.encode(&data).unwrap();
                let flips = common::positions(n, 100, 200 + seed);
                let (mut received, received_ecc) = corrupt(&data, &ecc, &flips);
                let locations = codec.decode(&received, &received_ecc).unwrap();
                codec.correct(&mut received, &locations);
                received == data
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn other_parameter_sets_round_trip() {
    let params = Arc::new(BchParams::new(10, 20).unwrap());
    let mut codec = BchCodec::new(Arc::clone(&params));
    let data = random_payload(params.k(), 7);
    let ecc = codec.encode(&data).unwrap();

    let flips = common::positions(params.n(), 20, 70);
    let (mut received, received_ecc) = corrupt(&data, &ecc, &flips);
    let locations = codec.decode(&received, &received_ecc).unwrap();
    codec.correct(&mut received, &locations);
    assert_eq!(received, data);
}
