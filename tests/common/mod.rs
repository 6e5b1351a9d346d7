#![allow(dead_code)]

use std::sync::{Arc, Once, OnceLock};

use nautilus_facekey::quantizer::FEATURE_COUNT;
use nautilus_facekey::{BchParams, FaceFrame, SecureSketch};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const IOD: f32 = 0.42;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Production tables, built once per test binary.
pub fn params() -> Arc<BchParams> {
    static PARAMS: OnceLock<Arc<BchParams>> = OnceLock::new();
    Arc::clone(PARAMS.get_or_init(|| Arc::new(BchParams::standard().unwrap())))
}

/// A ready sketch with its own codec over the shared tables.
pub fn sketch() -> Arc<SecureSketch> {
    init_tracing();
    Arc::new(SecureSketch::with_params(params()))
}

/// A synthetic face: 316 distances in [20, 200).
pub fn face(seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..FEATURE_COUNT).map(|_| rng.random_range(20.0..200.0)).collect()
}

/// Capture noise of at most `amount` per distance.
pub fn jitter(distances: &[f64], amount: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    distances
        .iter()
        .map(|d| d + rng.random_range(-amount..amount))
        .collect()
}

/// `count` slightly different captures of the same face.
pub fn captures(face_seed: u64, count: usize, iod: f32) -> Vec<FaceFrame> {
    let base = face(face_seed);
    (0..count)
        .map(|i| FaceFrame::new(jitter(&base, 0.02, face_seed * 1000 + i as u64), iod))
        .collect()
}

/// `count` distinct positions in `0..len`.
pub fn positions(len: usize, count: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, len, count).into_vec()
}

pub fn flip_chars(helper: &str, positions: &[usize]) -> String {
    let mut bytes = helper.as_bytes().to_vec();
    for &p in positions {
        bytes[p] = if bytes[p] == b'0' { b'1' } else { b'0' };
    }
    String::from_utf8(bytes).unwrap()
}
