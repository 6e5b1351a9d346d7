mod common;

use nautilus_facekey::binding::{bind, token_candidate, token_matches, token_matches_hex};
use nautilus_facekey::Salt;

#[test]
fn recovered_secret_reproduces_token() {
    let sketch = common::sketch();
    let face = common::face(11);
    let salt = Salt::generate().unwrap();

    let record = sketch.register(&face).unwrap();
    let binding = bind(&record.secret32, &salt).unwrap();

    let recovered = sketch
        .verify(&common::jitter(&face, 0.02, 111), &record.helper)
        .unwrap();
    let candidate = token_candidate(&recovered.secret32, &salt, &binding.k2);

    assert!(token_matches(&candidate, &binding.token));
    assert!(token_matches_hex(&candidate, &hex::encode_upper(binding.token)));
}

#[test]
fn tampered_k2_never_matches() {
    let salt = Salt::generate().unwrap();
    let secret = [0x5Au8; 32];
    let binding = bind(&secret, &salt).unwrap();

    for byte in 0..32 {
        let mut k2 = binding.k2;
        k2[byte] ^= 0x01;
        let candidate = token_candidate(&secret, &salt, &k2);
        assert!(!token_matches(&candidate, &binding.token));
    }
}

#[test]
fn wrong_salt_never_matches() {
    let salt = Salt::generate().unwrap();
    let secret = [0xC3u8; 32];
    let binding = bind(&secret, &salt).unwrap();

    let mut other = *salt.as_bytes();
    other[17] ^= 0xFF;
    let candidate = token_candidate(&secret, &Salt::from_bytes(other), &binding.k2);
    assert!(!token_matches(&candidate, &binding.token));
}

#[test]
fn one_bit_of_secret_changes_the_token() {
    let salt = Salt::generate().unwrap();
    let secret = [0x00u8; 32];
    let binding = bind(&secret, &salt).unwrap();

    let mut wrong = secret;
    wrong[31] ^= 0x01;
    let candidate = token_candidate(&wrong, &salt, &binding.k2);
    assert!(!token_matches(&candidate, &binding.token));
}

#[test]
fn stored_values_reveal_neither_key_nor_secret() {
    // Two bindings of the same secret and salt draw independent keys, so
    // k2 and token differ between them.
    let salt = Salt::generate().unwrap();
    let secret = [0x11u8; 32];
    let a = bind(&secret, &salt).unwrap();
    let b = bind(&secret, &salt).unwrap();

    assert_ne!(a.k2, b.k2);
    assert_ne!(a.token, b.token);
    assert_ne!(a.k2, secret);
}
