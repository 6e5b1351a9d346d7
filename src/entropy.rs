/**
 * Entropy
 * System CSPRNG draws for secrets, salts and binding keys
 */

use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{FaceKeyError, Result};

pub fn fill_random(dest: &mut [u8]) -> Result<()> {
    SystemRandom::new()
        .fill(dest)
        .map_err(|_| FaceKeyError::RandomnessUnavailable)
}

pub fn random_array<const N: usize>() -> Result<[u8; N]> {
    let mut out = [0u8; N];
    fill_random(&mut out)?;
    Ok(out)
}
