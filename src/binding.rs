/**
 * Key Binding
 * Turns a recovered secret into a server-storable (k2, token) pair
 *
 * Registration: k1 = R32 ^ salt, K random, k2 = K ^ k1, token = SHA256(K || R32)
 * Verification: K' = k2 ^ R32' ^ salt, match iff SHA256(K' || R32') == token
 */

use std::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::bits::xor_bytes;
use crate::entropy::random_array;
use crate::error::{FaceKeyError, Result};
use crate::sketch::SECRET_BYTES;

pub const SALT_BYTES: usize = 32;

/// Per-user salt shared by every enrolled frame of that user.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_BYTES]);

impl Salt {
    pub fn generate() -> Result<Self> {
        Ok(Self(random_array()?))
    }

    pub fn from_bytes(bytes: [u8; SALT_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        Ok(Self(decode_hex32(text, "salt")?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_BYTES] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

/// What the server keeps per frame besides the helper.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub k2: [u8; 32],
    pub token: [u8; 32],
}

impl fmt::Debug for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBinding")
            .field("token", &hex::encode(self.token))
            .finish_non_exhaustive()
    }
}

/// Binds a freshly drawn key K to the secret.
pub fn bind(secret32: &[u8; SECRET_BYTES], salt: &Salt) -> Result<KeyBinding> {
    let key = Zeroizing::new(random_array::<32>()?);
    Ok(bind_with_key(secret32, salt, &key))
}

/// Deterministic form of [`bind`] for a caller-chosen K.
pub fn bind_with_key(secret32: &[u8; SECRET_BYTES], salt: &Salt, key: &[u8; 32]) -> KeyBinding {
    let k1 = Zeroizing::new(xor_bytes(secret32, salt.as_bytes()));
    KeyBinding {
        k2: xor_bytes(key, &*k1),
        token: token_digest(key, secret32),
    }
}

/// Rebuilds the token a recovered secret implies for a stored `k2`.
pub fn token_candidate(secret32: &[u8; SECRET_BYTES], salt: &Salt, k2: &[u8; 32]) -> [u8; 32] {
    let k1 = Zeroizing::new(xor_bytes(secret32, salt.as_bytes()));
    let key = Zeroizing::new(xor_bytes(k2, &*k1));
    token_digest(&key, secret32)
}

pub fn token_matches(candidate: &[u8; 32], token: &[u8; 32]) -> bool {
    candidate[..].ct_eq(&token[..]).into()
}

/// Compares against hex text, ignoring case. Malformed text never matches.
pub fn token_matches_hex(candidate: &[u8; 32], token_hex: &str) -> bool {
    decode_hex32(token_hex, "token")
        .map(|token| token_matches(candidate, &token))
        .unwrap_or(false)
}

fn token_digest(key: &[u8; 32], secret32: &[u8; SECRET_BYTES]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.update(secret32);
    hasher.finalize().into()
}

/// Decodes exactly 64 hex characters, either case.
pub fn decode_hex32(text: &str, field: &str) -> Result<[u8; 32]> {
    if text.len() != 64 {
        return Err(FaceKeyError::MalformedRecord(format!(
            "{} must be 64 hex characters, got {}",
            field,
            text.len()
        )));
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(text, &mut out)
        .map_err(|e| FaceKeyError::MalformedRecord(format!("{} is not hex: {}", field, e)))?;
    Ok(out)
}
