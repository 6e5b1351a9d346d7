/**
 * Secure Sketch
 * Binds a random secret R to a quantized biometric through BCH helper data
 *
 * register: helper = (R ++ ecc(R)) XOR biometric
 * verify:   R' = correct(helper XOR biometric')
 *
 * R leaves this module only as packed bytes handed to the key-binding layer.
 */

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, error};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::bch::{BchCodec, BchParams};
use crate::bits::{align_bits, bytes_to_bits, pack_bits, parse_bit_string, to_bit_string, xor_bits};
use crate::entropy::fill_random;
use crate::error::{FaceKeyError, Result};
use crate::quantizer::quantize;

/// Usable secret length handed to key binding.
pub const SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SketchState {
    Uninitialized,
    Ready,
}

/// Output of one registration. Secret fields are wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct FrameRecord {
    /// `n` characters of "0"/"1".
    #[zeroize(skip)]
    pub helper: String,
    /// R packed MSB-first, last byte zero-padded.
    pub secret: Vec<u8>,
    /// First 32 bytes of `secret`.
    pub secret32: [u8; SECRET_BYTES],
}

impl fmt::Debug for FrameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRecord")
            .field("helper_len", &self.helper.len())
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Output of one successful verification. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct FrameVerification {
    pub secret32: [u8; SECRET_BYTES],
    /// Bit errors the codec corrected, parity region included.
    pub corrected_errors: usize,
}

impl fmt::Debug for FrameVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameVerification")
            .field("secret32", &"<redacted>")
            .field("corrected_errors", &self.corrected_errors)
            .finish()
    }
}

/// The fuzzy-extractor core. Owns one codec; every encode/decode goes
/// through its mutex, so concurrent callers queue.
pub struct SecureSketch {
    codec: OnceLock<Mutex<BchCodec>>,
}

impl Default for SecureSketch {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureSketch {
    /// An uninitialized sketch. Tables are built on first use.
    pub fn new() -> Self {
        Self {
            codec: OnceLock::new(),
        }
    }

    /// A ready sketch over existing tables.
    pub fn with_params(params: Arc<BchParams>) -> Self {
        let codec = OnceLock::new();
        let _ = codec.set(Mutex::new(BchCodec::new(params)));
        Self { codec }
    }

    pub fn state(&self) -> SketchState {
        if self.codec.get().is_some() {
            SketchState::Ready
        } else {
            SketchState::Uninitialized
        }
    }

    /// Builds the production tables once. Later calls are no-ops.
    pub fn initialize(&self) -> Result<()> {
        if self.codec.get().is_none() {
            let params = Arc::new(BchParams::standard()?);
            debug!("Secure sketch ready: n={} k={}", params.n(), params.k());
            // A concurrent initializer may have won; its tables are identical.
            let _ = self.codec.set(Mutex::new(BchCodec::new(params)));
        }
        Ok(())
    }

    /// The codec, without lazy initialization.
    pub fn codec_handle(&self) -> Result<&Mutex<BchCodec>> {
        self.codec.get().ok_or(FaceKeyError::NotInitialized)
    }

    pub fn params(&self) -> Result<Arc<BchParams>> {
        self.initialize()?;
        Ok(Arc::clone(self.lock()?.params()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, BchCodec>> {
        self.initialize()?;
        // Scratch buffers are fully rewritten by every call, so a panic in
        // another holder leaves nothing to recover.
        Ok(self
            .codec_handle()?
            .lock()
            .unwrap_or_else(PoisonError::into_inner))
    }

    /// Draws a fresh R for this frame and binds it to the biometric.
    pub fn register(&self, distances: &[f64]) -> Result<FrameRecord> {
        let biometric = quantize(distances)?;

        let mut codec = self.lock()?;
        let params = Arc::clone(codec.params());
        let (n, k) = (params.n(), params.k());

        let mut random = Zeroizing::new(vec![0u8; k.div_ceil(8)]);
        fill_random(&mut random)?;
        let mut codeword = Zeroizing::new(bytes_to_bits(&random));
        codeword.truncate(k);
        let ecc = codec.encode(&codeword)?;
        drop(codec);

        let secret = pack_bits(&codeword);
        let secret32 = leading_secret(&secret)?;

        codeword.extend_from_slice(&ecc);
        let helper = xor_bits(&codeword, &align_bits(&biometric, n));

        Ok(FrameRecord {
            helper: to_bit_string(&helper),
            secret,
            secret32,
        })
    }

    /// Recovers R from a fresh biometric and stored helper text.
    pub fn verify(&self, distances: &[f64], helper: &str) -> Result<FrameVerification> {
        let n = self.params()?.n();
        if helper.len() != n {
            return Err(FaceKeyError::MalformedRecord(format!(
                "helper has {} characters, expected {}",
                helper.len(),
                n
            )));
        }
        let helper_bits = parse_bit_string(helper).ok_or_else(|| {
            FaceKeyError::MalformedRecord("helper is not a bit string".to_string())
        })?;
        self.verify_bits(distances, &helper_bits)
    }

    /// Same as [`SecureSketch::verify`] over already parsed helper bits.
    pub fn verify_bits(&self, distances: &[f64], helper: &[u8]) -> Result<FrameVerification> {
        let params = self.params()?;
        let (n, k) = (params.n(), params.k());
        if helper.len() != n {
            return Err(FaceKeyError::MalformedRecord(format!(
                "helper has {} bits, expected {}",
                helper.len(),
                n
            )));
        }

        let biometric = align_bits(&quantize(distances)?, n);
        let received = Zeroizing::new(xor_bits(helper, &biometric));
        let (data, ecc) = received.split_at(k);
        let mut data = Zeroizing::new(data.to_vec());

        let mut codec = self.lock()?;
        let locations = codec.decode(&data, ecc)?;
        if !locations.is_empty() {
            codec.correct(&mut data, &locations);
        }
        drop(codec);

        let secret = Zeroizing::new(pack_bits(&data));
        Ok(FrameVerification {
            secret32: leading_secret(&secret)?,
            corrected_errors: locations.len(),
        })
    }
}

fn leading_secret(secret: &[u8]) -> Result<[u8; SECRET_BYTES]> {
    match secret.get(..SECRET_BYTES) {
        Some(head) => {
            let mut out = [0u8; SECRET_BYTES];
            out.copy_from_slice(head);
            Ok(out)
        }
        None => {
            error!(
                "Payload packs to {} bytes, below the {}-byte secret",
                secret.len(),
                SECRET_BYTES
            );
            Err(FaceKeyError::InsufficientSecretBytes {
                available: secret.len(),
            })
        }
    }
}
