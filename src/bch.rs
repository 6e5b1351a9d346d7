/**
 * BCH codec
 * Systematic binary BCH code over GF(2^m): encode, decode, correct
 *
 * The secure sketch uses m = 13 and t = 455: codewords of n = 8191 bits that
 * survive up to 455 flipped bits. Code tables (field, generator polynomial)
 * live in `BchParams` and are shared read-only behind an `Arc`. Scratch
 * buffers live in `BchCodec`, so each codec instance has exactly one owner
 * and callers serialize access to it.
 */

use std::sync::Arc;

use tracing::debug;

use crate::error::{FaceKeyError, Result};
use crate::gf::GaloisField;

/// Field degree of the production code.
pub const M: u32 = 13;

/// Correctable bit errors of the production code.
pub const T: usize = 455;

const WORD_BITS: usize = 64;

/// Immutable tables of a BCH code.
#[derive(Debug)]
pub struct BchParams {
    field: GaloisField,
    t: usize,
    n: usize,
    ecc_bits: usize,
    /// Generator polynomial, MSB-first packed: bit `j` is the coefficient
    /// of `x^(ecc_bits - j)`.
    generator: Vec<u64>,
}

impl BchParams {
    /// Tables for the production code (m = 13, t = 455).
    pub fn standard() -> Result<Self> {
        Self::new(M, T)
    }

    /// Builds GF(2^m) and the narrow-sense generator polynomial
    /// `g = lcm(M_1, M_3, ..., M_{2t-1})`, with `M_i` the minimal
    /// polynomial of alpha^i.
    pub fn new(m: u32, t: usize) -> Result<Self> {
        let field = GaloisField::new(m)?;
        let n = field.order();
        if t == 0 || 2 * t >= n {
            return Err(FaceKeyError::InvalidCodeParameters(format!(
                "t = {} does not fit a code of length {}",
                t, n
            )));
        }

        let (generator_lsb, ecc_bits) = generator_polynomial(&field, t);
        if ecc_bits >= n {
            return Err(FaceKeyError::InvalidCodeParameters(format!(
                "generator degree {} leaves no payload in length {}",
                ecc_bits, n
            )));
        }

        let mut generator = vec![0u64; (ecc_bits + 1).div_ceil(WORD_BITS)];
        for j in 0..=ecc_bits {
            if lsb_bit(&generator_lsb, ecc_bits - j) {
                set_bit(&mut generator, j);
            }
        }

        debug!(
            "BCH tables ready: m={} n={} t={} ecc_bits={} k={}",
            field.degree(),
            n,
            t,
            ecc_bits,
            n - ecc_bits
        );

        Ok(Self {
            field,
            t,
            n,
            ecc_bits,
            generator,
        })
    }

    /// Codeword length, 2^m - 1.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Payload length.
    pub fn k(&self) -> usize {
        self.n - self.ecc_bits
    }

    pub fn t(&self) -> usize {
        self.t
    }

    /// Parity length, the degree of the generator polynomial.
    pub fn ecc_bits(&self) -> usize {
        self.ecc_bits
    }
}

/// Returns the generator LSB-first packed (bit `d` is the coefficient of
/// `x^d`) together with its degree.
fn generator_polynomial(field: &GaloisField, t: usize) -> (Vec<u64>, usize) {
    let n = field.order();
    let mut in_coset = vec![false; n];
    let mut generator = vec![0u64; n / WORD_BITS + 1];
    generator[0] = 1;
    let mut degree = 0;

    for i in (1..2 * t).step_by(2) {
        if in_coset[i] {
            continue;
        }

        let mut coset = Vec::new();
        let mut r = i;
        loop {
            in_coset[r] = true;
            coset.push(r);
            r = (2 * r) % n;
            if r == i {
                break;
            }
        }

        let minimal = minimal_polynomial(field, &coset);
        let mut product = vec![0u64; generator.len()];
        for (shift, &c) in minimal.iter().enumerate() {
            if c != 0 {
                xor_shifted_lsb(&mut product, &generator, shift);
            }
        }
        generator = product;
        degree += coset.len();
    }

    (generator, degree)
}

/// `prod (x + alpha^r)` over a cyclotomic coset. The coefficients are
/// always 0 or 1; ascending degree order.
fn minimal_polynomial(field: &GaloisField, coset: &[usize]) -> Vec<u16> {
    let mut poly = vec![1u16];
    for &r in coset {
        let root = field.alpha_pow(r);
        let mut next = vec![0u16; poly.len() + 1];
        for (j, &c) in poly.iter().enumerate() {
            next[j + 1] ^= c;
            next[j] ^= field.mul(c, root);
        }
        poly = next;
    }
    debug_assert!(poly.iter().all(|&c| c <= 1));
    poly
}

fn xor_shifted_lsb(dst: &mut [u64], src: &[u64], shift: usize) {
    debug_assert!(shift < WORD_BITS);
    for (w, &word) in src.iter().enumerate() {
        if word == 0 {
            continue;
        }
        dst[w] ^= word << shift;
        if shift != 0 && w + 1 < dst.len() {
            dst[w + 1] ^= word >> (WORD_BITS - shift);
        }
    }
}

#[inline]
fn lsb_bit(words: &[u64], d: usize) -> bool {
    (words[d / WORD_BITS] >> (d % WORD_BITS)) & 1 == 1
}

#[inline]
fn get_bit(words: &[u64], i: usize) -> bool {
    (words[i / WORD_BITS] >> (WORD_BITS - 1 - i % WORD_BITS)) & 1 == 1
}

#[inline]
fn set_bit(words: &mut [u64], i: usize) {
    words[i / WORD_BITS] |= 1 << (WORD_BITS - 1 - i % WORD_BITS);
}

/// An owned codec instance: shared tables plus private scratch space.
///
/// All three operations take `&mut self`. A codec must not be used from two
/// threads at once; wrap it in a `Mutex` or give each worker its own
/// instance built from the same `Arc<BchParams>`.
///
/// Bit buffers hold one bit per `u8` entry. Only the low bit of each entry
/// is read. The codeword is `data ++ ecc`; codeword index `i` is the
/// coefficient of `x^(n-1-i)`.
pub struct BchCodec {
    params: Arc<BchParams>,
    /// Codeword register for encoding, MSB-first packed.
    register: Vec<u64>,
    syndromes: Vec<u16>,
    locator: Vec<u16>,
    previous: Vec<u16>,
    saved: Vec<u16>,
}

impl BchCodec {
    pub fn new(params: Arc<BchParams>) -> Self {
        let two_t = 2 * params.t;
        Self {
            register: vec![0u64; params.n.div_ceil(WORD_BITS)],
            syndromes: vec![0u16; two_t],
            locator: vec![0u16; two_t + 1],
            previous: vec![0u16; two_t + 1],
            saved: vec![0u16; two_t + 1],
            params,
        }
    }

    pub fn params(&self) -> &Arc<BchParams> {
        &self.params
    }

    /// Computes the `ecc_bits` parity bits of a `k`-bit payload.
    pub fn encode(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let (n, k) = (self.params.n, self.params.k());
        if data.len() != k {
            return Err(FaceKeyError::InvalidCodeParameters(format!(
                "encode expects {} data bits, got {}",
                k,
                data.len()
            )));
        }

        self.register.fill(0);
        for (i, &bit) in data.iter().enumerate() {
            if bit & 1 == 1 {
                set_bit(&mut self.register, i);
            }
        }

        // Long division of data(x) * x^ecc_bits by g(x). The remainder ends
        // up in positions k..n.
        for i in 0..k {
            if get_bit(&self.register, i) {
                xor_generator_at(&mut self.register, &self.params.generator, i);
            }
        }

        Ok((k..n)
            .map(|i| get_bit(&self.register, i) as u8)
            .collect())
    }

    /// Locates bit errors in a received `data ++ ecc` word.
    ///
    /// Returns the 0-based codeword indices of the errors in ascending
    /// order; an empty list means the word is already a codeword. Returns
    /// `CodecFailure` when more than `t` errors are detected or the error
    /// locator does not split over the field.
    pub fn decode(&mut self, data: &[u8], ecc: &[u8]) -> Result<Vec<usize>> {
        let params = Arc::clone(&self.params);
        let (n, t) = (params.n, params.t);
        let field = &params.field;
        if data.len() != params.k() || ecc.len() != params.ecc_bits {
            return Err(FaceKeyError::CodecFailure);
        }

        if !self.compute_syndromes(data, ecc) {
            return Ok(Vec::new());
        }

        let degree = self.berlekamp_massey();
        if degree > t || self.locator[degree] == 0 {
            return Err(FaceKeyError::CodecFailure);
        }

        // Chien search: a root at alpha^(-d) marks an error at degree d,
        // i.e. codeword index n-1-d. Terms are tracked as logs.
        let mut terms: Vec<(usize, usize)> = (1..=degree)
            .filter(|&i| self.locator[i] != 0)
            .map(|i| (i, field.log(self.locator[i])))
            .collect();
        let constant = self.locator[0];

        let mut locations = Vec::with_capacity(degree);
        for d in 0..n {
            let mut sum = constant;
            for (i, log) in terms.iter_mut() {
                sum ^= field.alpha_pow(*log);
                *log += n - *i;
                if *log >= n {
                    *log -= n;
                }
            }
            if sum == 0 {
                locations.push(n - 1 - d);
                if locations.len() == degree {
                    break;
                }
            }
        }

        if locations.len() != degree {
            return Err(FaceKeyError::CodecFailure);
        }
        locations.sort_unstable();
        Ok(locations)
    }

    /// Flips the data bits named by `locations`. Locations inside the
    /// parity region are ignored.
    pub fn correct(&self, data: &mut [u8], locations: &[usize]) {
        for &loc in locations {
            if let Some(bit) = data.get_mut(loc) {
                *bit = (*bit & 1) ^ 1;
            }
        }
    }

    /// Fills `S_1..S_2t`. Returns `false` when every syndrome is zero.
    fn compute_syndromes(&mut self, data: &[u8], ecc: &[u8]) -> bool {
        let params = &self.params;
        let (n, t) = (params.n, params.t);
        let field = &params.field;

        let degrees: Vec<usize> = data
            .iter()
            .chain(ecc)
            .enumerate()
            .filter(|&(_, bit)| bit & 1 == 1)
            .map(|(i, _)| n - 1 - i)
            .collect();

        for j in (1..2 * t).step_by(2) {
            let mut s = 0u16;
            for &d in &degrees {
                s ^= field.alpha_pow(j * d);
            }
            self.syndromes[j - 1] = s;
        }
        // S_2j = S_j^2 for binary codes.
        for j in 1..=t {
            self.syndromes[2 * j - 1] = field.square(self.syndromes[j - 1]);
        }

        self.syndromes.iter().any(|&s| s != 0)
    }

    /// Berlekamp-Massey over the syndromes. Leaves the error locator in
    /// `self.locator` and returns its length `L`.
    fn berlekamp_massey(&mut self) -> usize {
        let params = Arc::clone(&self.params);
        let field = &params.field;
        let two_t = 2 * params.t;

        self.locator.fill(0);
        self.previous.fill(0);
        self.locator[0] = 1;
        self.previous[0] = 1;

        let mut length = 0usize;
        let mut shift = 1usize;
        let mut previous_discrepancy = 1u16;

        for r in 0..two_t {
            let mut discrepancy = self.syndromes[r];
            for i in 1..=length {
                discrepancy ^= field.mul(self.locator[i], self.syndromes[r - i]);
            }

            if discrepancy == 0 {
                shift += 1;
                continue;
            }

            let factor = field.div(discrepancy, previous_discrepancy);
            let grows = 2 * length <= r;
            if grows {
                self.saved.copy_from_slice(&self.locator);
            }
            for i in 0..=(two_t - shift) {
                if self.previous[i] != 0 {
                    self.locator[i + shift] ^= field.mul(factor, self.previous[i]);
                }
            }

            if grows {
                length = r + 1 - length;
                std::mem::swap(&mut self.previous, &mut self.saved);
                previous_discrepancy = discrepancy;
                shift = 1;
            } else {
                shift += 1;
            }
        }

        length
    }
}

fn xor_generator_at(register: &mut [u64], generator: &[u64], offset: usize) {
    for (w, &word) in generator.iter().enumerate() {
        if word == 0 {
            continue;
        }
        let start = offset + w * WORD_BITS;
        let index = start / WORD_BITS;
        let shift = start % WORD_BITS;
        if index >= register.len() {
            break;
        }
        register[index] ^= word >> shift;
        if shift != 0 && index + 1 < register.len() {
            register[index + 1] ^= word << (WORD_BITS - shift);
        }
    }
}
