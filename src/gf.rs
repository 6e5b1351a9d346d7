/**
 * Galois field GF(2^m)
 * Log/antilog tables for the BCH codec; built once, read-only afterwards
 */

use crate::error::{FaceKeyError, Result};

/// Primitive polynomials for m = 5..=15, bit i is the coefficient of x^i.
const PRIMITIVE_POLYNOMIALS: [u32; 11] = [
    0x25, 0x43, 0x83, 0x11d, 0x211, 0x409, 0x805, 0x1053, 0x201b, 0x402b, 0x8003,
];

pub const MIN_DEGREE: u32 = 5;
pub const MAX_DEGREE: u32 = 15;

/// Arithmetic over GF(2^m). Elements are `u16` in polynomial basis.
///
/// Addition is XOR. Multiplication and division go through the
/// exponent/logarithm tables relative to the primitive element alpha.
#[derive(Debug)]
pub struct GaloisField {
    m: u32,
    /// Multiplicative group order, 2^m - 1.
    order: usize,
    /// `exp[i] = alpha^i`, doubled so sums of two logs need no reduction.
    exp: Vec<u16>,
    /// `log[alpha^i] = i`; `log[0]` is unused.
    log: Vec<u16>,
}

impl GaloisField {
    pub fn new(m: u32) -> Result<Self> {
        if !(MIN_DEGREE..=MAX_DEGREE).contains(&m) {
            return Err(FaceKeyError::InvalidCodeParameters(format!(
                "field degree {} outside {}..={}",
                m, MIN_DEGREE, MAX_DEGREE
            )));
        }
        let poly = PRIMITIVE_POLYNOMIALS[(m - MIN_DEGREE) as usize];
        let order = (1usize << m) - 1;

        let mut exp = vec![0u16; 2 * order];
        let mut log = vec![0u16; order + 1];
        let mut x: u32 = 1;
        for i in 0..order {
            if i > 0 && x == 1 {
                return Err(FaceKeyError::InvalidCodeParameters(format!(
                    "polynomial {:#x} is not primitive",
                    poly
                )));
            }
            exp[i] = x as u16;
            exp[i + order] = x as u16;
            log[x as usize] = i as u16;
            x <<= 1;
            if x & (1 << m) != 0 {
                x ^= poly;
            }
        }

        Ok(Self { m, order, exp, log })
    }

    pub fn degree(&self) -> u32 {
        self.m
    }

    /// Number of non-zero elements, which is also the BCH codeword length.
    pub fn order(&self) -> usize {
        self.order
    }

    /// alpha^e for any exponent.
    #[inline]
    pub fn alpha_pow(&self, e: usize) -> u16 {
        self.exp[e % self.order]
    }

    /// Discrete log of a non-zero element.
    #[inline]
    pub fn log(&self, a: u16) -> usize {
        debug_assert!(a != 0);
        self.log[a as usize] as usize
    }

    #[inline]
    pub fn mul(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log(a) + self.log(b)]
    }

    /// a / b for non-zero `b`.
    #[inline]
    pub fn div(&self, a: u16, b: u16) -> u16 {
        debug_assert!(b != 0);
        if a == 0 {
            return 0;
        }
        self.exp[self.log(a) + self.order - self.log(b)]
    }

    #[inline]
    pub fn square(&self, a: u16) -> u16 {
        self.mul(a, a)
    }
}
