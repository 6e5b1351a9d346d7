/**
 * Quantizer
 * Maps a 316-element face-geometry distance vector to a 2528-bit string
 */

use crate::bits::bytes_to_bits;
use crate::error::{FaceKeyError, Result};

/// Distances produced per frame by the geometry pipeline.
pub const FEATURE_COUNT: usize = 316;

/// Length of a quantized biometric: one byte per distance.
pub const TOTAL_DATA_BITS: usize = FEATURE_COUNT * 8;

/// Code assigned to every distance when the vector has no spread.
pub const MID_CODE: u8 = 128;

/// Min-max normalizes each distance into a code in `[0, 255]`.
///
/// Rounding is half away from zero (`f64::round`), which is exact and
/// platform independent for the same inputs.
pub fn quantize_codes(distances: &[f64]) -> Result<Vec<u8>> {
    if distances.len() != FEATURE_COUNT {
        return Err(FaceKeyError::InvalidDistancesCount {
            expected: FEATURE_COUNT,
            actual: distances.len(),
        });
    }
    if let Some(index) = distances.iter().position(|v| !v.is_finite()) {
        return Err(FaceKeyError::InvalidValue { index });
    }

    let (min, max) = distances
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    // Overflowed ranges are as useless as empty ones.
    if range == 0.0 || !range.is_finite() {
        return Ok(vec![MID_CODE; FEATURE_COUNT]);
    }

    Ok(distances
        .iter()
        .map(|&v| (255.0 * (v - min) / range).round().clamp(0.0, 255.0) as u8)
        .collect())
}

/// Quantizes distances into `TOTAL_DATA_BITS` bits, each code MSB-first.
pub fn quantize(distances: &[f64]) -> Result<Vec<u8>> {
    Ok(bytes_to_bits(&quantize_codes(distances)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Vec<f64> {
        (0..FEATURE_COUNT).map(|i| i as f64 * 0.5).collect()
    }

    #[test]
    fn output_has_fixed_length() {
        assert_eq!(quantize(&ramp()).unwrap().len(), TOTAL_DATA_BITS);
    }

    #[test]
    fn extremes_map_to_code_bounds() {
        let codes = quantize_codes(&ramp()).unwrap();
        assert_eq!(codes[0], 0);
        assert_eq!(codes[FEATURE_COUNT - 1], 255);
    }

    #[test]
    fn constant_vector_maps_to_mid_code() {
        let codes = quantize_codes(&[4.2; FEATURE_COUNT]).unwrap();
        assert!(codes.iter().all(|&c| c == MID_CODE));

        let bits = quantize(&[0.0; FEATURE_COUNT]).unwrap();
        assert_eq!(&bits[..8], &[1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn half_rounds_away_from_zero() {
        // 255 * 1/510 = 0.5 rounds up to 1.
        let mut distances = vec![0.0; FEATURE_COUNT];
        distances[1] = 1.0;
        distances[2] = 510.0;
        let codes = quantize_codes(&distances).unwrap();
        assert_eq!(codes[1], 1);
        assert_eq!(codes[2], 255);
    }

    #[test]
    fn preserves_index_order() {
        let mut distances = vec![0.0; FEATURE_COUNT];
        distances[7] = 1.0;
        let codes = quantize_codes(&distances).unwrap();
        assert_eq!(codes[7], 255);
        assert!(codes.iter().enumerate().all(|(i, &c)| i == 7 || c == 0));
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            quantize(&[1.0; 315]),
            Err(FaceKeyError::InvalidDistancesCount { expected: 316, actual: 315 })
        );
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut distances = ramp();
        distances[42] = f64::NAN;
        assert_eq!(quantize(&distances), Err(FaceKeyError::InvalidValue { index: 42 }));

        distances[42] = f64::INFINITY;
        assert_eq!(quantize(&distances), Err(FaceKeyError::InvalidValue { index: 42 }));
    }

    #[test]
    fn identical_input_is_bit_exact() {
        let distances: Vec<f64> = (0..FEATURE_COUNT).map(|i| ((i * 37) % 101) as f64 / 7.0).collect();
        assert_eq!(quantize(&distances).unwrap(), quantize(&distances).unwrap());
    }
}
