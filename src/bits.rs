/**
 * Bit strings
 * One bit per byte, MSB-first packing, and the "0"/"1" text form used on the wire
 */

/// Expands bytes into bits, most significant bit first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    bits
}

/// Packs bits into bytes MSB-first. Only the low bit of each entry is
/// used; a partial last byte is zero-padded.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        bytes[i / 8] |= (bit & 1) << (7 - (i % 8));
    }
    bytes
}

/// Zero-pads or truncates `bits` to exactly `len` entries.
pub fn align_bits(bits: &[u8], len: usize) -> Vec<u8> {
    let mut aligned = bits[..bits.len().min(len)].to_vec();
    aligned.resize(len, 0);
    aligned
}

/// Bitwise XOR of two equal-length bit vectors.
pub fn xor_bits(a: &[u8], b: &[u8]) -> Vec<u8> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x ^ y) & 1).collect()
}

pub fn xor_bytes<const N: usize>(a: &[u8; N], b: &[u8; N]) -> [u8; N] {
    let mut out = [0u8; N];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b)) {
        *o = x ^ y;
    }
    out
}

pub fn to_bit_string(bits: &[u8]) -> String {
    bits.iter()
        .map(|&b| if b & 1 == 1 { '1' } else { '0' })
        .collect()
}

/// Parses a "0"/"1" string. Returns `None` on any other character.
pub fn parse_bit_string(text: &str) -> Option<Vec<u8>> {
    text.bytes()
        .map(|c| match c {
            b'0' => Some(0),
            b'1' => Some(1),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_first_expansion() {
        assert_eq!(bytes_to_bits(&[0x80, 0x01]), vec![1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn pack_zero_pads_last_byte() {
        assert_eq!(pack_bits(&[1, 0, 1]), vec![0b1010_0000]);
        assert_eq!(pack_bits(&[1, 1, 1, 1, 1, 1, 1, 1, 1]), vec![0xFF, 0x80]);
    }

    #[test]
    fn pack_masks_to_low_bit() {
        assert_eq!(pack_bits(&[3, 2, 0xFF, 0, 0, 0, 0, 0]), vec![0b1010_0000]);
    }

    #[test]
    fn align_pads_and_truncates() {
        assert_eq!(align_bits(&[1, 1], 4), vec![1, 1, 0, 0]);
        assert_eq!(align_bits(&[1, 0, 1, 1], 2), vec![1, 0]);
    }

    #[test]
    fn bit_string_rejects_other_characters() {
        assert_eq!(parse_bit_string("0110"), Some(vec![0, 1, 1, 0]));
        assert_eq!(parse_bit_string("01x0"), None);
        assert_eq!(to_bit_string(&[1, 0, 0, 1]), "1001");
    }
}
