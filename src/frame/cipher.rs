//! Per-frame payload obfuscation.
//!
//! Not cryptography: one mask byte, derived by a fixed public transform of a
//! seed transmitted in clear, XORed into every payload byte. The seed is
//! still drawn fresh per frame so identical payloads do not produce
//! identical ciphertext.

use crate::core::constants::MASK_OFFSET;

/// Derive the obfuscation mask from a seed byte.
pub fn mask(seed: u8) -> u8 {
    seed.wrapping_add(MASK_OFFSET)
}

/// XOR every byte of `data` with the same mask value.
///
/// Self-inverse: applying the same mask twice yields the original data.
pub fn apply(mask: u8, data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| b ^ mask).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_offset() {
        assert_eq!(mask(0x00), 0x32);
        assert_eq!(mask(0x10), 0x42);
    }

    #[test]
    fn test_mask_wraps() {
        assert_eq!(mask(0xff), 0x31);
        assert_eq!(mask(0xce), 0x00);
    }

    #[test]
    fn test_involution_all_seeds() {
        let payload = b"yOTmK50z";
        for seed in 0..=255u8 {
            let m = mask(seed);
            let once = apply(m, payload);
            assert_eq!(apply(m, &once), payload);
        }
    }

    #[test]
    fn test_same_mask_every_byte() {
        // Byte-wise repeated mask, not a rolling keystream.
        let out = apply(0x32, &[0x00, 0x00, 0x00]);
        assert_eq!(out, vec![0x32, 0x32, 0x32]);
    }

    #[test]
    fn test_empty_payload() {
        assert!(apply(0x32, &[]).is_empty());
    }
}
