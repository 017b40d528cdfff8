//! 8-bit CRC over arbitrary byte sequences.

use crate::core::constants::{CRC_INITIAL, CRC_POLYNOMIAL};

/// Compute a CRC8 with an explicit polynomial and initial value.
///
/// Bitwise, MSB-first, no reflection, no final XOR. Empty input returns
/// `init` unchanged.
pub fn crc8_with(data: &[u8], poly: u8, init: u8) -> u8 {
    let mut crc = init;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ poly
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Compute the protocol's CRC8 (poly `0x07`, init `0x00`).
pub fn crc8(data: &[u8]) -> u8 {
    crc8_with(data, CRC_POLYNOMIAL, CRC_INITIAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_returns_init() {
        assert_eq!(crc8(&[]), CRC_INITIAL);
        assert_eq!(crc8_with(&[], 0x07, 0xab), 0xab);
    }

    #[test]
    fn test_known_check_value() {
        // Standard CRC-8 check value for poly 0x07 / init 0x00.
        assert_eq!(crc8(b"123456789"), 0xf4);
    }

    #[test]
    fn test_single_byte() {
        // 0x01 shifted through 8 rounds of poly 0x07.
        assert_eq!(crc8(&[0x01]), 0x07);
        assert_eq!(crc8(&[0x00]), 0x00);
    }

    #[test]
    fn test_deterministic() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(crc8(&data), crc8(&data));
    }
}
