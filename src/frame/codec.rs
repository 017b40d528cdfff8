//! Frame construction and validation.
//!
//! Implements both framing variants seen in captures: with and without the
//! fixed two-byte start marker. Everything after the optional marker is
//! identical between the two.

use crate::core::constants::{
    FIXED_BODY_SIZE, KEY_FIELD_SIZE, MAX_FRAME_LENGTH, MIN_FRAME_SIZE, START_MARKER,
};
use crate::core::error::{FrameError, FrameResult};

use super::{checksum, cipher};

/// Which framing the peripheral speaks: with or without the start marker.
///
/// A hypothesis under test, like the endpoint roles and command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramingVariant {
    /// Frames begin with the fixed `A3 A4` marker.
    WithStartMarker,
    /// Frames begin directly with the length byte.
    WithoutStartMarker,
}

impl FramingVariant {
    /// Both variants, in the order the search tries them.
    pub const ALL: [FramingVariant; 2] = [Self::WithStartMarker, Self::WithoutStartMarker];

    /// Bytes preceding the length field.
    fn header_size(self) -> usize {
        match self {
            Self::WithStartMarker => START_MARKER.len(),
            Self::WithoutStartMarker => 0,
        }
    }

    /// Smallest complete frame under this variant: optional marker, length
    /// byte, fixed body, checksum byte.
    pub fn min_frame_size(self) -> usize {
        self.header_size() + MIN_FRAME_SIZE
    }
}

impl std::fmt::Display for FramingVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WithStartMarker => write!(f, "with-marker"),
            Self::WithoutStartMarker => write!(f, "no-marker"),
        }
    }
}

/// Decoded contents of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBody {
    /// Cleartext obfuscation seed.
    pub seed: u8,
    /// Key field as received (zero-filled in unauthenticated requests).
    pub key_field: [u8; KEY_FIELD_SIZE],
    /// Command byte.
    pub command: u8,
    /// De-obfuscated payload.
    pub payload: Vec<u8>,
}

/// Build an outbound frame with a freshly drawn random seed.
///
/// `key_field` defaults to 8 zero bytes when absent; a present key field of
/// any other length is rejected with [`FrameError::InvalidKeyLength`].
pub fn build(
    variant: FramingVariant,
    command: u8,
    payload: &[u8],
    key_field: Option<&[u8]>,
) -> FrameResult<Vec<u8>> {
    build_with_seed(variant, command, payload, key_field, rand::random())
}

/// Build an outbound frame with an explicit seed.
///
/// [`build`] is the normal entry point; this one exists for deterministic
/// callers and wire-format tests.
pub fn build_with_seed(
    variant: FramingVariant,
    command: u8,
    payload: &[u8],
    key_field: Option<&[u8]>,
    seed: u8,
) -> FrameResult<Vec<u8>> {
    let key: [u8; KEY_FIELD_SIZE] = match key_field {
        None => [0; KEY_FIELD_SIZE],
        Some(k) => k
            .try_into()
            .map_err(|_| FrameError::InvalidKeyLength { actual: k.len() })?,
    };

    // The length byte counts the body plus the trailing checksum byte.
    let length = FIXED_BODY_SIZE + payload.len() + 1;
    if length > MAX_FRAME_LENGTH {
        return Err(FrameError::FrameTooLong { size: length });
    }

    let mask = cipher::mask(seed);
    let header = variant.header_size();

    let mut frame = Vec::with_capacity(header + 1 + length);
    if variant == FramingVariant::WithStartMarker {
        frame.extend_from_slice(&START_MARKER);
    }
    frame.push(length as u8);
    frame.push(seed);
    frame.extend_from_slice(&key);
    frame.push(command);
    frame.extend(payload.iter().map(|b| b ^ mask));

    let crc = checksum::crc8(&frame[header..]);
    frame.push(crc);
    Ok(frame)
}

/// Validate and decode an inbound frame.
///
/// Bytes beyond the declared length are ignored; some stacks pad
/// notifications to the MTU.
pub fn parse(variant: FramingVariant, bytes: &[u8]) -> FrameResult<FrameBody> {
    let min = variant.min_frame_size();
    if bytes.len() < min {
        return Err(FrameError::TooShort {
            expected: min,
            actual: bytes.len(),
        });
    }

    let rest = match variant {
        FramingVariant::WithStartMarker => {
            if bytes[..2] != START_MARKER {
                return Err(FrameError::BadStartMarker {
                    found: bytes[0],
                    found_second: bytes[1],
                });
            }
            &bytes[2..]
        }
        FramingVariant::WithoutStartMarker => bytes,
    };

    let length = rest[0] as usize;
    if length < FIXED_BODY_SIZE + 1 {
        return Err(FrameError::TooShort {
            expected: FIXED_BODY_SIZE + 1,
            actual: length,
        });
    }
    if rest.len() < 1 + length {
        return Err(FrameError::TooShort {
            expected: variant.header_size() + 1 + length,
            actual: bytes.len(),
        });
    }

    // rest[0] = length, rest[1..length] = body, rest[length] = checksum.
    let body = &rest[1..length];
    let received = rest[length];
    let computed = checksum::crc8(&rest[..length]);
    if received != computed {
        return Err(FrameError::ChecksumMismatch { computed, received });
    }

    let seed = body[0];
    let key_field: [u8; KEY_FIELD_SIZE] = body[1..1 + KEY_FIELD_SIZE].try_into().unwrap();
    let command = body[1 + KEY_FIELD_SIZE];
    let payload = cipher::apply(cipher::mask(seed), &body[FIXED_BODY_SIZE..]);

    Ok(FrameBody {
        seed,
        key_field,
        command,
        payload,
    })
}
