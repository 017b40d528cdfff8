//! Protocol constants for the probed frame format.
//!
//! Everything here was lifted from captured traffic and vendor documentation
//! fragments; none of it is negotiated on the wire.

use std::time::Duration;

// =============================================================================
// FRAMING
// =============================================================================

/// Fixed two-byte start marker (STX) used by the marker-bearing framing variant.
pub const START_MARKER: [u8; 2] = [0xA3, 0xA4];

/// Size of the cleartext obfuscation seed at the head of every body.
pub const SEED_SIZE: usize = 1;

/// Size of the key field that follows the seed.
pub const KEY_FIELD_SIZE: usize = 8;

/// Size of the command byte.
pub const COMMAND_SIZE: usize = 1;

/// Fixed portion of a frame body: seed + key field + command.
pub const FIXED_BODY_SIZE: usize = SEED_SIZE + KEY_FIELD_SIZE + COMMAND_SIZE;

/// Smallest frame the codec accepts, without the start marker:
/// length byte + fixed body + checksum byte.
pub const MIN_FRAME_SIZE: usize = 1 + FIXED_BODY_SIZE + 1;

/// Largest value the one-byte length field can carry.
pub const MAX_FRAME_LENGTH: usize = 255;

/// Largest payload that still fits the one-byte length field.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_LENGTH - 1 - FIXED_BODY_SIZE;

// =============================================================================
// CHECKSUM & OBFUSCATION
// =============================================================================

/// CRC8 generator polynomial.
pub const CRC_POLYNOMIAL: u8 = 0x07;

/// CRC8 initial value.
pub const CRC_INITIAL: u8 = 0x00;

/// Offset added to the seed byte to derive the XOR obfuscation mask.
pub const MASK_OFFSET: u8 = 0x32;

// =============================================================================
// SEARCH SPACE
// =============================================================================

/// Handshake command observed in vendor documentation (request communication key).
pub const CMD_REQUEST_COMM_KEY: u8 = 0x01;

/// Command bytes tried by default. Both values appear in captures; neither is
/// confirmed, so they are search parameters rather than protocol facts.
pub const DEFAULT_COMMANDS: [u8; 2] = [CMD_REQUEST_COMM_KEY, 0x10];

// =============================================================================
// TIMING
// =============================================================================

/// Delay between subscribing to the notify endpoint and issuing the write,
/// so the subscription is active before the peripheral can respond.
pub const SETTLE_DELAY: Duration = Duration::from_millis(300);

/// How long a handshake waits for a parseable response before the candidate
/// is abandoned.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default BLE scan duration.
pub const SCAN_DURATION: Duration = Duration::from_secs(8);
