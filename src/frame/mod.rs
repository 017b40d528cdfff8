//! Wire codec for the probed frame format.
//!
//! ```text
//! [marker?: 0xA3 0xA4] [len: 1] [body: len-1] [crc: 1]
//! body = [seed: 1] [key field: 8] [command: 1] [payload XOR mask: N]
//! crc  = CRC8(poly 0x07, init 0x00) over (len ++ body)
//! mask = (seed + 0x32) mod 256
//! ```
//!
//! The checksum is the prober's primary detector: bytes read from the wrong
//! endpoint or under the wrong framing variant almost never satisfy it
//! (1/256 collision probability).

pub mod checksum;
pub mod cipher;
pub mod codec;

pub use codec::{build, build_with_seed, parse, FrameBody, FramingVariant};
