//! # OMNIPROBE
//!
//! A prober for the proprietary application-layer protocol some BLE
//! peripherals carry over GATT write/notify characteristics.
//!
//! The peripheral's exact protocol parameters are unknown: which
//! characteristic is written and which one notifies, which command byte the
//! handshake uses, and whether frames carry a start marker are all guesses.
//! OMNIPROBE makes the guessing systematic. It enumerates every candidate
//! configuration, runs one handshake per candidate against the device, and
//! reports the first configuration whose response frame validates.
//!
//! - **Codec**: length-prefixed frames with a CRC8 trailer and a one-byte
//!   XOR obfuscation mask derived from a cleartext seed
//! - **Handshake**: subscribe, settle, write, bounded wait for the first
//!   parseable notification, guaranteed unsubscribe
//! - **Search**: deterministic sweep over {endpoint roles, command byte,
//!   framing variant}, sequential, fail-fast on success
//!
//! ## Feature Flags
//!
//! - `ble` (default): btleplug-backed link adapter and scanner
//!
//! ## Modules
//!
//! - [`core`]: constants, error types, and the abstract [`core::Link`] trait
//! - [`frame`]: checksum, obfuscation cipher, and frame codec
//! - [`probe`]: handshake session, configuration search, discovery loop
//! - [`link`]: BLE transport (requires `ble` feature)
//!
//! ## Example
//!
//! ```rust
//! use omniprobe::frame::{self, FramingVariant};
//!
//! // Build a handshake request and parse it back.
//! let bytes = frame::build(FramingVariant::WithStartMarker, 0x01, b"yOTmK50z", None).unwrap();
//! let body = frame::parse(FramingVariant::WithStartMarker, &bytes).unwrap();
//! assert_eq!(body.command, 0x01);
//! assert_eq!(body.payload, b"yOTmK50z");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Wire codec (always included)
pub mod frame;

// Handshake and search (always included)
pub mod probe;

// BLE transport (feature-gated)
#[cfg(feature = "ble")]
#[cfg_attr(docsrs, doc(cfg(feature = "ble")))]
pub mod link;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types and errors
    pub use crate::core::{
        EndpointId, EndpointInfo, EndpointRole, FrameError, Link, LinkError, ProbeError,
    };

    // Codec
    pub use crate::frame::{FrameBody, FramingVariant};

    // Handshake and search
    pub use crate::probe::{
        CandidateConfig, ConfigurationSearch, DiscoveryLoop, HandshakeOutcome, HandshakeSession,
        ProbeSettings, WorkingConfiguration,
    };

    // BLE transport (when enabled)
    #[cfg(feature = "ble")]
    pub use crate::link::{BleLink, ScanConfig};
}
