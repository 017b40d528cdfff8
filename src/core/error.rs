//! Error types for the prober.
//!
//! The taxonomy mirrors how errors are consumed: frame errors say "this
//! candidate configuration is wrong", recoverable link errors abandon one
//! candidate, fatal link errors abort the whole search.

use thiserror::Error;

/// Errors raised by the frame codec.
///
/// All of these are recoverable from the search's point of view: a frame that
/// fails to parse is evidence against the current candidate, nothing more.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer is smaller than the minimum viable frame, or the declared
    /// length overruns it.
    #[error("frame too short: need {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum bytes required.
        expected: usize,
        /// Actual bytes available.
        actual: usize,
    },

    /// The framing variant expects the fixed start marker and the leading
    /// bytes mismatch it.
    #[error("bad start marker: expected a3a4, got {found:02x}{found_second:02x}")]
    BadStartMarker {
        /// First received byte.
        found: u8,
        /// Second received byte.
        found_second: u8,
    },

    /// The trailing checksum byte disagrees with the CRC8 recomputed over
    /// the length byte and body.
    #[error("checksum mismatch: computed {computed:#04x}, received {received:#04x}")]
    ChecksumMismatch {
        /// CRC8 recomputed over the received length byte and body.
        computed: u8,
        /// Checksum byte as received.
        received: u8,
    },

    /// A caller-supplied key field was not exactly 8 bytes.
    #[error("invalid key field length: expected 8 bytes, got {actual}")]
    InvalidKeyLength {
        /// Actual key field length.
        actual: usize,
    },

    /// Body plus checksum exceeds the one-byte length field.
    #[error("frame too long: {size} bytes exceeds the one-byte length field")]
    FrameTooLong {
        /// Body length plus checksum byte.
        size: usize,
    },
}

/// Errors raised by a [`Link`](super::Link) implementation.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Endpoint discovery failed.
    #[error("endpoint discovery failed: {0}")]
    Discovery(String),

    /// The link rejected a subscription request.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// The link rejected a write.
    #[error("write failed: {0}")]
    Write(String),

    /// The underlying connection to the peripheral is gone. Unlike the other
    /// variants this is fatal: no further candidate can be tried on this link.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
}

impl LinkError {
    /// Whether this error invalidates the link as a whole rather than the
    /// current candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }
}

/// Top-level prober errors.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Every candidate configuration was tried and none produced a
    /// validating response.
    #[error("no working configuration found after {attempts} candidate(s)")]
    NoWorkingConfiguration {
        /// Number of candidates exhausted.
        attempts: usize,
    },

    /// Fatal link error.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Frame build error caused by the prober's own settings (oversized
    /// payload, malformed key field).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Result alias for codec operations.
pub type FrameResult<T> = Result<T, FrameError>;

/// Result alias for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Result alias for prober operations.
pub type ProbeResult<T> = Result<T, ProbeError>;
