//! Handshake sequencing and configuration search.
//!
//! One [`HandshakeSession`] tests a single hypothesis about the peripheral's
//! protocol; the [`ConfigurationSearch`] sweeps the hypothesis space
//! sequentially; the [`DiscoveryLoop`] drives one search per discovered
//! peripheral.

pub mod discovery;
pub mod search;
pub mod session;

pub use discovery::DiscoveryLoop;
pub use search::{enumerate_candidates, CandidateConfig, ConfigurationSearch, WorkingConfiguration};
pub use session::{FailureReason, HandshakeOutcome, HandshakeSession, ProbeSettings, SessionState};
