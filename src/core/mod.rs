//! Core types: protocol constants, error taxonomy, and the link abstraction.

pub mod constants;
pub mod error;
pub mod traits;

pub use constants::*;
pub use error::{FrameError, FrameResult, LinkError, LinkResult, ProbeError, ProbeResult};
pub use traits::{EndpointId, EndpointInfo, EndpointRole, Link};
