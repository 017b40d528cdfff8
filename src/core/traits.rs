//! The abstract link consumed by the prober.
//!
//! BLE transport (scanning, connections, GATT plumbing) is an external
//! collaborator. The prober only needs four primitives — discover, subscribe,
//! unsubscribe, write — and consumes them through the [`Link`] trait, so the
//! handshake and search logic can be exercised against an in-memory fake.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::LinkResult;

/// Hypothesized role of an endpoint within one candidate configuration.
///
/// Roles are guesses under test, not protocol facts: the same characteristic
/// appears as `Write` in one candidate and `Notify` in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRole {
    /// Frames are written to this endpoint.
    Write,
    /// Responses are expected to arrive on this endpoint.
    Notify,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => write!(f, "write"),
            Self::Notify => write!(f, "notify"),
        }
    }
}

/// Opaque handle to one discovered endpoint (a GATT characteristic, for the
/// BLE adapter). The string form is whatever the link uses to identify the
/// endpoint; the prober only clones, compares, and displays it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointId(String);

impl EndpointId {
    /// Wrap a link-specific identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The link-specific identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A discovered endpoint with its role capability flags.
///
/// Capabilities bound the search space: only writable endpoints are tried in
/// the write role and only notifiable ones in the notify role.
#[derive(Debug, Clone)]
pub struct EndpointInfo {
    /// Opaque endpoint handle.
    pub id: EndpointId,
    /// Endpoint accepts writes (with or without response).
    pub writable: bool,
    /// Endpoint can notify or indicate.
    pub notifiable: bool,
}

impl EndpointInfo {
    /// Whether this endpoint can be assigned the given role.
    pub fn supports(&self, role: EndpointRole) -> bool {
        match role {
            EndpointRole::Write => self.writable,
            EndpointRole::Notify => self.notifiable,
        }
    }
}

/// Transport primitives the prober consumes.
///
/// Implementations must deliver inbound buffers through the channel returned
/// by [`subscribe`](Link::subscribe); the prober awaits that channel with a
/// deadline and never installs callbacks of its own.
#[async_trait]
pub trait Link: Send {
    /// List role-tagged endpoints, optionally restricted to a service.
    ///
    /// The hint is a link-specific service identifier (a UUID string for the
    /// BLE adapter); `None` lists every endpoint the link knows about.
    async fn discover(&mut self, service_hint: Option<&str>) -> LinkResult<Vec<EndpointInfo>>;

    /// Start notifications on an endpoint and return the stream of inbound
    /// buffers. The receiver stays valid until [`unsubscribe`](Link::unsubscribe).
    async fn subscribe(&mut self, endpoint: &EndpointId) -> LinkResult<mpsc::Receiver<Vec<u8>>>;

    /// Stop notifications on an endpoint. Idempotent; never errors to the
    /// caller (cleanup failures are the link's problem to log).
    async fn unsubscribe(&mut self, endpoint: &EndpointId);

    /// Write bytes to an endpoint, acknowledged or not.
    async fn write(&mut self, endpoint: &EndpointId, bytes: &[u8], acknowledged: bool)
        -> LinkResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_supports_role() {
        let info = EndpointInfo {
            id: EndpointId::new("2a00"),
            writable: true,
            notifiable: false,
        };
        assert!(info.supports(EndpointRole::Write));
        assert!(!info.supports(EndpointRole::Notify));
    }

    #[test]
    fn test_endpoint_id_display_roundtrip() {
        let id = EndpointId::new("6e400002-b5a3-f393-e0a9-e50e24dcca9e");
        assert_eq!(id.to_string(), id.as_str());
        assert_eq!(id, EndpointId::new("6e400002-b5a3-f393-e0a9-e50e24dcca9e"));
    }
}
