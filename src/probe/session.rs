//! One handshake attempt against one candidate configuration.
//!
//! The session walks `Idle → Subscribed → Sent → AwaitingResponse` and ends
//! in `Completed`, `TimedOut`, or `Failed`, always passing through `Closed`
//! so the notify subscription is released on every exit path. A timeout is a
//! rejection of the candidate, not an error; only loss of the underlying
//! connection escapes as `Err`.

use std::fmt;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::core::constants::{KEY_FIELD_SIZE, RESPONSE_TIMEOUT, SETTLE_DELAY};
use crate::core::error::{LinkError, ProbeResult};
use crate::core::Link;
use crate::frame::{self, FrameBody};

use super::search::CandidateConfig;

/// Knobs shared by every session of one search.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Request payload, obfuscated on the wire. Typically the peripheral's
    /// 8-byte device key, when one is known.
    pub probe_payload: Vec<u8>,
    /// Cleartext key field; `None` sends 8 zero bytes.
    pub key_field: Option<[u8; KEY_FIELD_SIZE]>,
    /// Pause between subscribing and writing.
    pub settle_delay: Duration,
    /// Bounded wait for a parseable response.
    pub response_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            probe_payload: Vec::new(),
            key_field: None,
            settle_delay: SETTLE_DELAY,
            response_timeout: RESPONSE_TIMEOUT,
        }
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing acquired yet.
    Idle,
    /// Notify subscription active.
    Subscribed,
    /// Handshake frame written.
    Sent,
    /// Waiting on the notify stream.
    AwaitingResponse,
    /// A response frame validated.
    Completed,
    /// No parseable response within the bounded wait.
    TimedOut,
    /// Subscribe or write was rejected, or the notify stream ended.
    Failed,
    /// Subscription released; the session is finished.
    Closed,
}

/// Why a session failed short of the response wait.
#[derive(Debug)]
pub enum FailureReason {
    /// The link rejected the subscription.
    Subscribe(LinkError),
    /// Both write modes were rejected; carries the first rejection.
    Write(LinkError),
    /// The notify stream ended before the deadline.
    StreamClosed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscribe(e) => write!(f, "subscribe rejected: {e}"),
            Self::Write(e) => write!(f, "write rejected in both modes: {e}"),
            Self::StreamClosed => write!(f, "notify stream closed before a response arrived"),
        }
    }
}

/// Terminal result of one session.
#[derive(Debug)]
pub enum HandshakeOutcome {
    /// The first inbound buffer that parsed under the candidate's framing.
    Completed {
        /// Decoded response frame; its payload is the communication key.
        body: FrameBody,
    },
    /// Nothing parseable arrived within the bounded wait.
    TimedOut,
    /// The candidate could not be exercised.
    Failed(FailureReason),
}

impl HandshakeOutcome {
    /// Recovered communication key, when the handshake completed.
    pub fn communication_key(&self) -> Option<&[u8]> {
        match self {
            Self::Completed { body } => Some(&body.payload),
            _ => None,
        }
    }
}

/// One handshake attempt: borrow the link, test the candidate, release
/// everything.
pub struct HandshakeSession<'a, L: Link + ?Sized> {
    link: &'a mut L,
    candidate: &'a CandidateConfig,
    settings: &'a ProbeSettings,
    state: SessionState,
}

impl<'a, L: Link + ?Sized> HandshakeSession<'a, L> {
    /// Prepare a session in the `Idle` state.
    pub fn new(link: &'a mut L, candidate: &'a CandidateConfig, settings: &'a ProbeSettings) -> Self {
        Self {
            link,
            candidate,
            settings,
            state: SessionState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to a terminal state.
    ///
    /// `Err` is reserved for fatal conditions (connection loss, a frame the
    /// settings cannot build); every per-candidate failure folds into the
    /// returned [`HandshakeOutcome`]. The notify subscription is released
    /// before this returns, whatever the path.
    pub async fn run(&mut self) -> ProbeResult<HandshakeOutcome> {
        let result = self.attempt().await;
        self.link.unsubscribe(&self.candidate.notify).await;
        self.state = SessionState::Closed;
        result
    }

    async fn attempt(&mut self) -> ProbeResult<HandshakeOutcome> {
        // Idle -> Subscribed
        let mut inbound = match self.link.subscribe(&self.candidate.notify).await {
            Ok(rx) => rx,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                self.state = SessionState::Failed;
                return Ok(HandshakeOutcome::Failed(FailureReason::Subscribe(e)));
            }
        };
        self.state = SessionState::Subscribed;

        // Let the subscription propagate before the peripheral sees traffic.
        tokio::time::sleep(self.settings.settle_delay).await;

        let frame = frame::build(
            self.candidate.variant,
            self.candidate.command,
            &self.settings.probe_payload,
            self.settings.key_field.as_ref().map(|k| k.as_slice()),
        )?;
        debug!(candidate = %self.candidate, frame = %hex::encode(&frame), "sending handshake frame");

        // Subscribed -> Sent, retrying once with the alternate write mode.
        match self.link.write(&self.candidate.write, &frame, true).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(first) => {
                debug!(error = %first, "acknowledged write rejected; retrying unacknowledged");
                match self.link.write(&self.candidate.write, &frame, false).await {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(_) => {
                        self.state = SessionState::Failed;
                        return Ok(HandshakeOutcome::Failed(FailureReason::Write(first)));
                    }
                }
            }
        }
        self.state = SessionState::Sent;

        // Sent -> AwaitingResponse: first buffer that validates wins.
        self.state = SessionState::AwaitingResponse;
        let deadline = Instant::now() + self.settings.response_timeout;
        loop {
            match timeout_at(deadline, inbound.recv()).await {
                Err(_) => {
                    self.state = SessionState::TimedOut;
                    return Ok(HandshakeOutcome::TimedOut);
                }
                Ok(None) => {
                    self.state = SessionState::Failed;
                    return Ok(HandshakeOutcome::Failed(FailureReason::StreamClosed));
                }
                Ok(Some(buffer)) => match frame::parse(self.candidate.variant, &buffer) {
                    Ok(body) => {
                        debug!(response = %hex::encode(&buffer), "response frame validated");
                        self.state = SessionState::Completed;
                        return Ok(HandshakeOutcome::Completed { body });
                    }
                    Err(e) => {
                        debug!(buffer = %hex::encode(&buffer), error = %e, "discarding inbound buffer");
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::super::testing::MockLink;
    use super::*;
    use crate::core::{EndpointId, ProbeError};
    use crate::frame::FramingVariant;

    fn candidate() -> CandidateConfig {
        CandidateConfig {
            write: EndpointId::new("tx"),
            notify: EndpointId::new("rx"),
            command: 0x01,
            variant: FramingVariant::WithStartMarker,
        }
    }

    fn settings() -> ProbeSettings {
        ProbeSettings {
            probe_payload: b"yOTmK50z".to_vec(),
            ..ProbeSettings::default()
        }
    }

    fn valid_response(payload: &[u8]) -> Vec<u8> {
        frame::build(FramingVariant::WithStartMarker, 0x01, payload, None).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_on_valid_response() {
        let mut link = MockLink::new();
        link.responses.push(valid_response(b"COMMKEY0"));
        let calls = link.calls.clone();

        let cand = candidate();
        let cfg = settings();
        let mut session = HandshakeSession::new(&mut link, &cand, &cfg);
        let outcome = session.run().await.unwrap();

        assert_eq!(outcome.communication_key(), Some(b"COMMKEY0".as_slice()));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(calls.subscribe.load(Ordering::SeqCst), 1);
        assert_eq!(calls.unsubscribe.load(Ordering::SeqCst), 1);
        assert_eq!(calls.write_acked.load(Ordering::SeqCst), 1);
        assert_eq!(calls.write_unacked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_unparseable_buffers() {
        let mut link = MockLink::new();
        link.responses.push(vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        link.responses.push(valid_response(b"COMMKEY0"));

        let cand = candidate();
        let cfg = settings();
        let mut session = HandshakeSession::new(&mut link, &cand, &cfg);
        let outcome = session.run().await.unwrap();

        assert_eq!(outcome.communication_key(), Some(b"COMMKEY0".as_slice()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_and_releases_subscription() {
        let mut link = MockLink::new();
        let calls = link.calls.clone();

        let cand = candidate();
        let cfg = settings();
        let mut session = HandshakeSession::new(&mut link, &cand, &cfg);
        let outcome = session.run().await.unwrap();

        assert!(matches!(outcome, HandshakeOutcome::TimedOut));
        assert_eq!(session.state(), SessionState::Closed);
        // No leak: exactly one subscribe, exactly one unsubscribe.
        assert_eq!(calls.subscribe.load(Ordering::SeqCst), 1);
        assert_eq!(calls.unsubscribe.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_rejection_fails_candidate() {
        let mut link = MockLink::new();
        link.reject_subscribe = true;
        let calls = link.calls.clone();

        let cand = candidate();
        let cfg = settings();
        let mut session = HandshakeSession::new(&mut link, &cand, &cfg);
        let outcome = session.run().await.unwrap();

        assert!(matches!(
            outcome,
            HandshakeOutcome::Failed(FailureReason::Subscribe(_))
        ));
        assert_eq!(calls.writes(), 0);
        assert_eq!(calls.unsubscribe.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_unacknowledged_write() {
        let mut link = MockLink::new();
        link.reject_acked_writes = true;
        link.responses.push(valid_response(b"COMMKEY0"));
        let calls = link.calls.clone();

        let cand = candidate();
        let cfg = settings();
        let mut session = HandshakeSession::new(&mut link, &cand, &cfg);
        let outcome = session.run().await.unwrap();

        assert!(matches!(outcome, HandshakeOutcome::Completed { .. }));
        assert_eq!(calls.write_acked.load(Ordering::SeqCst), 1);
        assert_eq!(calls.write_unacked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_rejected_in_both_modes() {
        let mut link = MockLink::new();
        link.reject_all_writes = true;
        let calls = link.calls.clone();

        let cand = candidate();
        let cfg = settings();
        let mut session = HandshakeSession::new(&mut link, &cand, &cfg);
        let outcome = session.run().await.unwrap();

        assert!(matches!(
            outcome,
            HandshakeOutcome::Failed(FailureReason::Write(_))
        ));
        assert_eq!(calls.writes(), 2);
        assert_eq!(calls.unsubscribe.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_loss_is_fatal_but_still_cleans_up() {
        let mut link = MockLink::new();
        link.fatal_on_write = true;
        let calls = link.calls.clone();

        let cand = candidate();
        let cfg = settings();
        let mut session = HandshakeSession::new(&mut link, &cand, &cfg);
        let err = session.run().await.unwrap_err();

        assert!(matches!(err, ProbeError::Link(e) if e.is_fatal()));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(calls.unsubscribe.load(Ordering::SeqCst), 1);
    }
}
