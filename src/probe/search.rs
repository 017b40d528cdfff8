//! Systematic sweep of the candidate configuration space.
//!
//! A candidate is one hypothesis: which endpoint is written, which one
//! notifies, which command byte opens the handshake, and whether frames
//! carry the start marker. Candidates are enumerated in a fixed order and
//! tried strictly one at a time — the radio is a single shared resource and
//! concurrent sessions would cross-talk.

use std::fmt;

use tracing::{info, warn};

use crate::core::constants::DEFAULT_COMMANDS;
use crate::core::error::{ProbeError, ProbeResult};
use crate::core::{EndpointId, EndpointInfo, EndpointRole, Link};
use crate::frame::{FrameBody, FramingVariant};

use super::session::{HandshakeOutcome, HandshakeSession, ProbeSettings};

/// One trial configuration: endpoint role assignment, command byte, and
/// framing variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateConfig {
    /// Endpoint the handshake frame is written to.
    pub write: EndpointId,
    /// Endpoint the response is expected on.
    pub notify: EndpointId,
    /// Command byte of the handshake frame.
    pub command: u8,
    /// Framing variant for both directions.
    pub variant: FramingVariant,
}

impl fmt::Display for CandidateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "write={} notify={} command={:#04x} framing={}",
            self.write, self.notify, self.command, self.variant
        )
    }
}

/// The configuration a search settled on, with the recovered key.
#[derive(Debug)]
pub struct WorkingConfiguration {
    /// The candidate that produced a validating response.
    pub candidate: CandidateConfig,
    /// De-obfuscated payload of the response frame.
    pub communication_key: Vec<u8>,
    /// Full decoded response.
    pub response: FrameBody,
}

/// Enumerate candidates in deterministic order: ordered (write, notify)
/// endpoint pairs outermost, command bytes inner, framing variant innermost.
///
/// Endpoints are filtered by capability, and an endpoint is never paired
/// with itself.
pub fn enumerate_candidates(
    endpoints: &[EndpointInfo],
    commands: &[u8],
    variants: &[FramingVariant],
) -> Vec<CandidateConfig> {
    let mut candidates = Vec::new();
    for writer in endpoints.iter().filter(|e| e.supports(EndpointRole::Write)) {
        for notifier in endpoints.iter().filter(|e| e.supports(EndpointRole::Notify)) {
            if writer.id == notifier.id {
                continue;
            }
            for &command in commands {
                for &variant in variants {
                    candidates.push(CandidateConfig {
                        write: writer.id.clone(),
                        notify: notifier.id.clone(),
                        command,
                        variant,
                    });
                }
            }
        }
    }
    candidates
}

/// Sequential search over candidate configurations: exhaustive on failure,
/// fail-fast on success.
#[derive(Debug, Clone)]
pub struct ConfigurationSearch {
    settings: ProbeSettings,
    commands: Vec<u8>,
    variants: Vec<FramingVariant>,
}

impl ConfigurationSearch {
    /// Search with the default command set and both framing variants.
    pub fn new(settings: ProbeSettings) -> Self {
        Self {
            settings,
            commands: DEFAULT_COMMANDS.to_vec(),
            variants: FramingVariant::ALL.to_vec(),
        }
    }

    /// Replace the command bytes to try.
    pub fn with_commands(mut self, commands: impl Into<Vec<u8>>) -> Self {
        self.commands = commands.into();
        self
    }

    /// Replace the framing variants to try.
    pub fn with_variants(mut self, variants: impl Into<Vec<FramingVariant>>) -> Self {
        self.variants = variants.into();
        self
    }

    /// Enumerate this search's candidates for a set of discovered endpoints.
    pub fn candidates_for(&self, endpoints: &[EndpointInfo]) -> Vec<CandidateConfig> {
        enumerate_candidates(endpoints, &self.commands, &self.variants)
    }

    /// Run one session per candidate, stopping at the first success.
    ///
    /// Per-candidate failures (timeout, rejected subscribe or write) are
    /// logged and skipped. Exhaustion yields
    /// [`ProbeError::NoWorkingConfiguration`]; a fatal link error aborts the
    /// search immediately.
    pub async fn run<L: Link + ?Sized>(
        &self,
        link: &mut L,
        candidates: &[CandidateConfig],
    ) -> ProbeResult<WorkingConfiguration> {
        let total = candidates.len();
        for (index, candidate) in candidates.iter().enumerate() {
            info!(attempt = index + 1, total, %candidate, "trying candidate configuration");
            let mut session = HandshakeSession::new(&mut *link, candidate, &self.settings);
            match session.run().await? {
                HandshakeOutcome::Completed { body } => {
                    info!(
                        %candidate,
                        key = %hex::encode(&body.payload),
                        "working configuration found"
                    );
                    return Ok(WorkingConfiguration {
                        candidate: candidate.clone(),
                        communication_key: body.payload.clone(),
                        response: body,
                    });
                }
                HandshakeOutcome::TimedOut => {
                    warn!(%candidate, "no response within the bounded wait");
                }
                HandshakeOutcome::Failed(reason) => {
                    warn!(%candidate, %reason, "candidate failed");
                }
            }
        }
        Err(ProbeError::NoWorkingConfiguration { attempts: total })
    }

    /// Discover endpoints, enumerate candidates, and run the search.
    pub async fn probe<L: Link + ?Sized>(
        &self,
        link: &mut L,
        service_hint: Option<&str>,
    ) -> ProbeResult<WorkingConfiguration> {
        let endpoints = link.discover(service_hint).await?;
        info!(count = endpoints.len(), "discovered endpoints");
        let candidates = self.candidates_for(&endpoints);
        self.run(link, &candidates).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::super::testing::MockLink;
    use super::*;
    use crate::frame;

    fn endpoints() -> Vec<EndpointInfo> {
        vec![
            EndpointInfo {
                id: EndpointId::new("0002"),
                writable: true,
                notifiable: true,
            },
            EndpointInfo {
                id: EndpointId::new("0003"),
                writable: true,
                notifiable: true,
            },
        ]
    }

    fn search() -> ConfigurationSearch {
        ConfigurationSearch::new(ProbeSettings {
            probe_payload: b"yOTmK50z".to_vec(),
            ..ProbeSettings::default()
        })
    }

    #[test]
    fn test_enumeration_order() {
        let candidates = enumerate_candidates(
            &endpoints(),
            &[0x01, 0x10],
            &FramingVariant::ALL,
        );
        // 2 ordered pairs x 2 commands x 2 variants
        assert_eq!(candidates.len(), 8);

        // Pair outermost, command inner, variant innermost.
        assert_eq!(candidates[0].write, EndpointId::new("0002"));
        assert_eq!(candidates[0].command, 0x01);
        assert_eq!(candidates[0].variant, FramingVariant::WithStartMarker);
        assert_eq!(candidates[1].variant, FramingVariant::WithoutStartMarker);
        assert_eq!(candidates[2].command, 0x10);
        assert_eq!(candidates[4].write, EndpointId::new("0003"));
        assert_eq!(candidates[4].notify, EndpointId::new("0002"));

        // Deterministic.
        let again = enumerate_candidates(&endpoints(), &[0x01, 0x10], &FramingVariant::ALL);
        assert_eq!(candidates, again);
    }

    #[test]
    fn test_enumeration_respects_capabilities() {
        let candidates = enumerate_candidates(
            &MockLink::endpoint_pair(),
            &[0x01],
            &[FramingVariant::WithStartMarker],
        );
        // Only tx->rx survives the capability filter.
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].write, EndpointId::new("tx"));
        assert_eq!(candidates[0].notify, EndpointId::new("rx"));
    }

    #[tokio::test]
    async fn test_empty_candidate_list_never_touches_link() {
        let mut link = MockLink::new();
        let calls = link.calls.clone();

        let err = search().run(&mut link, &[]).await.unwrap_err();
        assert!(matches!(
            err,
            ProbeError::NoWorkingConfiguration { attempts: 0 }
        ));
        assert_eq!(calls.subscribe.load(Ordering::SeqCst), 0);
        assert_eq!(calls.writes(), 0);
        assert_eq!(calls.unsubscribe.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_success() {
        let mut link = MockLink::new();
        link.responses.push(
            frame::build(FramingVariant::WithStartMarker, 0x01, b"COMMKEY0", None).unwrap(),
        );
        let calls = link.calls.clone();

        let candidates = enumerate_candidates(&endpoints(), &[0x01, 0x10], &FramingVariant::ALL);
        let found = search().run(&mut link, &candidates).await.unwrap();

        assert_eq!(found.candidate, candidates[0]);
        assert_eq!(found.communication_key, b"COMMKEY0");
        // Fail-fast on success: exactly one session ran.
        assert_eq!(calls.subscribe.load(Ordering::SeqCst), 1);
        assert_eq!(calls.unsubscribe.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_all_candidates_on_timeout() {
        let mut link = MockLink::new();
        let calls = link.calls.clone();

        let candidates = enumerate_candidates(
            &MockLink::endpoint_pair(),
            &[0x01, 0x10],
            &FramingVariant::ALL,
        );
        assert_eq!(candidates.len(), 4);

        let err = search().run(&mut link, &candidates).await.unwrap_err();
        assert!(matches!(
            err,
            ProbeError::NoWorkingConfiguration { attempts: 4 }
        ));
        // Every candidate got its own session and its own cleanup.
        assert_eq!(calls.subscribe.load(Ordering::SeqCst), 4);
        assert_eq!(calls.unsubscribe.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_link_error_aborts_search() {
        let mut link = MockLink::new();
        link.fatal_on_write = true;
        let calls = link.calls.clone();

        let candidates = enumerate_candidates(&endpoints(), &[0x01, 0x10], &FramingVariant::ALL);
        let err = search().run(&mut link, &candidates).await.unwrap_err();

        assert!(matches!(err, ProbeError::Link(e) if e.is_fatal()));
        // Aborted on the first candidate instead of grinding through eight.
        assert_eq!(calls.subscribe.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_discovers_then_searches() {
        let mut link = MockLink::new();
        link.endpoints = MockLink::endpoint_pair();
        link.responses.push(
            frame::build(FramingVariant::WithStartMarker, 0x01, b"COMMKEY0", None).unwrap(),
        );
        let calls = link.calls.clone();

        let found = search().probe(&mut link, Some("6e400001")).await.unwrap();
        assert_eq!(found.communication_key, b"COMMKEY0");
        assert_eq!(calls.discover.load(Ordering::SeqCst), 1);
    }
}
