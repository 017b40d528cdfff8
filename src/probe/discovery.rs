//! Drives one configuration search per discovered peripheral.
//!
//! The loop owns its lifecycle: it is fed by an explicit channel of links
//! (one per discovered peripheral) instead of ambient scan callbacks, and it
//! returns when a working configuration is found or the source runs dry.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::error::{ProbeError, ProbeResult};
use crate::core::Link;

use super::search::{ConfigurationSearch, WorkingConfiguration};

/// Sequentially probes every link an event source hands it.
pub struct DiscoveryLoop<L: Link> {
    links: mpsc::Receiver<L>,
    search: ConfigurationSearch,
    service_hint: Option<String>,
}

impl<L: Link> DiscoveryLoop<L> {
    /// Build a loop over a stream of discovered links.
    pub fn new(links: mpsc::Receiver<L>, search: ConfigurationSearch) -> Self {
        Self {
            links,
            search,
            service_hint: None,
        }
    }

    /// Restrict endpoint discovery to one service.
    pub fn with_service_hint(mut self, hint: impl Into<String>) -> Self {
        self.service_hint = Some(hint.into());
        self
    }

    /// Probe peripherals until one yields a working configuration.
    ///
    /// Losing the connection to one peripheral abandons that peripheral and
    /// moves on to the next discovered one; only misconfiguration (a frame
    /// the settings cannot build) aborts the loop early. When the source
    /// closes without a success, the aggregate outcome is
    /// [`ProbeError::NoWorkingConfiguration`] over all candidates tried.
    pub async fn run(mut self) -> ProbeResult<WorkingConfiguration> {
        let mut attempts = 0;
        while let Some(mut link) = self.links.recv().await {
            info!("probing discovered peripheral");
            match self
                .search
                .probe(&mut link, self.service_hint.as_deref())
                .await
            {
                Ok(found) => return Ok(found),
                Err(ProbeError::NoWorkingConfiguration { attempts: tried }) => {
                    attempts += tried;
                    info!(tried, "peripheral rejected every candidate");
                }
                Err(ProbeError::Link(e)) => {
                    warn!(error = %e, "peripheral dropped mid-search; moving on");
                }
                Err(e) => return Err(e),
            }
        }
        Err(ProbeError::NoWorkingConfiguration { attempts })
    }
}
