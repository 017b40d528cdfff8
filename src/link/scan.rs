//! BLE scanning: turns advertising peripherals into connected [`BleLink`]s
//! for the discovery loop.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::constants::SCAN_DURATION;
use crate::core::error::{LinkError, LinkResult};

use super::ble::BleLink;

/// What to scan for and how long.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Keep only peripherals advertising this service.
    pub service: Option<Uuid>,
    /// Keep only peripherals whose local name contains this substring.
    pub name_filter: Option<String>,
    /// Scan duration.
    pub duration: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            service: None,
            name_filter: None,
            duration: SCAN_DURATION,
        }
    }
}

/// Get the default Bluetooth adapter.
async fn default_adapter() -> LinkResult<Adapter> {
    let manager = Manager::new()
        .await
        .map_err(|e| LinkError::Discovery(e.to_string()))?;
    let adapters = manager
        .adapters()
        .await
        .map_err(|e| LinkError::Discovery(e.to_string()))?;
    adapters
        .into_iter()
        .next()
        .ok_or_else(|| LinkError::Discovery("no Bluetooth adapter found".into()))
}

/// Scan for matching peripherals on the default adapter.
pub async fn scan(config: &ScanConfig) -> LinkResult<Vec<Peripheral>> {
    let adapter = default_adapter().await?;

    let filter = match config.service {
        Some(service) => ScanFilter {
            services: vec![service],
        },
        None => ScanFilter::default(),
    };
    adapter
        .start_scan(filter)
        .await
        .map_err(|e| LinkError::Discovery(e.to_string()))?;
    tokio::time::sleep(config.duration).await;

    let peripherals = adapter
        .peripherals()
        .await
        .map_err(|e| LinkError::Discovery(e.to_string()))?;

    let mut matched = Vec::new();
    for peripheral in peripherals {
        let props = match peripheral.properties().await {
            Ok(Some(props)) => props,
            Ok(None) => continue,
            Err(e) => {
                debug!(error = %e, "skipping peripheral without readable properties");
                continue;
            }
        };

        if let Some(service) = config.service {
            if !props.services.contains(&service) {
                continue;
            }
        }
        if let Some(name_filter) = &config.name_filter {
            let name = props.local_name.clone().unwrap_or_default();
            if !name.contains(name_filter.as_str()) {
                continue;
            }
        }

        info!(
            address = %peripheral.address(),
            name = props.local_name.as_deref().unwrap_or("?"),
            rssi = props.rssi,
            "found candidate peripheral"
        );
        matched.push(peripheral);
    }

    let _ = adapter.stop_scan().await;
    Ok(matched)
}

/// Scan, connect to every match, and hand the links out through a channel.
///
/// This is the event source for a
/// [`DiscoveryLoop`](crate::probe::DiscoveryLoop): the channel closes once
/// every matching peripheral has been offered. Connection failures skip the
/// peripheral rather than ending the stream.
pub fn discover_links(config: ScanConfig) -> mpsc::Receiver<BleLink> {
    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        let peripherals = match scan(&config).await {
            Ok(peripherals) => peripherals,
            Err(e) => {
                warn!(error = %e, "scan failed");
                return;
            }
        };
        for peripheral in peripherals {
            match BleLink::connect(peripheral).await {
                Ok(link) => {
                    if tx.send(link).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "could not connect to candidate peripheral"),
            }
        }
    });
    rx
}
