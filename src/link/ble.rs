//! btleplug-backed link adapter.
//!
//! Endpoints are GATT characteristics, identified by their UUID string.
//! btleplug exposes one notification stream per peripheral; `subscribe`
//! re-expresses it as one bounded channel per endpoint by spawning a
//! forwarder task that filters on the characteristic UUID.

use std::collections::HashMap;

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{LinkError, LinkResult};
use crate::core::{EndpointId, EndpointInfo, Link};

/// Map a btleplug error, keeping connection loss fatal.
fn map_err(e: btleplug::Error, recoverable: fn(String) -> LinkError) -> LinkError {
    match e {
        btleplug::Error::NotConnected | btleplug::Error::DeviceNotFound => {
            LinkError::ConnectionLost(e.to_string())
        }
        other => recoverable(other.to_string()),
    }
}

/// A connected BLE peripheral exposed through the [`Link`] trait.
pub struct BleLink {
    peripheral: Peripheral,
    characteristics: HashMap<EndpointId, Characteristic>,
    forwarders: HashMap<EndpointId, JoinHandle<()>>,
}

impl BleLink {
    /// Connect to a peripheral and run GATT service discovery.
    pub async fn connect(peripheral: Peripheral) -> LinkResult<Self> {
        let connected = peripheral
            .is_connected()
            .await
            .map_err(|e| LinkError::ConnectionLost(e.to_string()))?;
        if !connected {
            peripheral
                .connect()
                .await
                .map_err(|e| LinkError::ConnectionLost(e.to_string()))?;
        }
        peripheral
            .discover_services()
            .await
            .map_err(|e| map_err(e, LinkError::Discovery))?;

        Ok(Self {
            peripheral,
            characteristics: HashMap::new(),
            forwarders: HashMap::new(),
        })
    }

    /// Disconnect, best-effort.
    pub async fn disconnect(mut self) {
        for (_, handle) in self.forwarders.drain() {
            handle.abort();
        }
        let _ = self.peripheral.disconnect().await;
    }

    fn characteristic(&self, endpoint: &EndpointId) -> Option<&Characteristic> {
        self.characteristics.get(endpoint)
    }
}

#[async_trait]
impl Link for BleLink {
    async fn discover(&mut self, service_hint: Option<&str>) -> LinkResult<Vec<EndpointInfo>> {
        let service: Option<Uuid> = service_hint
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| LinkError::Discovery(format!("bad service hint: {e}")))?;

        self.characteristics.clear();
        let mut endpoints = Vec::new();
        for characteristic in self.peripheral.characteristics() {
            if let Some(service) = service {
                if characteristic.service_uuid != service {
                    continue;
                }
            }
            let writable = characteristic
                .properties
                .intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE);
            let notifiable = characteristic
                .properties
                .intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE);
            if !writable && !notifiable {
                continue;
            }

            let id = EndpointId::new(characteristic.uuid.to_string());
            debug!(endpoint = %id, writable, notifiable, "discovered endpoint");
            endpoints.push(EndpointInfo {
                id: id.clone(),
                writable,
                notifiable,
            });
            self.characteristics.insert(id, characteristic);
        }
        Ok(endpoints)
    }

    async fn subscribe(&mut self, endpoint: &EndpointId) -> LinkResult<mpsc::Receiver<Vec<u8>>> {
        let characteristic = self
            .characteristic(endpoint)
            .ok_or_else(|| LinkError::Subscribe(format!("unknown endpoint {endpoint}")))?
            .clone();

        self.peripheral
            .subscribe(&characteristic)
            .await
            .map_err(|e| map_err(e, LinkError::Subscribe))?;

        let mut notifications = self
            .peripheral
            .notifications()
            .await
            .map_err(|e| map_err(e, LinkError::Subscribe))?;

        let (tx, rx) = mpsc::channel(16);
        let uuid = characteristic.uuid;
        let forwarder = tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid != uuid {
                    continue;
                }
                if tx.send(notification.value).await.is_err() {
                    break;
                }
            }
        });
        self.forwarders.insert(endpoint.clone(), forwarder);
        Ok(rx)
    }

    async fn unsubscribe(&mut self, endpoint: &EndpointId) {
        if let Some(forwarder) = self.forwarders.remove(endpoint) {
            forwarder.abort();
        }
        // Best-effort: a failed unsubscribe leaves nothing to clean up that
        // a disconnect will not also release.
        if let Some(characteristic) = self.characteristics.get(endpoint) {
            let _ = self.peripheral.unsubscribe(characteristic).await;
        }
    }

    async fn write(
        &mut self,
        endpoint: &EndpointId,
        bytes: &[u8],
        acknowledged: bool,
    ) -> LinkResult<()> {
        let characteristic = self
            .characteristic(endpoint)
            .ok_or_else(|| LinkError::Write(format!("unknown endpoint {endpoint}")))?;

        let write_type = if acknowledged {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        self.peripheral
            .write(characteristic, bytes, write_type)
            .await
            .map_err(|e| map_err(e, LinkError::Write))
    }
}

impl Drop for BleLink {
    fn drop(&mut self) {
        for (_, handle) in self.forwarders.drain() {
            handle.abort();
        }
    }
}
