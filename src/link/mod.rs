//! BLE transport: the btleplug-backed [`Link`](crate::core::Link)
//! implementation and a scanner that feeds the discovery loop.

pub mod ble;
pub mod scan;

pub use ble::BleLink;
pub use scan::{discover_links, scan, ScanConfig};
