//! Probe a nearby peripheral for a working protocol configuration.
//!
//! Scans for peripherals advertising the target service, connects to each in
//! turn, and sweeps {endpoint roles, command byte, framing variant} until a
//! handshake response validates. Prints the recovered communication key.
//!
//! Set `RUST_LOG=omniprobe=debug` to see per-frame traffic.

use std::time::Duration;

use clap::Parser;
use uuid::Uuid;

use omniprobe::link::{discover_links, ScanConfig};
use omniprobe::probe::{ConfigurationSearch, DiscoveryLoop, ProbeSettings};

/// The Nordic UART service most of the sampled devices advertise. A guess,
/// like everything else about this protocol.
const DEFAULT_SERVICE: &str = "6e400001-b5a3-f393-e0a9-e50e24dcca9e";

#[derive(Parser)]
#[command(name = "probe", about = "Search a BLE peripheral for a working protocol configuration")]
struct Args {
    /// GATT service to scan for and to restrict endpoint discovery to.
    #[arg(long, default_value = DEFAULT_SERVICE)]
    service: Uuid,

    /// Request payload, hex-encoded (typically the 8-byte device key).
    #[arg(long, default_value = "796f546d4b35307a")]
    device_key: String,

    /// Command byte to try; repeat the flag to widen the search.
    #[arg(long = "command", value_parser = parse_byte, default_values = ["0x01", "0x10"])]
    commands: Vec<u8>,

    /// Only probe peripherals whose name contains this substring.
    #[arg(long)]
    name: Option<String>,

    /// Scan duration in seconds.
    #[arg(long, default_value_t = 8)]
    scan_secs: u64,

    /// Per-candidate response timeout in seconds.
    #[arg(long, default_value_t = 30)]
    response_timeout: u64,
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let s = s.trim_start_matches("0x");
    u8::from_str_radix(s, 16).map_err(|e| format!("bad command byte: {e}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let probe_payload = hex::decode(&args.device_key)?;

    let links = discover_links(ScanConfig {
        service: Some(args.service),
        name_filter: args.name.clone(),
        duration: Duration::from_secs(args.scan_secs),
    });

    let settings = ProbeSettings {
        probe_payload,
        response_timeout: Duration::from_secs(args.response_timeout),
        ..ProbeSettings::default()
    };
    let search = ConfigurationSearch::new(settings).with_commands(args.commands);

    let found = DiscoveryLoop::new(links, search)
        .with_service_hint(args.service.to_string())
        .run()
        .await?;

    println!("working configuration: {}", found.candidate);
    println!("communication key:     {}", hex::encode(&found.communication_key));
    Ok(())
}
