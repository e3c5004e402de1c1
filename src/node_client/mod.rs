//! Sensor-Node Client
//!
//! ## Responsibilities
//!
//! - Poll the air-sensor node's HTTP API through the endpoint resolver
//! - Normalize the per-sensor wire shape into `SensorReading`s
//! - Fall back to the USB serial link when every network endpoint fails
//!
//! The node reports two physical sensors (`sht45`, `hdc3022`). The fused
//! air average is recomputed locally over `ok` sensors rather than
//! trusting the device's own `averages` block, so a sensor the node
//! flags as bad can never poison the average.

use crate::endpoint::{resolve_first, Endpoint};
use crate::error::{Error, Result};
use crate::fusion::{ConnectionStatus, SensorReading, SensorStatus};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::time::Duration;

/// Serial line-scan attempts before giving up
const SERIAL_SCAN_LINES: usize = 10;

/// Sentinel field a serial record must carry to be trusted
const SERIAL_SENTINEL: &str = "sensor_count";

/// Raw per-sensor block from the node's JSON
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSensorBlock {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub status: Option<String>,
}

/// The node's `/sensors` response shape
#[derive(Debug, Clone, Deserialize)]
pub struct NodeReport {
    #[serde(default)]
    pub sht45: RawSensorBlock,
    #[serde(default)]
    pub hdc3022: RawSensorBlock,
    #[serde(default)]
    pub sensor_count: usize,
}

/// One successful node poll
#[derive(Debug, Clone)]
pub struct NodePoll {
    pub sensors: BTreeMap<String, SensorReading>,
    pub status: ConnectionStatus,
}

impl NodeReport {
    /// Normalize the wire blocks into invariant-holding readings
    pub fn readings(&self) -> BTreeMap<String, SensorReading> {
        let mut out = BTreeMap::new();
        out.insert("sht45".to_string(), normalize_block(&self.sht45));
        out.insert("hdc3022".to_string(), normalize_block(&self.hdc3022));
        out
    }
}

fn normalize_block(block: &RawSensorBlock) -> SensorReading {
    let status = match block.status.as_deref() {
        Some("ok") => SensorStatus::Ok,
        Some("invalid_range") => SensorStatus::InvalidRange,
        Some("error") => SensorStatus::Error,
        Some("disconnected") | None => SensorStatus::Disconnected,
        Some(_) => SensorStatus::Error,
    };
    SensorReading::normalized(block.temperature, block.humidity, status)
}

/// Sensor-node transport client
pub struct NodeClient {
    http: reqwest::Client,
    endpoints: Vec<Endpoint>,
    attempt_timeout: Duration,
    serial_path: String,
    serial_baud: u32,
}

impl NodeClient {
    pub fn new(
        endpoints: Vec<Endpoint>,
        attempt_timeout: Duration,
        serial_path: String,
        serial_baud: u32,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints,
            attempt_timeout,
            serial_path,
            serial_baud,
        }
    }

    /// Poll the node: ordered HTTP endpoints first, serial fallback when
    /// the whole list is exhausted. Returns `Err(DeviceUnreachable)` only
    /// when both paths fail.
    pub async fn poll(&self) -> Result<NodePoll> {
        match resolve_first(
            "sensor-node",
            &self.endpoints,
            self.attempt_timeout,
            |endpoint| self.fetch_http(endpoint),
        )
        .await
        {
            Ok((report, endpoint)) => {
                tracing::info!(endpoint = %endpoint, sensors = report.sensor_count, "Sensor node polled");
                Ok(NodePoll {
                    sensors: report.readings(),
                    status: ConnectionStatus::Connected,
                })
            }
            Err(Error::DeviceUnreachable(_)) => {
                tracing::warn!("All sensor-node endpoints failed, trying serial fallback");
                let report = self.fetch_serial().await?;
                tracing::info!(path = %self.serial_path, "Sensor node read over serial");
                Ok(NodePoll {
                    sensors: report.readings(),
                    status: ConnectionStatus::ConnectedFallback,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_http(&self, endpoint: Endpoint) -> Result<NodeReport> {
        let url = format!("http://{}:{}/sensors", endpoint.host, endpoint.port);
        let response = self
            .http
            .get(&url)
            .timeout(self.attempt_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Endpoint {
                endpoint: endpoint.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let report = response.json::<NodeReport>().await?;
        Ok(report)
    }

    /// Read the serial link on a blocking thread: scan a bounded number
    /// of lines for the first JSON record carrying the sentinel field.
    async fn fetch_serial(&self) -> Result<NodeReport> {
        let path = self.serial_path.clone();
        let baud = self.serial_baud;

        let report = tokio::task::spawn_blocking(move || read_serial_report(&path, baud))
            .await
            .map_err(|e| Error::Internal(format!("serial task panicked: {}", e)))??;

        Ok(report)
    }
}

fn read_serial_report(path: &str, baud: u32) -> Result<NodeReport> {
    let port = serialport::new(path, baud)
        .timeout(Duration::from_secs(2))
        .open()
        .map_err(|e| Error::Serial(format!("open {}: {}", path, e)))?;

    let mut reader = BufReader::new(port);
    let mut line = String::new();

    for _ in 0..SERIAL_SCAN_LINES {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            // A quiet line is not fatal; keep scanning the remaining attempts
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => return Err(Error::Serial(format!("read {}: {}", path, e))),
        }

        if let Some(report) = parse_serial_line(&line) {
            return Ok(report);
        }
    }

    Err(Error::DeviceUnreachable(
        "sensor-node (no valid serial record)".to_string(),
    ))
}

/// Best-effort line scan: accept only lines that look like a JSON object
/// and carry the sentinel field; everything else is discarded.
fn parse_serial_line(line: &str) -> Option<NodeReport> {
    let line = line.trim();
    if !line.starts_with('{') || !line.contains(SERIAL_SENTINEL) {
        return None;
    }
    serde_json::from_str(line).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_normalizes_to_invariant() {
        let report: NodeReport = serde_json::from_str(
            r#"{
                "sht45": {"temperature": 24.3, "humidity": 55.1, "status": "ok"},
                "hdc3022": {"temperature": 99.0, "humidity": 12.0, "status": "invalid_range"},
                "sensor_count": 1
            }"#,
        )
        .unwrap();

        let readings = report.readings();
        let sht45 = &readings["sht45"];
        assert_eq!(sht45.status, SensorStatus::Ok);
        assert_eq!(sht45.temperature, Some(24.3));

        // Bad status strips the values even when the wire carried them
        let hdc3022 = &readings["hdc3022"];
        assert_eq!(hdc3022.status, SensorStatus::InvalidRange);
        assert!(hdc3022.temperature.is_none());
        assert!(hdc3022.humidity.is_none());
    }

    #[test]
    fn test_ok_without_values_downgrades_to_error() {
        let report: NodeReport = serde_json::from_str(
            r#"{"sht45": {"status": "ok"}, "hdc3022": {}, "sensor_count": 0}"#,
        )
        .unwrap();
        let readings = report.readings();
        assert_eq!(readings["sht45"].status, SensorStatus::Error);
        assert_eq!(readings["hdc3022"].status, SensorStatus::Disconnected);
    }

    #[test]
    fn test_serial_line_scan_discards_noise() {
        assert!(parse_serial_line("boot: sensors ready").is_none());
        assert!(parse_serial_line("{\"unrelated\": true}").is_none());

        let line = r#"{"sht45": {"temperature": 22.0, "humidity": 48.0, "status": "ok"}, "hdc3022": {"status": "disconnected"}, "sensor_count": 1}"#;
        let report = parse_serial_line(line).unwrap();
        assert_eq!(report.sensor_count, 1);
        assert_eq!(report.readings()["sht45"].status, SensorStatus::Ok);
    }

    #[test]
    fn test_serial_line_requires_object_start() {
        let line = r#"log sensor_count=2 {"x":1}"#;
        assert!(parse_serial_line(line).is_none());
    }
}
