//! Application configuration
//!
//! All settings are read from the environment once at startup and stay
//! fixed for the process lifetime. Endpoint lists are ordered: the most
//! likely address goes first and is retried every cycle.

use crate::endpoint::{Endpoint, EndpointProtocol};
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Ordered candidate endpoints for the air-sensor node
    pub node_endpoints: Vec<Endpoint>,
    /// Ordered candidate endpoints for the thermal camera
    pub camera_endpoints: Vec<Endpoint>,
    /// Per-endpoint attempt timeout
    pub attempt_timeout: Duration,
    /// Acquisition poll interval
    pub poll_interval: Duration,
    /// Persistence (CSV append + snapshot rewrite) interval
    pub persist_interval: Duration,
    /// Retention sweep period
    pub retention_sweep: Duration,
    /// Rows older than this many days are trimmed from the data log
    pub retention_days: i64,
    /// Data directory for CSV log and latest snapshot
    pub data_dir: PathBuf,
    /// Serial fallback device path
    pub serial_path: String,
    /// Serial fallback baud rate
    pub serial_baud: u32,
    /// HTTP API bind host
    pub host: String,
    /// HTTP API bind port
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self> {
        let node_endpoints = parse_endpoint_list(
            &std::env::var("NODE_ENDPOINTS").unwrap_or_else(|_| {
                "http://192.168.1.81:8080,http://192.168.1.150:8080,http://192.168.1.100:8080"
                    .to_string()
            }),
        )?;

        let camera_endpoints = parse_endpoint_list(
            &std::env::var("CAMERA_ENDPOINTS").unwrap_or_else(|_| {
                "tcam://192.168.1.130:5001,http://192.168.1.176:80,http://192.168.1.177:80"
                    .to_string()
            }),
        )?;

        Ok(Self {
            node_endpoints,
            camera_endpoints,
            attempt_timeout: Duration::from_secs(env_u64("ATTEMPT_TIMEOUT_SECS", 5)),
            poll_interval: Duration::from_secs(env_u64("POLL_INTERVAL_SECS", 5)),
            persist_interval: Duration::from_secs(env_u64("PERSIST_INTERVAL_SECS", 300)),
            retention_sweep: Duration::from_secs(env_u64("RETENTION_SWEEP_SECS", 86_400)),
            retention_days: env_u64("RETENTION_DAYS", 30) as i64,
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./greenhouse-data")),
            serial_path: std::env::var("SERIAL_PATH")
                .unwrap_or_else(|_| "/dev/ttyACM0".to_string()),
            serial_baud: env_u64("SERIAL_BAUD", 115_200) as u32,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_u64("PORT", 8080) as u16,
        })
    }

    /// Path of the append-only CSV log
    pub fn csv_path(&self) -> PathBuf {
        self.data_dir.join("precision_sensor_data.csv")
    }

    /// Path of the latest-snapshot JSON file
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("latest_precision_data.json")
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated list of `scheme://host:port` endpoints
pub fn parse_endpoint_list(raw: &str) -> Result<Vec<Endpoint>> {
    let mut endpoints = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        endpoints.push(parse_endpoint(entry)?);
    }
    if endpoints.is_empty() {
        return Err(Error::Config(format!("empty endpoint list: {:?}", raw)));
    }
    Ok(endpoints)
}

fn parse_endpoint(entry: &str) -> Result<Endpoint> {
    let (scheme, rest) = entry
        .split_once("://")
        .ok_or_else(|| Error::Config(format!("endpoint missing scheme: {:?}", entry)))?;

    let protocol = match scheme {
        "http" => EndpointProtocol::Http,
        "tcam" => EndpointProtocol::TcamSocket,
        other => {
            return Err(Error::Config(format!(
                "unknown endpoint scheme {:?} in {:?}",
                other, entry
            )))
        }
    };

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| Error::Config(format!("bad port in endpoint {:?}", entry)))?;
            (host.to_string(), port)
        }
        None => {
            let default_port = match protocol {
                EndpointProtocol::Http => 80,
                EndpointProtocol::TcamSocket => 5001,
            };
            (rest.to_string(), default_port)
        }
    };

    if host.is_empty() {
        return Err(Error::Config(format!("empty host in endpoint {:?}", entry)));
    }

    Ok(Endpoint {
        host,
        port,
        protocol,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_endpoint() {
        let ep = parse_endpoint("http://192.168.1.81:8080").unwrap();
        assert_eq!(ep.host, "192.168.1.81");
        assert_eq!(ep.port, 8080);
        assert_eq!(ep.protocol, EndpointProtocol::Http);
    }

    #[test]
    fn test_parse_tcam_endpoint_default_port() {
        let ep = parse_endpoint("tcam://192.168.1.130").unwrap();
        assert_eq!(ep.port, 5001);
        assert_eq!(ep.protocol, EndpointProtocol::TcamSocket);
    }

    #[test]
    fn test_parse_list_preserves_order() {
        let list = parse_endpoint_list("http://a:1, http://b:2,http://c:3").unwrap();
        let hosts: Vec<_> = list.iter().map(|e| e.host.as_str()).collect();
        assert_eq!(hosts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_rejects_unknown_scheme() {
        assert!(parse_endpoint("ftp://a:1").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_list() {
        assert!(parse_endpoint_list(" , ").is_err());
    }
}
