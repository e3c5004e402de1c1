//! Thermal-Camera Client
//!
//! ## Responsibilities
//!
//! - Retrieve a thermal observation through the endpoint resolver
//! - Speak the tCam framed-socket image protocol (preferred)
//! - Fall back to the camera's HTTP raw-pixel and pre-aggregated endpoints
//!
//! Socket protocol: a request is a JSON object wrapped in a 0x02 start
//! byte and 0x03 end byte. Frame sizes are not announced, so the client
//! reads until it sees the end delimiter. The response JSON carries the
//! raw 16-bit pixel buffer base64-encoded in the `radiometric` field.

use crate::endpoint::{resolve_first, Endpoint, EndpointProtocol};
use crate::error::{Error, Result};
use crate::thermal::{ThermalFrame, ThermalSource, ThermalStatistics};
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const FRAME_START: u8 = 0x02;
const FRAME_END: u8 = 0x03;

/// Upper bound on a framed response; a full base64 frame is ~51 KiB
const MAX_RESPONSE_BYTES: usize = 256 * 1024;

/// What one camera poll produced, before reduction to statistics
#[derive(Debug, Clone)]
pub enum CameraObservation {
    /// Raw radiometric frame from the socket protocol
    Frame(ThermalFrame),
    /// Celsius samples from the raw-pixel HTTP endpoint
    Samples(Vec<f64>),
    /// The camera's own pre-aggregated statistics
    Precomputed(ThermalStatistics),
}

impl CameraObservation {
    /// Reduce to statistics, filtering faulty pixels where raw data is
    /// available.
    pub fn into_statistics(self) -> ThermalStatistics {
        match self {
            CameraObservation::Frame(frame) => {
                ThermalStatistics::compute(&frame.to_celsius(), ThermalSource::RawSocket)
            }
            CameraObservation::Samples(samples) => {
                ThermalStatistics::compute(&samples, ThermalSource::RawHttp)
            }
            CameraObservation::Precomputed(stats) => stats,
        }
    }
}

/// tCam socket image response
#[derive(Debug, Deserialize)]
struct TcamImageResponse {
    radiometric: Option<String>,
}

/// `/thermal_raw` response shape
#[derive(Debug, Deserialize)]
struct ThermalRawResponse {
    #[serde(default)]
    pixels: Vec<f64>,
}

/// `/thermal_data` pre-aggregated response shape
#[derive(Debug, Deserialize)]
struct ThermalDataResponse {
    #[serde(rename = "minTemp")]
    min_temp: Option<f64>,
    #[serde(rename = "maxTemp")]
    max_temp: Option<f64>,
    #[serde(rename = "meanTemp")]
    mean_temp: Option<f64>,
    #[serde(rename = "modeTemp")]
    mode_temp: Option<f64>,
    #[serde(rename = "medianTemp")]
    median_temp: Option<f64>,
}

/// Thermal-camera transport client
pub struct ThermalClient {
    http: reqwest::Client,
    endpoints: Vec<Endpoint>,
    attempt_timeout: Duration,
}

impl ThermalClient {
    pub fn new(endpoints: Vec<Endpoint>, attempt_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints,
            attempt_timeout,
        }
    }

    /// Poll the camera through the ordered endpoint list
    pub async fn poll(&self) -> Result<CameraObservation> {
        let (observation, endpoint) = resolve_first(
            "thermal-camera",
            &self.endpoints,
            self.attempt_timeout,
            |endpoint| self.fetch(endpoint),
        )
        .await?;

        tracing::info!(endpoint = %endpoint, "Thermal camera polled");
        Ok(observation)
    }

    async fn fetch(&self, endpoint: Endpoint) -> Result<CameraObservation> {
        match endpoint.protocol {
            EndpointProtocol::TcamSocket => self.fetch_socket_frame(&endpoint).await,
            EndpointProtocol::Http => self.fetch_http(&endpoint).await,
        }
    }

    /// Request one radiometric frame over the framed-socket protocol
    async fn fetch_socket_frame(&self, endpoint: &Endpoint) -> Result<CameraObservation> {
        let addr = format!("{}:{}", endpoint.host, endpoint.port);
        let mut stream = TcpStream::connect(&addr).await.map_err(|e| Error::Endpoint {
            endpoint: endpoint.to_string(),
            message: format!("connect: {}", e),
        })?;

        let mut request = vec![FRAME_START];
        request.extend_from_slice(br#"{"cmd":"get_image"}"#);
        request.push(FRAME_END);
        stream.write_all(&request).await.map_err(|e| Error::Endpoint {
            endpoint: endpoint.to_string(),
            message: format!("send: {}", e),
        })?;

        let body = read_framed_response(&mut stream, endpoint).await?;
        let response: TcamImageResponse = serde_json::from_slice(&body)?;

        let radiometric = response
            .radiometric
            .ok_or_else(|| Error::Decode("image response missing radiometric field".to_string()))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(radiometric.as_bytes())
            .map_err(|e| Error::Decode(format!("radiometric base64: {}", e)))?;

        Ok(CameraObservation::Frame(ThermalFrame::from_le_bytes(
            &bytes,
        )?))
    }

    /// HTTP path: raw pixels preferred (enables local filtering), the
    /// camera's pre-aggregated statistics as a last resort.
    async fn fetch_http(&self, endpoint: &Endpoint) -> Result<CameraObservation> {
        match self.fetch_raw_pixels(endpoint).await {
            Ok(observation) => Ok(observation),
            Err(e) => {
                tracing::debug!(
                    endpoint = %endpoint,
                    error = %e,
                    "Raw pixels unavailable, trying pre-aggregated stats"
                );
                self.fetch_precomputed(endpoint).await
            }
        }
    }

    async fn fetch_raw_pixels(&self, endpoint: &Endpoint) -> Result<CameraObservation> {
        let url = format!("http://{}:{}/thermal_raw", endpoint.host, endpoint.port);
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

        let raw = response.json::<ThermalRawResponse>().await?;
        if raw.pixels.is_empty() {
            return Err(Error::Decode("thermal_raw returned no pixels".to_string()));
        }

        Ok(CameraObservation::Samples(raw.pixels))
    }

    async fn fetch_precomputed(&self, endpoint: &Endpoint) -> Result<CameraObservation> {
        let url = format!("http://{}:{}/thermal_data", endpoint.host, endpoint.port);
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

        let data = response.json::<ThermalDataResponse>().await?;
        Ok(CameraObservation::Precomputed(precomputed_stats(data)))
    }
}

/// Read until the end delimiter, then strip the framing bytes
async fn read_framed_response(stream: &mut TcpStream, endpoint: &Endpoint) -> Result<Vec<u8>> {
    let mut response = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = stream.read(&mut chunk).await.map_err(|e| Error::Endpoint {
            endpoint: endpoint.to_string(),
            message: format!("recv: {}", e),
        })?;
        if n == 0 {
            break;
        }
        response.extend_from_slice(&chunk[..n]);
        if chunk[..n].contains(&FRAME_END) {
            break;
        }
        if response.len() > MAX_RESPONSE_BYTES {
            return Err(Error::Decode(format!(
                "framed response exceeded {} bytes",
                MAX_RESPONSE_BYTES
            )));
        }
    }

    Ok(strip_frame_delimiters(&response).to_vec())
}

fn strip_frame_delimiters(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| b != FRAME_START)
        .unwrap_or(bytes.len());
    let end = bytes[start..]
        .iter()
        .position(|&b| b == FRAME_END)
        .map(|i| start + i)
        .unwrap_or(bytes.len());
    &bytes[start..end]
}

/// Map the camera's pre-aggregated fields, nulling negatives: without
/// raw pixels a negative aggregate means faulty input that cannot be
/// filtered here.
fn precomputed_stats(data: ThermalDataResponse) -> ThermalStatistics {
    let sanitize = |field: &str, value: Option<f64>| match value {
        Some(v) if v < 0.0 => {
            tracing::warn!(field = field, value = v, "Negative pre-aggregated temperature dropped");
            None
        }
        other => other,
    };

    ThermalStatistics {
        min: sanitize("minTemp", data.min_temp),
        max: sanitize("maxTemp", data.max_temp),
        mean: sanitize("meanTemp", data.mean_temp),
        median: sanitize("medianTemp", data.median_temp),
        mode: sanitize("modeTemp", data.mode_temp),
        std_dev: None,
        total_pixels: 0,
        filtered_pixels: 0,
        source: ThermalSource::Precomputed,
    }
}
