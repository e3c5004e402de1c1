//! Endpoint Resolver
//!
//! ## Responsibilities
//!
//! - Hold the ordered candidate address list for a logical device
//! - Try each candidate in order with a per-attempt timeout
//! - Return the first success together with the endpoint that answered
//!
//! Resolution performs no caching: every poll cycle restarts from the
//! head of the list, so a device that moved addresses is found again at
//! the cost of re-trying dead addresses each cycle.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Wire protocol spoken at an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointProtocol {
    /// HTTP/JSON request-response
    Http,
    /// tCam framed-socket image protocol (0x02/0x03 delimited JSON)
    TcamSocket,
}

/// A single candidate address for a logical device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub protocol: EndpointProtocol,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.protocol {
            EndpointProtocol::Http => "http",
            EndpointProtocol::TcamSocket => "tcam",
        };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Try each endpoint in order; return the first success and the endpoint
/// that produced it.
///
/// Individual attempt failures (timeout, refusal, malformed response) are
/// logged and swallowed; only exhaustion of the whole list surfaces as
/// `Error::DeviceUnreachable`.
pub async fn resolve_first<T, F, Fut>(
    device: &str,
    endpoints: &[Endpoint],
    per_attempt: Duration,
    attempt: F,
) -> Result<(T, Endpoint)>
where
    F: Fn(Endpoint) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for endpoint in endpoints {
        match timeout(per_attempt, attempt(endpoint.clone())).await {
            Ok(Ok(value)) => {
                tracing::debug!(device = %device, endpoint = %endpoint, "Endpoint answered");
                return Ok((value, endpoint.clone()));
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    device = %device,
                    endpoint = %endpoint,
                    error = %e,
                    "Endpoint attempt failed"
                );
            }
            Err(_) => {
                tracing::warn!(
                    device = %device,
                    endpoint = %endpoint,
                    timeout_ms = per_attempt.as_millis() as u64,
                    "Endpoint attempt timed out"
                );
            }
        }
    }

    Err(Error::DeviceUnreachable(device.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ep(host: &str) -> Endpoint {
        Endpoint {
            host: host.to_string(),
            port: 8080,
            protocol: EndpointProtocol::Http,
        }
    }

    #[tokio::test]
    async fn test_first_success_wins_and_later_endpoints_untried() {
        let endpoints = vec![ep("a"), ep("b"), ep("c"), ep("d")];
        let attempts = AtomicUsize::new(0);

        let (value, winner) = resolve_first(
            "test-device",
            &endpoints,
            Duration::from_millis(100),
            |endpoint| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if endpoint.host == "c" {
                        Ok(endpoint.host.clone())
                    } else {
                        Err(Error::Endpoint {
                            endpoint: endpoint.to_string(),
                            message: "refused".to_string(),
                        })
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, "c");
        assert_eq!(winner.host, "c");
        // a and b failed, c succeeded, d never attempted
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_device_unreachable() {
        let endpoints = vec![ep("a"), ep("b")];

        let result: Result<((), Endpoint)> = resolve_first(
            "test-device",
            &endpoints,
            Duration::from_millis(100),
            |endpoint| async move {
                Err(Error::Endpoint {
                    endpoint: endpoint.to_string(),
                    message: "down".to_string(),
                })
            },
        )
        .await;

        assert!(matches!(result, Err(Error::DeviceUnreachable(_))));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out_and_next_is_tried() {
        let endpoints = vec![ep("slow"), ep("fast")];

        let (value, winner) = resolve_first(
            "test-device",
            &endpoints,
            Duration::from_millis(50),
            |endpoint| async move {
                if endpoint.host == "slow" {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
                Ok(endpoint.host.clone())
            },
        )
        .await
        .unwrap();

        assert_eq!(value, "fast");
        assert_eq!(winner.host, "fast");
    }
}
