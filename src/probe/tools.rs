//! Ad-hoc troubleshooting tools: one-shot latency measurement and an
//! HTTP-based port reachability check.

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use super::{PORT_CHECK_TIMEOUT, PROBE_TIMEOUT};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ToolError {
    #[error("invalid port number: {0}")]
    InvalidPort(u32),
}

/// Result of a one-shot latency measurement.
#[derive(Debug, Clone, Serialize)]
pub struct LatencyReport {
    pub elapsed_ms: f64,
    /// Scheme that answered ("https" or "http").
    pub scheme: String,
}

/// Result of a port reachability check.
#[derive(Debug, Clone, Serialize)]
pub struct PortCheckReport {
    pub port: u16,
    pub open: bool,
    /// Scheme that answered when the port looked open.
    pub scheme: Option<String>,
}

/// Measure round-trip latency to an address, HTTPS first then HTTP, each
/// attempt bounded by the standard probe timeout. `None` when both fail.
pub async fn measure_latency(client: &reqwest::Client, address: &str) -> Option<LatencyReport> {
    let start = Instant::now();
    for scheme in ["https", "http"] {
        let url = format!("{}://{}", scheme, address);
        if client
            .head(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .is_ok()
        {
            return Some(LatencyReport {
                elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
                scheme: scheme.to_string(),
            });
        }
    }
    None
}

/// Check whether a TCP port answers HTTP(S). Tries plain HTTP first, then
/// HTTPS, with a shorter per-attempt bound than the standard probe. Only
/// ports running an HTTP(S) service are detectable; anything else reports
/// closed-or-filtered.
pub async fn check_port(
    client: &reqwest::Client,
    address: &str,
    port: u32,
) -> Result<PortCheckReport, ToolError> {
    if port == 0 || port > 65535 {
        return Err(ToolError::InvalidPort(port));
    }
    let port = port as u16;

    for scheme in ["http", "https"] {
        let url = format!("{}://{}:{}", scheme, address, port);
        if client
            .head(&url)
            .timeout(PORT_CHECK_TIMEOUT)
            .send()
            .await
            .is_ok()
        {
            return Ok(PortCheckReport {
                port,
                open: true,
                scheme: Some(scheme.to_string()),
            });
        }
    }

    Ok(PortCheckReport {
        port,
        open: false,
        scheme: None,
    })
}
