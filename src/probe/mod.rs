//! Reachability probing.
//!
//! A probe is an HTTP HEAD request used as a stand-in for ping. The source
//! environment cannot open raw sockets, so "reachable" is defined strictly
//! as "answered an HTTP(S) request within the timeout": any response at all
//! counts as reachable, and DNS failure, connection refusal, TLS errors and
//! timeouts all collapse into the single Unreachable outcome. This is a
//! documented limitation of the probing semantic: a host can be up and
//! still probe Unreachable if nothing on it answers HTTP.

mod http;
mod tools;

pub use http::HttpProber;
pub use tools::{check_port, measure_latency, LatencyReport, PortCheckReport, ToolError};

use std::future::Future;
use std::time::Duration;

/// Standard per-attempt probe timeout.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Shorter per-attempt bound for the port-reachability tool.
pub const PORT_CHECK_TIMEOUT: Duration = Duration::from_millis(2500);

/// The binary result of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Reachable,
    Unreachable,
}

/// One bounded-time reachability check against a single address.
///
/// The trait is the seam between the scheduler and the network; tests swap
/// in stub probers with scripted outcomes.
pub trait Prober: Clone + Send + Sync + 'static {
    fn probe(&self, address: &str, timeout: Duration) -> impl Future<Output = Outcome> + Send;
}
