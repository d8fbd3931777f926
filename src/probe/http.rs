//! HTTP HEAD reachability prober.

use std::time::Duration;

use super::{Outcome, Prober};

/// Production prober: HEAD `https://{address}`, falling back to
/// `http://{address}` with the same timeout. No retries beyond the scheme
/// fallback and no backoff; every poll cycle is a fresh attempt.
#[derive(Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self, reqwest::Error> {
        // Per-request timeouts; the client itself carries none so the same
        // instance can serve probes with different bounds.
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    /// The underlying client, shared with the troubleshooting tools.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Prober for HttpProber {
    fn probe(&self, address: &str, timeout: Duration) -> impl std::future::Future<Output = Outcome> + Send {
        let client = self.client.clone();
        let address = address.to_string();
        async move {
            // Jitter to avoid a thundering herd when a cycle fans out.
            let jitter = rand::random::<u64>() % 100;
            tokio::time::sleep(Duration::from_millis(jitter)).await;

            for scheme in ["https", "http"] {
                let url = format!("{}://{}", scheme, address);
                // Any response counts, whatever its status code; every
                // failure mode collapses into trying the next scheme.
                if client.head(&url).timeout(timeout).send().await.is_ok() {
                    tracing::trace!("probe {} reachable via {}", address, scheme);
                    return Outcome::Reachable;
                }
            }

            tracing::trace!("probe {} unreachable", address);
            Outcome::Unreachable
        }
    }
}
