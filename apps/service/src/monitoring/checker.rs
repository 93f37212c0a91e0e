use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tokio::time::timeout;
use url::Url;

use super::types::ProbeResult;

/// Hard per-probe timeout when the caller does not override it
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A single bounded-timeout health check against one endpoint.
///
/// Probers are pure with respect to engine state: the network call is the
/// only side effect, and the outcome is returned for the caller to apply.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn check(&self, url: &str, probe_timeout: Duration) -> ProbeResult;
}

/// HTTP/HTTPS prober
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// The client carries no timeout of its own; the hard deadline is
    /// enforced per probe so a shared-client setting can never widen it.
    pub fn new() -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }
}

/// Rewrite the literal host token `localhost` to its IPv4 loopback address,
/// avoiding dual-stack resolution stalls. Only the host token is touched;
/// `localhost` in a path or query survives.
fn rewrite_localhost(url: &mut Url) {
    if url.host_str() == Some("localhost") {
        // set_host cannot fail for http(s) URLs
        let _ = url.set_host(Some("127.0.0.1"));
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn check(&self, raw_url: &str, probe_timeout: Duration) -> ProbeResult {
        let mut url = match Url::parse(raw_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(_) | Err(_) => return ProbeResult::down(format!("Invalid URL: {raw_url}")),
        };
        rewrite_localhost(&mut url);

        match timeout(probe_timeout, self.client.get(url).send()).await {
            // Any 2xx response is healthy
            Ok(Ok(response)) if response.status().is_success() => ProbeResult::up(),
            Ok(Ok(response)) => ProbeResult::down(format!("HTTP {}", response.status())),
            Ok(Err(error)) => ProbeResult::down(format!("Request failed: {error}")),
            Err(_) => {
                ProbeResult::down(format!("Timed out after {}s", probe_timeout.as_secs()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::Prober;
    use crate::monitoring::types::ProbeResult;

    /// Scripted prober for engine tests: URLs marked up succeed, everything
    /// else fails, and every call is counted.
    pub struct FakeProber {
        up: Mutex<HashSet<String>>,
        calls: AtomicUsize,
    }

    impl FakeProber {
        pub fn new() -> Self {
            Self { up: Mutex::new(HashSet::new()), calls: AtomicUsize::new(0) }
        }

        pub fn mark_up(&self, url: &str) {
            self.up.lock().unwrap().insert(url.to_string());
        }

        pub fn mark_down(&self, url: &str) {
            self.up.lock().unwrap().remove(url);
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Prober for FakeProber {
        async fn check(&self, url: &str, _probe_timeout: Duration) -> ProbeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.up.lock().unwrap().contains(url) {
                ProbeResult::up()
            } else {
                ProbeResult::down("connection refused")
            }
        }
    }
}
