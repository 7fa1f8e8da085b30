//! Shared outbound proxy pool with per-endpoint health tracking.
//!
//! The pool is built once per process and handed to every fetcher. Health
//! counters only ever increase between resets, so concurrent requests update
//! them with relaxed atomics and selection works from an approximate view.

use jobscout_core::{CoreError, ProxyEndpoint, UpstreamError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ProxyPoolConfig {
    /// Failure rate above which an endpoint is excluded
    pub failure_threshold: f64,
    /// Requests an endpoint must have seen before it can be excluded
    pub min_samples: u64,
}

impl Default for ProxyPoolConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 0.5,
            min_samples: 5,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProxyHealth {
    requests: AtomicU64,
    total_time_ms: AtomicU64,
    failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub requests: u64,
    pub total_time_ms: u64,
    pub failures: u64,
}

impl HealthSnapshot {
    pub fn mean_latency_ms(&self) -> Option<u64> {
        (self.requests > 0).then(|| self.total_time_ms / self.requests)
    }

    pub fn failure_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failures as f64 / self.requests as f64
        }
    }
}

impl ProxyHealth {
    fn record(&self, elapsed: Duration, success: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
        if !success {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            total_time_ms: self.total_time_ms.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.total_time_ms.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug)]
pub struct ProxyPool {
    endpoints: Vec<ProxyEndpoint>,
    health: Vec<ProxyHealth>,
    config: ProxyPoolConfig,
}

impl ProxyPool {
    pub fn new(endpoints: Vec<ProxyEndpoint>, config: ProxyPoolConfig) -> Self {
        let health = endpoints.iter().map(|_| ProxyHealth::default()).collect();
        Self {
            endpoints,
            health,
            config,
        }
    }

    pub fn endpoints(&self) -> &[ProxyEndpoint] {
        &self.endpoints
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn health(&self, index: usize) -> Option<HealthSnapshot> {
        self.health.get(index).map(ProxyHealth::snapshot)
    }

    pub fn is_blacklisted(&self, index: usize) -> bool {
        self.health(index)
            .map(|h| {
                h.requests >= self.config.min_samples
                    && h.failure_rate() > self.config.failure_threshold
            })
            .unwrap_or(false)
    }

    /// Index of the endpoint to use next, or `None` to go direct.
    ///
    /// Endpoints nobody has measured yet are tried first (picked at random so
    /// concurrent callers spread out); after that the lowest mean latency wins.
    pub fn select(&self) -> Option<usize> {
        let candidates: Vec<(usize, HealthSnapshot)> = (0..self.endpoints.len())
            .filter(|&i| !self.is_blacklisted(i))
            .filter_map(|i| self.health(i).map(|h| (i, h)))
            .collect();

        let unsampled: Vec<usize> = candidates
            .iter()
            .filter(|(_, h)| h.requests == 0)
            .map(|(i, _)| *i)
            .collect();
        if !unsampled.is_empty() {
            return Some(unsampled[fastrand::usize(..unsampled.len())]);
        }

        let chosen = candidates
            .iter()
            .min_by_key(|(_, h)| h.mean_latency_ms().unwrap_or(u64::MAX))
            .map(|(i, _)| *i);

        if chosen.is_none() && !self.endpoints.is_empty() {
            debug!("All {} proxies are blacklisted, going direct", self.endpoints.len());
        }
        chosen
    }

    pub fn record(&self, index: usize, elapsed: Duration, success: bool) {
        if let Some(health) = self.health.get(index) {
            let was_blacklisted = self.is_blacklisted(index);
            health.record(elapsed, success);
            if !was_blacklisted && self.is_blacklisted(index) {
                if let Some(endpoint) = self.endpoints.get(index) {
                    warn!(
                        "Proxy {}:{} blacklisted ({:.0}% failures)",
                        endpoint.address,
                        endpoint.port,
                        self.health(index).map(|h| h.failure_rate()).unwrap_or(0.0) * 100.0
                    );
                }
            }
        }
    }

    pub fn reset(&self) {
        for health in &self.health {
            health.reset();
        }
    }
}

/// Parses a `host:port[:user:pass]` per line list, skipping blanks, comments
/// and lines that do not parse.
pub fn parse_proxy_list(text: &str) -> Vec<ProxyEndpoint> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let parsed = ProxyEndpoint::parse_line(line);
            if parsed.is_none() {
                debug!("Skipping unparsable proxy line {:?}", line);
            }
            parsed
        })
        .collect()
}

/// Downloads the proxy list once at startup.
pub async fn fetch_proxy_list(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<ProxyEndpoint>, CoreError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Rejected {
            status_code: status.as_u16(),
            resource: url.to_string(),
        }
        .into());
    }
    let endpoints = parse_proxy_list(&response.text().await?);
    info!("Fetched {} proxies from provider", endpoints.len());
    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> ProxyPool {
        let endpoints = (0..n)
            .map(|i| ProxyEndpoint {
                address: format!("10.0.0.{}", i + 1),
                port: 8080,
                credentials: None,
            })
            .collect();
        ProxyPool::new(endpoints, ProxyPoolConfig::default())
    }

    #[test]
    fn test_empty_pool_goes_direct() {
        assert_eq!(pool(0).select(), None);
    }

    #[test]
    fn test_prefers_lowest_latency() {
        let pool = pool(3);
        pool.record(0, Duration::from_millis(300), true);
        pool.record(1, Duration::from_millis(50), true);
        pool.record(2, Duration::from_millis(900), true);
        assert_eq!(pool.select(), Some(1));
    }

    #[test]
    fn test_unsampled_endpoints_are_tried_first() {
        let pool = pool(2);
        pool.record(0, Duration::from_millis(10), true);
        assert_eq!(pool.select(), Some(1));
    }

    #[test]
    fn test_blacklist_needs_minimum_samples() {
        let pool = pool(2);
        pool.record(1, Duration::from_millis(500), true);
        for _ in 0..4 {
            pool.record(0, Duration::from_millis(5), false);
        }
        assert!(!pool.is_blacklisted(0));

        pool.record(0, Duration::from_millis(5), false);
        assert!(pool.is_blacklisted(0));
        assert_eq!(pool.select(), Some(1));
    }

    #[test]
    fn test_all_blacklisted_goes_direct_until_reset() {
        let pool = pool(1);
        for _ in 0..5 {
            pool.record(0, Duration::from_millis(5), false);
        }
        assert_eq!(pool.select(), None);

        pool.reset();
        assert_eq!(pool.health(0).unwrap().requests, 0);
        assert_eq!(pool.select(), Some(0));
    }

    #[test]
    fn test_parse_proxy_list() {
        let list = "10.0.0.1:8080\n\n# comment\nbad line\n10.0.0.2:3128:user:pw\n";
        let endpoints = parse_proxy_list(list);
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[1].credentials.as_ref().unwrap().username, "user");
    }

    #[tokio::test]
    async fn test_fetch_proxy_list() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/proxies.txt")
            .with_status(200)
            .with_body("1.2.3.4:8000\n5.6.7.8:8001:u:p\n")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let endpoints = fetch_proxy_list(&client, &format!("{}/proxies.txt", server.url()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].url(), "http://1.2.3.4:8000");
    }
}
