use crate::metrics::{MetricsCollector, RequestMetrics};
use crate::proxy::ProxyPool;
use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::retry::{RetryConfig, RetryExecutor};
use jobscout_core::{AppConfig, CoreError, UpstreamError};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
}

impl HttpConfig {
    pub fn job_board(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout_secs),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::job_board(config.max_retries),
            rate_limit: RateLimitConfig::job_board(config.worker_pool_size),
        }
    }

    pub fn search_provider(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout_secs),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::job_board(config.max_retries),
            rate_limit: RateLimitConfig::search_provider(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::job_board(&AppConfig::default())
    }
}

#[derive(Debug)]
struct RequestSpec<'a> {
    method: Method,
    url: &'a str,
    query: &'a [(&'a str, &'a str)],
    body: Option<&'a serde_json::Value>,
    headers: &'a [(&'a str, &'a str)],
}

/// Rate-limited, retried HTTP access to one upstream service.
///
/// Each attempt picks a proxy from the shared pool (or goes direct), records
/// its outcome back into the pool, and lands in the fetcher's metrics.
#[derive(Debug)]
pub struct HttpFetcher {
    label: String,
    direct: Client,
    proxied: Vec<Client>,
    proxies: Option<Arc<ProxyPool>>,
    rate_limiter: RateLimiter,
    retry: RetryExecutor,
    metrics: MetricsCollector,
}

impl HttpFetcher {
    pub fn new(
        label: impl Into<String>,
        config: HttpConfig,
        proxies: Option<Arc<ProxyPool>>,
    ) -> Result<Self, CoreError> {
        let label = label.into();
        let direct = build_client(&config, None)?;

        let mut proxied = Vec::new();
        if let Some(pool) = &proxies {
            for endpoint in pool.endpoints() {
                let mut proxy = reqwest::Proxy::all(endpoint.url())?;
                if let Some(credentials) = &endpoint.credentials {
                    proxy = proxy.basic_auth(&credentials.username, &credentials.password);
                }
                proxied.push(build_client(&config, Some(proxy))?);
            }
        }

        Ok(Self {
            retry: RetryExecutor::new(label.clone(), config.retry),
            rate_limiter: RateLimiter::new(config.rate_limit),
            metrics: MetricsCollector::new(),
            label,
            direct,
            proxied,
            proxies,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CoreError> {
        let spec = RequestSpec {
            method: Method::GET,
            url,
            query,
            body: None,
            headers: &[],
        };
        let body = self.execute(operation, &spec).await?;
        parse_json(operation, &body)
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<T, CoreError> {
        let spec = RequestSpec {
            method: Method::POST,
            url,
            query: &[],
            body: Some(body),
            headers,
        };
        let body = self.execute(operation, &spec).await?;
        parse_json(operation, &body)
    }

    pub async fn get_text(&self, operation: &str, url: &str) -> Result<String, CoreError> {
        let spec = RequestSpec {
            method: Method::GET,
            url,
            query: &[],
            body: None,
            headers: &[],
        };
        self.execute(operation, &spec).await
    }

    async fn execute(&self, operation: &str, spec: &RequestSpec<'_>) -> Result<String, CoreError> {
        let name = format!("{}.{}", self.label, operation);
        self.retry
            .execute(&name, move || self.send_once(operation, spec))
            .await
    }

    async fn send_once(&self, operation: &str, spec: &RequestSpec<'_>) -> Result<String, CoreError> {
        let _permit = self.rate_limiter.acquire_permit().await?;

        let proxy_index = self.proxies.as_ref().and_then(|pool| pool.select());
        let client = proxy_index
            .and_then(|i| self.proxied.get(i))
            .unwrap_or(&self.direct);

        let mut request = client.request(spec.method.clone(), spec.url);
        if !spec.query.is_empty() {
            request = request.query(spec.query);
        }
        for (name, value) in spec.headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = spec.body {
            request = request.json(body);
        }

        debug!("{} {} {}", spec.method, self.label, operation);
        let start_time = Instant::now();
        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let body = match classify_status(status, response.headers(), spec.url) {
                    Ok(()) => response.text().await.map_err(transport_error),
                    Err(e) => Err(e),
                };
                body.map_err(|e| (Some(status.as_u16()), e))
            }
            Err(e) => Err((None, transport_error(e))),
        };
        let response_time = start_time.elapsed();

        if let (Some(index), Some(pool)) = (proxy_index, &self.proxies) {
            let proxy_ok = match &outcome {
                Ok(_) => true,
                Err((status, _)) => status.is_some_and(|s| s != 407 && s != 429),
            };
            pool.record(index, response_time, proxy_ok);
        }

        let (status_code, error_type, rate_limited) = match &outcome {
            Ok(_) => (Some(200), None, false),
            Err((status, e)) => (
                *status,
                Some(error_type(e)),
                matches!(e, CoreError::Upstream(UpstreamError::RateLimitExceeded { .. })),
            ),
        };
        self.metrics
            .record_request(RequestMetrics {
                operation: operation.to_string(),
                method: spec.method.to_string(),
                status_code,
                response_time,
                success: outcome.is_ok(),
                rate_limited,
                proxied: proxy_index.is_some(),
                error_type,
            })
            .await;

        outcome.map_err(|(_, e)| e)
    }
}

fn build_client(config: &HttpConfig, proxy: Option<reqwest::Proxy>) -> Result<Client, CoreError> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout);
    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }
    Ok(builder.build()?)
}

/// Maps a non-success status to the upstream error taxonomy.
fn classify_status(
    status: StatusCode,
    headers: &reqwest::header::HeaderMap,
    url: &str,
) -> Result<(), CoreError> {
    if status.is_success() {
        return Ok(());
    }

    let resource = resource_path(url);
    let error = match status.as_u16() {
        429 => {
            let retry_after = headers
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!("Rate limited on {}, retry after {}s", resource, retry_after);
            UpstreamError::RateLimitExceeded { retry_after }
        }
        401 | 403 => UpstreamError::Forbidden { resource },
        404 | 410 => UpstreamError::NotFound { resource },
        code if status.is_server_error() => UpstreamError::ServerError { status_code: code },
        code => UpstreamError::Rejected {
            status_code: code,
            resource,
        },
    };
    Err(error.into())
}

fn transport_error(e: reqwest::Error) -> CoreError {
    // The query string may carry an API key.
    let e = e.without_url();
    if e.is_timeout() {
        UpstreamError::RequestTimeout.into()
    } else if e.is_connect() {
        UpstreamError::ConnectionFailed {
            reason: e.to_string(),
        }
        .into()
    } else {
        CoreError::Network(e)
    }
}

fn parse_json<T: DeserializeOwned>(operation: &str, body: &str) -> Result<T, CoreError> {
    serde_json::from_str(body).map_err(|e| {
        UpstreamError::InvalidResponse {
            details: format!("{}: {}", operation, e),
        }
        .into()
    })
}

/// URL path without the query string, for error messages and logs.
fn resource_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split('?').next().unwrap_or_default().to_string(),
    }
}

fn error_type(error: &CoreError) -> String {
    use jobscout_core::ErrorExt;
    match error {
        CoreError::Upstream(upstream) => upstream.error_code().to_lowercase(),
        other => other.error_code().to_lowercase(),
    }
}
