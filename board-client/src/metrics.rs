use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// Aggregate request statistics for one fetcher (one platform or provider).
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rate_limited_requests: u64,
    pub proxied_requests: u64,
    pub total_response_time: Duration,
    pub last_request_time: Option<SystemTime>,
    pub requests_by_operation: BTreeMap<String, OperationMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationMetrics {
    pub request_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub total_response_time: Duration,
    pub min_response_time: Duration,
    pub max_response_time: Duration,
    pub errors_by_type: BTreeMap<String, u64>,
}

/// One completed HTTP exchange, successful or not.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    pub operation: String,
    pub method: String,
    pub status_code: Option<u16>,
    pub response_time: Duration,
    pub success: bool,
    pub rate_limited: bool,
    pub proxied: bool,
    pub error_type: Option<String>,
}

impl OperationMetrics {
    fn new() -> Self {
        Self {
            request_count: 0,
            success_count: 0,
            error_count: 0,
            total_response_time: Duration::ZERO,
            min_response_time: Duration::MAX,
            max_response_time: Duration::ZERO,
            errors_by_type: BTreeMap::new(),
        }
    }

    fn update(&mut self, metrics: &RequestMetrics) {
        self.request_count += 1;
        self.total_response_time += metrics.response_time;
        self.min_response_time = self.min_response_time.min(metrics.response_time);
        self.max_response_time = self.max_response_time.max(metrics.response_time);

        if metrics.success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
            let kind = metrics.error_type.as_deref().unwrap_or("unknown");
            *self.errors_by_type.entry(kind.to_string()).or_default() += 1;
        }
    }

    pub fn average_response_time(&self) -> Duration {
        if self.request_count == 0 {
            Duration::ZERO
        } else {
            self.total_response_time / self.request_count as u32
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.request_count as f64
        }
    }
}

impl FetchMetrics {
    pub fn average_response_time(&self) -> Duration {
        if self.total_requests == 0 {
            Duration::ZERO
        } else {
            self.total_response_time / self.total_requests as u32
        }
    }

    /// One-line digest for run logs.
    pub fn summary(&self) -> String {
        format!(
            "{} requests ({} ok, {} failed, {} rate limited, {} proxied), avg {:?}",
            self.total_requests,
            self.successful_requests,
            self.failed_requests,
            self.rate_limited_requests,
            self.proxied_requests,
            self.average_response_time()
        )
    }
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<FetchMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_request(&self, request_metrics: RequestMetrics) {
        let mut metrics = self.metrics.write().await;

        metrics.total_requests += 1;
        metrics.last_request_time = Some(SystemTime::now());
        metrics.total_response_time += request_metrics.response_time;

        if request_metrics.success {
            metrics.successful_requests += 1;
        } else {
            metrics.failed_requests += 1;
        }
        if request_metrics.rate_limited {
            metrics.rate_limited_requests += 1;
        }
        if request_metrics.proxied {
            metrics.proxied_requests += 1;
        }

        metrics
            .requests_by_operation
            .entry(request_metrics.operation.clone())
            .or_insert_with(OperationMetrics::new)
            .update(&request_metrics);
    }

    pub async fn get_metrics(&self) -> FetchMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn get_operation_metrics(&self, operation: &str) -> Option<OperationMetrics> {
        self.metrics
            .read()
            .await
            .requests_by_operation
            .get(operation)
            .cloned()
    }

    pub async fn reset_metrics(&self) {
        *self.metrics.write().await = FetchMetrics::default();
    }

    pub async fn export_metrics(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.get_metrics().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(operation: &str, success: bool, millis: u64) -> RequestMetrics {
        RequestMetrics {
            operation: operation.to_string(),
            method: "GET".to_string(),
            status_code: Some(if success { 200 } else { 503 }),
            response_time: Duration::from_millis(millis),
            success,
            rate_limited: false,
            proxied: false,
            error_type: (!success).then(|| "server_error".to_string()),
        }
    }

    #[tokio::test]
    async fn test_metrics_collection() {
        let collector = MetricsCollector::new();
        collector.record_request(sample("greenhouse.list", true, 150)).await;
        collector.record_request(sample("greenhouse.list", false, 50)).await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.average_response_time(), Duration::from_millis(100));
        assert!(metrics.summary().starts_with("2 requests"));
    }

    #[tokio::test]
    async fn test_operation_metrics() {
        let collector = MetricsCollector::new();
        collector.record_request(sample("lever.detail", true, 100)).await;
        collector.record_request(sample("lever.detail", false, 300)).await;

        let op = collector.get_operation_metrics("lever.detail").await.unwrap();
        assert_eq!(op.request_count, 2);
        assert_eq!(op.min_response_time, Duration::from_millis(100));
        assert_eq!(op.max_response_time, Duration::from_millis(300));
        assert_eq!(op.success_rate(), 0.5);
        assert_eq!(op.errors_by_type.get("server_error"), Some(&1));

        assert!(collector.get_operation_metrics("lever.list").await.is_none());
    }

    #[tokio::test]
    async fn test_export_and_reset() {
        let collector = MetricsCollector::new();
        collector.record_request(sample("ashby.list", true, 10)).await;

        let exported = collector.export_metrics().await.unwrap();
        assert!(exported.contains("total_requests"));
        assert!(exported.contains("ashby.list"));

        collector.reset_metrics().await;
        assert_eq!(collector.get_metrics().await.total_requests, 0);
    }
}
