pub mod adapter;
pub mod driver;
pub mod extract;
pub mod http;
pub mod metrics;
pub mod platforms;
pub mod proxy;
pub mod rate_limiter;
pub mod retry;
pub mod search;

#[cfg(test)]
mod tests;

pub use adapter::{
    normalize, normalize_timestamp, PlatformAdapter, PostingFields, RawDetail, RawListing,
    ScrapeLimits,
};
pub use driver::scrape_organizations;
pub use extract::{extract_org, unique_organizations};
pub use http::{HttpConfig, HttpFetcher};
pub use metrics::{FetchMetrics, MetricsCollector};
pub use platforms::{
    build_adapter, AshbyAdapter, GreenhouseAdapter, LeverAdapter, WorkableAdapter,
};
pub use proxy::{fetch_proxy_list, ProxyPool, ProxyPoolConfig};
pub use search::SearchClient;
