use anyhow::Context;
use board_client::{fetch_proxy_list, ProxyPool, ProxyPoolConfig};
use jobscout_core::{AppConfig, ErrorExt};
use scrape_service::ScrapeService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting jobscout");

    let config = AppConfig::load().context("failed to load configuration")?;
    config.warn_missing_credentials();

    let proxies = proxy_pool(&config).await;
    let service = ScrapeService::new(config.clone(), proxies).context("failed to build scrapers")?;

    match config.schedule_interval_hours {
        Some(hours) => {
            let period = Duration::from_secs(hours * 3600);
            info!("Scraping every {}h", hours);
            tokio::select! {
                _ = service.run_periodic(period) => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
            }
        }
        None => {
            let report = service.run_once().await.map_err(|e| {
                e.log_error();
                anyhow::anyhow!(e.user_friendly_message())
            })?;
            info!(
                "Saved {} jobs ({} recent) to {}",
                report.total_jobs,
                report.recent_jobs,
                config.output_path.display()
            );
        }
    }

    Ok(())
}

/// Static proxies from the config plus the provider list, if one is set.
/// A provider failure only costs its share of the pool.
async fn proxy_pool(config: &AppConfig) -> Option<Arc<ProxyPool>> {
    let mut endpoints = config.proxies.clone();

    if let Some(url) = &config.proxy_list_url {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build();
        let fetched = match client {
            Ok(client) => fetch_proxy_list(&client, url).await,
            Err(e) => Err(e.into()),
        };
        match fetched {
            Ok(list) => endpoints.extend(list),
            Err(e) => warn!("Proxy list unavailable, continuing without it: {}", e),
        }
    }

    if endpoints.is_empty() {
        info!("No proxies configured, requests go direct");
        return None;
    }
    info!("Using {} proxies", endpoints.len());
    Some(Arc::new(ProxyPool::new(endpoints, ProxyPoolConfig::default())))
}
