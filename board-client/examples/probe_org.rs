//! Scrapes a single organization and prints the normalized postings.
//!
//!     cargo run -p board-client --example probe_org -- greenhouse acme

use board_client::{build_adapter, PlatformAdapter, ScrapeLimits};
use jobscout_core::{AppConfig, Platform};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,board_client=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(platform), Some(org)) = (args.next(), args.next()) else {
        eprintln!("usage: probe_org <ashby|greenhouse|lever|workable> <organization>");
        std::process::exit(2);
    };

    let platform: Platform = match serde_json::from_value(serde_json::json!(platform)) {
        Ok(platform) => platform,
        Err(_) => {
            eprintln!("unknown platform {:?}", platform);
            std::process::exit(2);
        }
    };

    let config = AppConfig::default();
    let adapter = match build_adapter(platform, &config, None) {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Could not build {} adapter: {}", platform, e);
            std::process::exit(1);
        }
    };

    let mut jobs = Vec::new();
    adapter
        .scrape(&[org.clone()], &ScrapeLimits::from_config(&config), &mut jobs)
        .await;

    info!("{} postings for {}/{}", jobs.len(), platform, org);
    for job in &jobs {
        println!("{}\t{}\t{}\t{}", job.id, job.title, job.location_name, job.url);
    }

    if let Some(fetcher) = adapter.fetcher() {
        info!("{}", fetcher.metrics().get_metrics().await.summary());
    }
}
