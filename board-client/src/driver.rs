use crate::adapter::{normalize, PlatformAdapter, RawDetail, RawListing, ScrapeLimits};
use futures::{stream, FutureExt, StreamExt};
use jobscout_core::JobPosting;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Scrapes every organization with at most `worker_pool_size` in flight.
///
/// Each organization settles independently: a failed listing yields no jobs
/// for that organization only, and a panic inside one organization's work is
/// caught and logged without touching its siblings. Output is unique on
/// `(source, organization, id)`.
pub async fn scrape_organizations<A>(
    adapter: &A,
    orgs: &[String],
    limits: &ScrapeLimits,
) -> Vec<JobPosting>
where
    A: PlatformAdapter + ?Sized,
{
    let platform = adapter.platform();
    info!("[{}] Scraping {} organizations", platform, orgs.len());

    let settled: Vec<(String, Result<Vec<JobPosting>, Box<dyn Any + Send>>)> =
        stream::iter(orgs.to_vec())
            .map(|org| async move {
                let outcome = AssertUnwindSafe(scrape_organization(adapter, &org, limits))
                    .catch_unwind()
                    .await;
                (org, outcome)
            })
            .buffer_unordered(limits.worker_pool_size.max(1))
            .collect()
            .await;

    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for (org, outcome) in settled {
        match outcome {
            Ok(org_jobs) => {
                debug!("[{}] {} -> {} jobs", platform, org, org_jobs.len());
                for job in org_jobs {
                    let key = (job.source, job.organization.clone(), job.id.clone());
                    if seen.insert(key) {
                        jobs.push(job);
                    }
                }
            }
            Err(panic) => error!(
                "[{}] Scraping {} panicked: {}",
                platform,
                org,
                panic_message(panic.as_ref())
            ),
        }
    }

    info!("[{}] Scraped {} jobs", platform, jobs.len());
    jobs
}

async fn scrape_organization<A>(adapter: &A, org: &str, limits: &ScrapeLimits) -> Vec<JobPosting>
where
    A: PlatformAdapter + ?Sized,
{
    let listings = adapter.list_postings(org).await;
    if listings.is_empty() {
        return Vec::new();
    }
    debug!("[{}] {} lists {} postings", adapter.platform(), org, listings.len());

    let pairs: Vec<(RawListing, Option<RawDetail>)> = if adapter.requires_detail() {
        stream::iter(listings)
            .map(|listing| async move {
                if !limits.detail_delay.is_zero() {
                    sleep(limits.detail_delay).await;
                }
                let detail = adapter.fetch_detail(org, &listing).await;
                (listing, detail)
            })
            .buffer_unordered(limits.detail_concurrency.max(1))
            .collect()
            .await
    } else {
        listings.into_iter().map(|listing| (listing, None)).collect()
    };

    let organization = adapter.organization_name(org);
    pairs
        .into_iter()
        .filter_map(|(listing, detail)| {
            let url = adapter.posting_url(org, &listing);
            normalize(adapter.platform(), organization.clone(), &listing, detail, url)
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
