use crate::adapter::{
    path_segment, scope_to_organization, PlatformAdapter, PostingFields, RawDetail, RawListing,
};
use crate::http::{HttpConfig, HttpFetcher};
use crate::proxy::ProxyPool;
use async_trait::async_trait;
use jobscout_core::{AppConfig, CoreError, ErrorExt, Platform};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

pub const GREENHOUSE_API_BASE: &str = "https://boards-api.greenhouse.io";
pub const GREENHOUSE_BOARD_BASE: &str = "https://boards.greenhouse.io";

#[derive(Debug, Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<GreenhouseJob>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseJob {
    id: serde_json::Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    absolute_url: Option<String>,
    #[serde(default)]
    location: Option<GreenhouseLocation>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    first_published: Option<String>,
    /// HTML-escaped HTML
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseLocation {
    #[serde(default)]
    name: Option<String>,
}

impl GreenhouseJob {
    fn id(&self) -> Option<String> {
        match &self.id {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    fn fields(self) -> PostingFields {
        PostingFields {
            location_name: self.location.and_then(|l| l.name),
            workplace_type: None,
            employment_type: None,
            compensation: None,
            description: self.content,
            timestamp: self.first_published.or(self.updated_at),
        }
    }
}

/// Greenhouse's public board API. `content=true` puts descriptions in the
/// listing, so no detail requests are needed.
#[derive(Debug)]
pub struct GreenhouseAdapter {
    fetcher: HttpFetcher,
    base_url: String,
}

impl GreenhouseAdapter {
    pub fn new(config: &AppConfig, proxies: Option<Arc<ProxyPool>>) -> Result<Self, CoreError> {
        Ok(Self {
            fetcher: HttpFetcher::new("greenhouse", HttpConfig::job_board(config), proxies)?,
            base_url: GREENHOUSE_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn jobs_url(&self, org: &str) -> String {
        format!(
            "{}/v1/boards/{}/jobs",
            self.base_url.trim_end_matches('/'),
            path_segment(org)
        )
    }
}

#[async_trait]
impl PlatformAdapter for GreenhouseAdapter {
    fn platform(&self) -> Platform {
        Platform::Greenhouse
    }

    async fn list_postings(&self, org: &str) -> Vec<RawListing> {
        let result: Result<JobsResponse, CoreError> = self
            .fetcher
            .get_json("list", &self.jobs_url(org), &[("content", "true")])
            .await;

        let jobs = match result {
            Ok(response) => response.jobs,
            Err(e) => {
                scope_to_organization(e, org).log_warn();
                return Vec::new();
            }
        };

        jobs.into_iter()
            .filter_map(|mut job| {
                let id = job.id()?;
                Some(RawListing {
                    id,
                    title: job.title.take().unwrap_or_default(),
                    reference: None,
                    url: job.absolute_url.take().filter(|u| !u.trim().is_empty()),
                    fields: job.fields(),
                })
            })
            .collect()
    }

    /// Single-posting lookup. `scrape` skips it since listings carry content.
    async fn fetch_detail(&self, org: &str, listing: &RawListing) -> Option<RawDetail> {
        let url = format!("{}/{}", self.jobs_url(org), path_segment(&listing.id));
        match self.fetcher.get_json::<GreenhouseJob>("detail", &url, &[]).await {
            Ok(mut job) => Some(RawDetail {
                title: job.title.take(),
                fields: job.fields(),
            }),
            Err(e) => {
                warn!("[greenhouse] Detail for {}/{} failed: {}", org, listing.id, e);
                None
            }
        }
    }

    fn posting_url(&self, org: &str, listing: &RawListing) -> String {
        listing.url.clone().unwrap_or_else(|| {
            format!(
                "{}/{}/jobs/{}",
                GREENHOUSE_BOARD_BASE,
                path_segment(org),
                path_segment(&listing.id)
            )
        })
    }

    fn requires_detail(&self) -> bool {
        false
    }

    fn has_authoritative_timestamps(&self) -> bool {
        true
    }

    fn fetcher(&self) -> Option<&HttpFetcher> {
        Some(&self.fetcher)
    }
}
