use crate::adapter::{
    path_segment, scope_to_organization, title_case_slug, PlatformAdapter, PostingFields,
    RawDetail, RawListing,
};
use crate::http::{HttpConfig, HttpFetcher};
use crate::proxy::ProxyPool;
use async_trait::async_trait;
use jobscout_core::{AppConfig, CoreError, ErrorExt, Platform};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub const WORKABLE_BASE: &str = "https://apply.workable.com";
const MAX_LIST_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobsPage {
    #[serde(default)]
    results: Vec<WorkableJob>,
    #[serde(default)]
    next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkableJob {
    id: serde_json::Value,
    shortcode: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    location: Option<WorkableLocation>,
    #[serde(default)]
    locations: Vec<WorkableLocation>,
    #[serde(default)]
    workplace: Option<String>,
    #[serde(default, rename = "type")]
    employment_type: Option<String>,
    #[serde(default)]
    published: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkableLocation {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl WorkableLocation {
    /// "City, Region", falling back to the country alone.
    fn display(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.city, &self.region]
            .into_iter()
            .filter_map(|part| part.as_deref().map(str::trim))
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            self.country.clone().filter(|c| !c.trim().is_empty())
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkableDetail {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    requirements: Option<String>,
    #[serde(default)]
    benefits: Option<String>,
}

impl WorkableJob {
    fn into_listing(self) -> Option<RawListing> {
        let id = match &self.id {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) if !s.is_empty() => s.clone(),
            _ => return None,
        };
        let location_name = self
            .locations
            .first()
            .or(self.location.as_ref())
            .and_then(WorkableLocation::display);

        Some(RawListing {
            id,
            title: self.title.unwrap_or_default(),
            reference: Some(self.shortcode),
            url: None,
            fields: PostingFields {
                location_name,
                workplace_type: self.workplace,
                employment_type: self.employment_type,
                compensation: None,
                description: None,
                timestamp: self.published,
            },
        })
    }
}

/// Workable hosted career pages. The listing is a search endpoint that
/// takes filters (all empty here) and pages with a `nextPage` token.
#[derive(Debug)]
pub struct WorkableAdapter {
    fetcher: HttpFetcher,
    base_url: String,
}

impl WorkableAdapter {
    pub fn new(config: &AppConfig, proxies: Option<Arc<ProxyPool>>) -> Result<Self, CoreError> {
        Ok(Self {
            fetcher: HttpFetcher::new("workable", HttpConfig::job_board(config), proxies)?,
            base_url: WORKABLE_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api(&self, version: &str, account: &str) -> String {
        format!(
            "{}/api/{}/accounts/{}/jobs",
            self.base_url.trim_end_matches('/'),
            version,
            path_segment(account)
        )
    }

    async fn list_all(&self, account: &str) -> Result<Vec<WorkableJob>, CoreError> {
        let url = self.api("v3", account);
        let mut jobs = Vec::new();
        let mut tokens_seen = HashSet::new();
        let mut token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut body = json!({
                "query": "",
                "department": [],
                "location": [],
                "workplace": [],
                "worktype": [],
            });
            if let Some(token) = &token {
                body["token"] = json!(token);
            }

            let page: JobsPage = match self.fetcher.post_json("list", &url, &body, &[]).await {
                Ok(page) => page,
                // Later pages failing still leaves the earlier ones usable.
                Err(e) if !jobs.is_empty() => {
                    warn!("[workable] {} page after {} jobs failed: {}", account, jobs.len(), e);
                    break;
                }
                Err(e) => return Err(e),
            };

            let empty = page.results.is_empty();
            jobs.extend(page.results);

            match page.next_page.filter(|t| !t.is_empty()) {
                Some(next) if !empty && tokens_seen.insert(next.clone()) => token = Some(next),
                _ => break,
            }
            debug!("[workable] {} has more pages ({} so far)", account, jobs.len());
        }
        Ok(jobs)
    }
}

#[async_trait]
impl PlatformAdapter for WorkableAdapter {
    fn platform(&self) -> Platform {
        Platform::Workable
    }

    async fn list_postings(&self, org: &str) -> Vec<RawListing> {
        match self.list_all(org).await {
            Ok(jobs) => jobs.into_iter().filter_map(WorkableJob::into_listing).collect(),
            Err(e) => {
                scope_to_organization(e, org).log_warn();
                Vec::new()
            }
        }
    }

    async fn fetch_detail(&self, org: &str, listing: &RawListing) -> Option<RawDetail> {
        let url = format!("{}/{}", self.api("v2", org), path_segment(listing.reference()));
        match self.fetcher.get_json::<WorkableDetail>("detail", &url, &[]).await {
            Ok(detail) => {
                let sections: Vec<String> = [detail.description, detail.requirements, detail.benefits]
                    .into_iter()
                    .flatten()
                    .filter(|section| !section.trim().is_empty())
                    .collect();
                Some(RawDetail {
                    title: detail.title,
                    fields: PostingFields {
                        description: (!sections.is_empty()).then(|| sections.join("\n")),
                        ..Default::default()
                    },
                })
            }
            Err(e) => {
                warn!("[workable] Detail for {}/{} failed: {}", org, listing.reference(), e);
                None
            }
        }
    }

    fn posting_url(&self, org: &str, listing: &RawListing) -> String {
        format!(
            "{}/{}/j/{}/",
            WORKABLE_BASE,
            path_segment(org),
            path_segment(listing.reference())
        )
    }

    fn organization_name(&self, org: &str) -> String {
        title_case_slug(org)
    }

    fn has_authoritative_timestamps(&self) -> bool {
        true
    }

    fn fetcher(&self) -> Option<&HttpFetcher> {
        Some(&self.fetcher)
    }
}
