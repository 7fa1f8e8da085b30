use crate::adapter::{
    path_segment, scope_to_organization, PlatformAdapter, PostingFields, RawDetail, RawListing,
};
use crate::http::{HttpConfig, HttpFetcher};
use crate::proxy::ProxyPool;
use async_trait::async_trait;
use jobscout_core::{AppConfig, CoreError, ErrorExt, Platform};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

pub const ASHBY_BASE: &str = "https://jobs.ashbyhq.com";
const GRAPHQL_PATH: &str = "/api/non-user-graphql";
const CLIENT_HEADERS: &[(&str, &str)] = &[
    ("apollographql-client-name", "frontend_non_user"),
    ("apollographql-client-version", "0.1.0"),
];

const LIST_QUERY: &str = "query ApiJobBoardWithTeams($organizationHostedJobsPageName: String!) {
  jobBoard: jobBoardWithTeams(organizationHostedJobsPageName: $organizationHostedJobsPageName) {
    jobPostings { id title locationName employmentType workplaceType }
  }
}";

const DETAIL_QUERY: &str = "query ApiJobPosting($organizationHostedJobsPageName: String!, $jobPostingId: String!) {
  jobPosting(organizationHostedJobsPageName: $organizationHostedJobsPageName, jobPostingId: $jobPostingId) {
    id title locationName workplaceType employmentType descriptionHtml compensationTierSummary
  }
}";

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardData {
    job_board: Option<JobBoard>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobBoard {
    #[serde(default)]
    job_postings: Vec<AshbyPosting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostingData {
    job_posting: Option<AshbyPosting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AshbyPosting {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    location_name: Option<String>,
    #[serde(default)]
    workplace_type: Option<String>,
    #[serde(default)]
    employment_type: Option<String>,
    #[serde(default)]
    description_html: Option<String>,
    #[serde(default)]
    compensation_tier_summary: Option<String>,
}

impl AshbyPosting {
    fn fields(self) -> (Option<String>, PostingFields) {
        (
            self.title,
            PostingFields {
                location_name: self.location_name,
                workplace_type: self.workplace_type,
                employment_type: self.employment_type,
                compensation: self.compensation_tier_summary,
                description: self.description_html,
                timestamp: None,
            },
        )
    }
}

/// Ashby job boards, read through the GraphQL API behind the hosted pages.
/// The listing has no description or compensation, so every posting needs a
/// detail query. Neither query exposes a publication date.
#[derive(Debug)]
pub struct AshbyAdapter {
    fetcher: HttpFetcher,
    base_url: String,
}

impl AshbyAdapter {
    pub fn new(config: &AppConfig, proxies: Option<Arc<ProxyPool>>) -> Result<Self, CoreError> {
        Ok(Self {
            fetcher: HttpFetcher::new("ashby", HttpConfig::job_board(config), proxies)?,
            base_url: ASHBY_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}{}?op={}",
            self.base_url.trim_end_matches('/'),
            GRAPHQL_PATH,
            operation
        )
    }

    async fn query_board(&self, org: &str) -> Result<Vec<AshbyPosting>, CoreError> {
        let body = json!({
            "operationName": "ApiJobBoardWithTeams",
            "variables": { "organizationHostedJobsPageName": org },
            "query": LIST_QUERY,
        });
        let response: GraphQlResponse<BoardData> = self
            .fetcher
            .post_json("list", &self.endpoint("ApiJobBoardWithTeams"), &body, CLIENT_HEADERS)
            .await?;

        // Unknown boards come back as `jobBoard: null` rather than a 404.
        Ok(response
            .data
            .and_then(|data| data.job_board)
            .map(|board| board.job_postings)
            .unwrap_or_default())
    }
}

#[async_trait]
impl PlatformAdapter for AshbyAdapter {
    fn platform(&self) -> Platform {
        Platform::Ashby
    }

    async fn list_postings(&self, org: &str) -> Vec<RawListing> {
        match self.query_board(org).await {
            Ok(postings) => postings
                .into_iter()
                .map(|posting| {
                    let id = posting.id.clone();
                    let (title, fields) = posting.fields();
                    RawListing {
                        id,
                        title: title.unwrap_or_default(),
                        reference: None,
                        url: None,
                        fields,
                    }
                })
                .collect(),
            Err(e) => {
                scope_to_organization(e, org).log_warn();
                Vec::new()
            }
        }
    }

    async fn fetch_detail(&self, org: &str, listing: &RawListing) -> Option<RawDetail> {
        let body = json!({
            "operationName": "ApiJobPosting",
            "variables": {
                "organizationHostedJobsPageName": org,
                "jobPostingId": listing.id,
            },
            "query": DETAIL_QUERY,
        });
        let result: Result<GraphQlResponse<PostingData>, CoreError> = self
            .fetcher
            .post_json("detail", &self.endpoint("ApiJobPosting"), &body, CLIENT_HEADERS)
            .await;

        match result {
            Ok(response) => {
                let posting = response.data.and_then(|data| data.job_posting);
                if posting.is_none() {
                    debug!("[ashby] No detail for {}/{}", org, listing.id);
                }
                posting.map(|posting| {
                    let (title, fields) = posting.fields();
                    RawDetail { title, fields }
                })
            }
            Err(e) => {
                warn!("[ashby] Detail for {}/{} failed: {}", org, listing.id, e);
                None
            }
        }
    }

    fn posting_url(&self, org: &str, listing: &RawListing) -> String {
        format!(
            "{}/{}/{}",
            ASHBY_BASE,
            path_segment(org),
            path_segment(&listing.id)
        )
    }

    fn fetcher(&self) -> Option<&HttpFetcher> {
        Some(&self.fetcher)
    }
}
