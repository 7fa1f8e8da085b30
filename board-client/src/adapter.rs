//! The capability every job-board platform implements, plus the shared
//! list/detail merge that turns raw platform data into [`JobPosting`]s.

use crate::driver::scrape_organizations;
use crate::http::HttpFetcher;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use jobscout_core::{strip_html, AppConfig, CoreError, JobPosting, Platform, UpstreamError};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::time::Duration;

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Optional posting fields as one stage (list or detail) reported them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostingFields {
    pub location_name: Option<String>,
    pub workplace_type: Option<String>,
    pub employment_type: Option<String>,
    pub compensation: Option<String>,
    /// Raw, possibly HTML, description
    pub description: Option<String>,
    /// Raw timestamp as the platform formats it
    pub timestamp: Option<String>,
}

/// One posting as it appears in an organization's listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawListing {
    pub id: String,
    pub title: String,
    /// Platform key used for the detail request and the public URL when it
    /// differs from `id` (Workable shortcodes).
    pub reference: Option<String>,
    /// Public URL when the listing carries one.
    pub url: Option<String>,
    pub fields: PostingFields,
}

impl RawListing {
    pub fn reference(&self) -> &str {
        self.reference.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetail {
    pub title: Option<String>,
    pub fields: PostingFields,
}

#[derive(Debug, Clone)]
pub struct ScrapeLimits {
    /// Organizations scraped at once
    pub worker_pool_size: usize,
    /// Detail requests in flight per organization
    pub detail_concurrency: usize,
    /// Pause before each detail request
    pub detail_delay: Duration,
}

impl ScrapeLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            worker_pool_size: config.worker_pool_size.max(1),
            detail_concurrency: config.detail_concurrency.max(1),
            detail_delay: Duration::from_millis(config.detail_delay_ms),
        }
    }
}

impl Default for ScrapeLimits {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// A job-board platform: how to list an organization's postings, how to
/// fetch one posting's detail, and how its public URLs look.
///
/// `list_postings` and `fetch_detail` never fail. Any upstream problem is
/// logged and degrades to an empty list or `None`.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    async fn list_postings(&self, org: &str) -> Vec<RawListing>;

    async fn fetch_detail(&self, org: &str, listing: &RawListing) -> Option<RawDetail>;

    fn posting_url(&self, org: &str, listing: &RawListing) -> String;

    /// Value stored in `JobPosting::organization`.
    fn organization_name(&self, org: &str) -> String {
        org.to_string()
    }

    /// False when the listing already carries every field.
    fn requires_detail(&self) -> bool {
        true
    }

    /// True when postings carry a real publication time, making snippet
    /// matching unnecessary.
    fn has_authoritative_timestamps(&self) -> bool {
        false
    }

    fn fetcher(&self) -> Option<&HttpFetcher> {
        None
    }

    /// Lists and details every organization under the configured bounds and
    /// appends the normalized postings to `sink`.
    async fn scrape(&self, orgs: &[String], limits: &ScrapeLimits, sink: &mut Vec<JobPosting>) {
        let jobs = scrape_organizations(self, orgs, limits).await;
        sink.extend(jobs);
    }
}

/// Merges list and detail data into a posting. Detail values win when
/// non-blank, listing values are the fallback, anything else is `""`.
///
/// Returns `None` only when neither stage supplied a title.
pub fn normalize(
    platform: Platform,
    organization: String,
    listing: &RawListing,
    detail: Option<RawDetail>,
    url: String,
) -> Option<JobPosting> {
    let (detail_title, detail_fields) = match detail {
        Some(detail) => (detail.title, detail.fields),
        None => (None, PostingFields::default()),
    };
    let listed = listing.fields.clone();

    let title = pick(detail_title, Some(listing.title.clone()));
    if title.is_empty() {
        return None;
    }

    let description = pick(detail_fields.description, listed.description);
    let timestamp = pick(detail_fields.timestamp, listed.timestamp);

    Some(JobPosting {
        source: platform,
        organization,
        id: listing.id.clone(),
        title,
        location_name: pick(detail_fields.location_name, listed.location_name),
        workplace_type: pick(detail_fields.workplace_type, listed.workplace_type),
        employment_type: pick(detail_fields.employment_type, listed.employment_type),
        compensation: pick(detail_fields.compensation, listed.compensation),
        description: strip_html(&description),
        url,
        timestamp: normalize_timestamp(&timestamp),
        recently_posted: None,
        match_score: None,
        match_type: None,
    })
}

fn pick(preferred: Option<String>, fallback: Option<String>) -> String {
    [preferred, fallback]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// RFC 3339 in UTC, or `""` when the value is missing or unreadable.
/// Accepts RFC 3339 with any offset, naive date-times (taken as UTC),
/// bare dates and epoch milliseconds.
pub fn normalize_timestamp(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            raw.parse::<i64>()
                .ok()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
        });

    parsed
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Re-labels a 404 on an organization-level request.
pub fn scope_to_organization(error: CoreError, org: &str) -> CoreError {
    match error {
        CoreError::Upstream(UpstreamError::NotFound { .. }) => {
            UpstreamError::OrganizationNotFound {
                organization: org.to_string(),
            }
            .into()
        }
        other => other,
    }
}

/// Escapes an organization slug or posting id for use as one path segment.
pub fn path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// "acme-labs" -> "Acme Labs"
pub fn title_case_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
