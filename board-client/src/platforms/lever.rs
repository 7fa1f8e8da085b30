use crate::adapter::{
    path_segment, scope_to_organization, PlatformAdapter, PostingFields, RawDetail, RawListing,
};
use crate::http::{HttpConfig, HttpFetcher};
use crate::proxy::ProxyPool;
use async_trait::async_trait;
use jobscout_core::{collapse_whitespace, AppConfig, CoreError, ErrorExt, Platform};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, warn};

pub const LEVER_BASE: &str = "https://jobs.lever.co";

fn parse_selector(css: &str) -> Result<Selector, CoreError> {
    Selector::parse(css).map_err(|e| CoreError::Internal {
        message: format!("bad selector {:?}: {:?}", css, e),
    })
}

#[derive(Debug)]
struct LeverSelectors {
    posting: Selector,
    title: Selector,
    link: Selector,
    location: Selector,
    commitment: Selector,
    workplace: Selector,
    description: Selector,
    salary: Selector,
    detail_title: Selector,
}

impl LeverSelectors {
    fn new() -> Result<Self, CoreError> {
        Ok(Self {
            posting: parse_selector(".posting")?,
            title: parse_selector(r#"h5[data-qa="posting-name"]"#)?,
            link: parse_selector("a.posting-title")?,
            location: parse_selector(".posting-categories .location")?,
            commitment: parse_selector(".posting-categories .commitment")?,
            workplace: parse_selector(".posting-categories .workplaceTypes")?,
            description: parse_selector(".content .description, .section-wrapper .section")?,
            salary: parse_selector(r#"[data-qa="salary-range"]"#)?,
            detail_title: parse_selector(".posting-headline h2")?,
        })
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
}

/// Lever hosted boards. There is no JSON here: the board page lists
/// postings as markup and each posting page carries the description.
#[derive(Debug)]
pub struct LeverAdapter {
    fetcher: HttpFetcher,
    base_url: String,
    selectors: LeverSelectors,
}

impl LeverAdapter {
    pub fn new(config: &AppConfig, proxies: Option<Arc<ProxyPool>>) -> Result<Self, CoreError> {
        Ok(Self {
            fetcher: HttpFetcher::new("lever", HttpConfig::job_board(config), proxies)?,
            base_url: LEVER_BASE.to_string(),
            selectors: LeverSelectors::new()?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn board_url(&self, org: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path_segment(org))
    }

    fn parse_board(&self, org: &str, markup: &str) -> Vec<RawListing> {
        let document = Html::parse_document(markup);
        let s = &self.selectors;

        document
            .select(&s.posting)
            .filter_map(|posting| {
                let id = posting
                    .value()
                    .attr("data-qa-posting-id")
                    .map(str::trim)
                    .filter(|id| !id.is_empty())?
                    .to_string();
                let title = first_text(posting, &s.title).unwrap_or_default();
                let url = posting
                    .select(&s.link)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .filter(|href| href.starts_with("http"))
                    .map(str::to_string);

                Some(RawListing {
                    id,
                    title,
                    reference: None,
                    url,
                    fields: PostingFields {
                        location_name: first_text(posting, &s.location),
                        employment_type: first_text(posting, &s.commitment),
                        workplace_type: first_text(posting, &s.workplace),
                        ..Default::default()
                    },
                })
            })
            .inspect(|listing| debug!("[lever] {} lists {}", org, listing.id))
            .collect()
    }

    fn parse_posting(&self, markup: &str) -> RawDetail {
        let document = Html::parse_document(markup);
        let root = document.root_element();
        let s = &self.selectors;

        let sections: Vec<String> = root.select(&s.description).map(|el| el.html()).collect();
        let description = (!sections.is_empty()).then(|| sections.join("\n\n"));

        RawDetail {
            title: first_text(root, &s.detail_title),
            fields: PostingFields {
                location_name: first_text(root, &s.location),
                employment_type: first_text(root, &s.commitment),
                workplace_type: first_text(root, &s.workplace),
                compensation: first_text(root, &s.salary),
                description,
                timestamp: None,
            },
        }
    }
}

#[async_trait]
impl PlatformAdapter for LeverAdapter {
    fn platform(&self) -> Platform {
        Platform::Lever
    }

    async fn list_postings(&self, org: &str) -> Vec<RawListing> {
        match self.fetcher.get_text("list", &self.board_url(org)).await {
            Ok(markup) => self.parse_board(org, &markup),
            Err(e) => {
                scope_to_organization(e, org).log_warn();
                Vec::new()
            }
        }
    }

    async fn fetch_detail(&self, org: &str, listing: &RawListing) -> Option<RawDetail> {
        let url = format!("{}/{}", self.board_url(org), path_segment(&listing.id));
        match self.fetcher.get_text("detail", &url).await {
            Ok(markup) => Some(self.parse_posting(&markup)),
            Err(e) => {
                warn!("[lever] Detail for {}/{} failed: {}", org, listing.id, e);
                None
            }
        }
    }

    fn posting_url(&self, org: &str, listing: &RawListing) -> String {
        listing.url.clone().unwrap_or_else(|| {
            format!(
                "{}/{}/{}",
                LEVER_BASE,
                path_segment(org),
                path_segment(&listing.id)
            )
        })
    }

    fn fetcher(&self) -> Option<&HttpFetcher> {
        Some(&self.fetcher)
    }
}
