use crate::http::{HttpConfig, HttpFetcher};
use crate::proxy::ProxyPool;
use jobscout_core::{AppConfig, CoreError, ErrorExt, SearchError, SearchResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const SERPAPI_BASE: &str = "https://serpapi.com";
const RESULTS_PER_PAGE: u32 = 100;
/// Upper bound on pages per search, whatever the caller asks for.
pub const MAX_PAGES: u32 = 3;

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

/// Site-scoped web search through SerpApi's Google engine.
#[derive(Debug)]
pub struct SearchClient {
    fetcher: HttpFetcher,
    api_key: Option<String>,
    base_url: String,
    page_delay: Duration,
}

impl SearchClient {
    pub fn new(config: &AppConfig, proxies: Option<Arc<ProxyPool>>) -> Result<Self, CoreError> {
        Ok(Self {
            fetcher: HttpFetcher::new("serpapi", HttpConfig::search_provider(config), proxies)?,
            api_key: config.serp_api_key.clone(),
            base_url: SERPAPI_BASE.to_string(),
            page_delay: Duration::from_millis(config.page_delay_ms),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn fetcher(&self) -> &HttpFetcher {
        &self.fetcher
    }

    /// Pages through results for `site:<site> <keyword>`.
    ///
    /// At most [`MAX_PAGES`] pages are requested. An empty page ends the walk.
    /// A failed page is logged and ends it too, keeping whatever earlier pages
    /// returned. Links are unique in the output.
    pub async fn search(
        &self,
        site: &str,
        keyword: Option<&str>,
        days_back: Option<u32>,
        max_pages: u32,
    ) -> Vec<SearchResult> {
        let query = build_query(site, keyword);
        let date_filter = days_back.map(|days| format!("qdr:d{}", days));
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        let max_pages = max_pages.min(MAX_PAGES);

        info!("Searching {:?} ({} pages max)", query, max_pages);

        for page in 0..max_pages {
            if page > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let organic = match self.fetch_page(&query, date_filter.as_deref(), page).await {
                Ok(organic) => organic,
                Err(e) => {
                    e.log_warn();
                    warn!("Search page {} for {} failed, stopping early", page + 1, site);
                    break;
                }
            };

            if organic.is_empty() {
                debug!("Search page {} for {} is empty, results exhausted", page + 1, site);
                break;
            }

            let before = results.len();
            for result in organic {
                let Some(link) = result.link.filter(|link| !link.is_empty()) else {
                    continue;
                };
                if seen.insert(link.clone()) {
                    results.push(SearchResult {
                        link,
                        title: result.title.unwrap_or_default(),
                        snippet: result.snippet.unwrap_or_default(),
                    });
                }
            }
            debug!(
                "Search page {} for {}: {} new links",
                page + 1,
                site,
                results.len() - before
            );
        }

        info!("Search for {} returned {} unique links", site, results.len());
        results
    }

    async fn fetch_page(
        &self,
        query: &str,
        date_filter: Option<&str>,
        page: u32,
    ) -> Result<Vec<OrganicResult>, CoreError> {
        let start = (page * RESULTS_PER_PAGE).to_string();
        let num = RESULTS_PER_PAGE.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("engine", "google"),
            ("q", query),
            ("location", "United States"),
            ("hl", "en"),
            ("gl", "us"),
            ("google_domain", "google.com"),
            ("num", &num),
            ("start", &start),
        ];
        if let Some(filter) = date_filter {
            params.push(("tbs", filter));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key", key));
        }

        let url = format!("{}/search.json", self.base_url.trim_end_matches('/'));
        let response: SerpResponse = self.fetcher.get_json("search", &url, &params).await?;

        match response.error {
            // The provider reports an exhausted query as an error string.
            Some(message) if response.organic_results.is_empty() && is_no_results(&message) => {
                Ok(Vec::new())
            }
            Some(message) if response.organic_results.is_empty() => {
                Err(SearchError::Provider { message }.into())
            }
            _ => Ok(response.organic_results),
        }
    }
}

pub fn build_query(site: &str, keyword: Option<&str>) -> String {
    match keyword.map(str::trim).filter(|k| !k.is_empty()) {
        Some(keyword) => format!("site:{} {}", site, keyword),
        None => format!("site:{}", site),
    }
}

fn is_no_results(message: &str) -> bool {
    message.to_ascii_lowercase().contains("hasn't returned any results")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server, api_key: Option<&str>) -> SearchClient {
        let config = AppConfig {
            serp_api_key: api_key.map(str::to_string),
            page_delay_ms: 0,
            max_retries: 1,
            ..Default::default()
        };
        SearchClient::new(&config, None)
            .unwrap()
            .with_base_url(server.url())
    }

    fn page(links: &[&str]) -> String {
        let organic: Vec<serde_json::Value> = links
            .iter()
            .map(|link| serde_json::json!({"link": link, "title": "Engineer", "snippet": "Join us"}))
            .collect();
        serde_json::json!({ "organic_results": organic }).to_string()
    }

    #[test]
    fn test_build_query() {
        assert_eq!(build_query("jobs.lever.co", None), "site:jobs.lever.co");
        assert_eq!(build_query("jobs.lever.co", Some("  ")), "site:jobs.lever.co");
        assert_eq!(
            build_query("jobs.lever.co", Some("rust")),
            "site:jobs.lever.co rust"
        );
    }

    #[tokio::test]
    async fn test_paginates_until_empty_page_and_dedupes() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/search.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "site:boards.greenhouse.io platform engineer".into()),
                Matcher::UrlEncoded("tbs".into(), "qdr:d3".into()),
                Matcher::UrlEncoded("api_key".into(), "k".into()),
                Matcher::UrlEncoded("start".into(), "0".into()),
            ]))
            .with_status(200)
            .with_body(page(&[
                "https://boards.greenhouse.io/acme/jobs/111",
                "https://boards.greenhouse.io/acme/jobs/222",
            ]))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("start".into(), "100".into()))
            .with_status(200)
            .with_body(page(&[
                "https://boards.greenhouse.io/acme/jobs/222",
                "https://boards.greenhouse.io/beta/jobs/3",
            ]))
            .create_async()
            .await;
        let third = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("start".into(), "200".into()))
            .with_status(200)
            .with_body(page(&[]))
            .create_async()
            .await;
        let fourth = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("start".into(), "300".into()))
            .expect(0)
            .create_async()
            .await;

        let results = client(&server, Some("k"))
            .search("boards.greenhouse.io", Some("platform engineer"), Some(3), 5)
            .await;

        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
        fourth.assert_async().await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].link, "https://boards.greenhouse.io/beta/jobs/3");
    }

    #[tokio::test]
    async fn test_page_count_is_capped() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(page(&["https://jobs.lever.co/acme/1"]))
            .expect(MAX_PAGES as usize)
            .create_async()
            .await;

        let results = client(&server, Some("k"))
            .search("jobs.lever.co", None, Some(3), 10)
            .await;

        mock.assert_async().await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_no_date_filter_without_days_back() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search.json")
            // tbs would sit between start and api_key.
            .match_query(Matcher::Regex("start=0&api_key=k$".into()))
            .with_status(200)
            .with_body(page(&["https://jobs.lever.co/acme/1"]))
            .expect(1)
            .create_async()
            .await;

        let results = client(&server, Some("k"))
            .search("jobs.lever.co", None, None, 1)
            .await;

        mock.assert_async().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].snippet, "Join us");
    }

    #[tokio::test]
    async fn test_failed_page_keeps_earlier_results() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("start".into(), "0".into()))
            .with_status(200)
            .with_body(page(&["https://jobs.ashbyhq.com/acme/1"]))
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("start".into(), "100".into()))
            .with_status(200)
            .with_body(r#"{"error": "Invalid API key. Your API key should be here"}"#)
            .create_async()
            .await;

        let results = client(&server, Some("k"))
            .search("jobs.ashbyhq.com", None, Some(1), 3)
            .await;

        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_degrades_to_empty() {
        let mut server = mockito::Server::new_async().await;
        let _rejected = server
            .mock("GET", "/search.json")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error": "Invalid API key."}"#)
            .create_async()
            .await;

        let results = client(&server, None)
            .search("apply.workable.com", Some("rust"), Some(3), 2)
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_provider_no_results_message_is_empty_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": "Google hasn't returned any results for this query."}"#)
            .expect(1)
            .create_async()
            .await;

        let results = client(&server, Some("k"))
            .search("jobs.lever.co", Some("zzzz"), None, 3)
            .await;
        mock.assert_async().await;
        assert!(results.is_empty());
    }
}
