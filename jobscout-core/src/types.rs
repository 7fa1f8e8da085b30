use serde::{Deserialize, Serialize};
use std::fmt;

/// Applicant-tracking platforms the pipeline knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ashby,
    Greenhouse,
    Lever,
    Workable,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Ashby,
        Platform::Greenhouse,
        Platform::Lever,
        Platform::Workable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ashby => "ashby",
            Platform::Greenhouse => "greenhouse",
            Platform::Lever => "lever",
            Platform::Workable => "workable",
        }
    }

    /// Hostname used to scope web searches to this platform's public boards.
    pub fn search_site(&self) -> &'static str {
        match self {
            Platform::Ashby => "jobs.ashbyhq.com",
            Platform::Greenhouse => "boards.greenhouse.io",
            Platform::Lever => "jobs.lever.co",
            Platform::Workable => "apply.workable.com",
        }
    }

    /// Every host that serves this platform's public job boards.
    pub fn hosts(&self) -> &'static [&'static str] {
        match self {
            Platform::Ashby => &["jobs.ashbyhq.com"],
            Platform::Greenhouse => &["boards.greenhouse.io", "job-boards.greenhouse.io"],
            Platform::Lever => &["jobs.lever.co"],
            Platform::Workable => &["apply.workable.com"],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One organic result returned by the web-search provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub link: String,
    pub title: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrganizationRef {
    pub platform: Platform,
    pub identifier: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Title,
    Description,
    TitleWeak,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Title => "title",
            MatchType::Description => "description",
            MatchType::TitleWeak => "title-weak",
        }
    }
}

/// Normalized job posting, the unit of the published snapshot.
///
/// Every string field other than `title` may be empty but is never absent.
/// The recency fields are only populated when the recency matcher ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub source: Platform,
    pub organization: String,
    pub id: String,
    pub title: String,
    pub location_name: String,
    pub workplace_type: String,
    pub employment_type: String,
    pub compensation: String,
    pub description: String,
    pub url: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recently_posted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
}

impl JobPosting {
    /// Key that must be unique within one run's output.
    pub fn identity(&self) -> (Platform, &str, &str) {
        (self.source, &self.organization, &self.id)
    }

    pub fn mark_recent(&mut self, score: f64, match_type: MatchType) {
        self.recently_posted = Some(true);
        self.match_score = Some(score);
        self.match_type = Some(match_type);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub credentials: Option<ProxyCredentials>,
}

impl ProxyEndpoint {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }

    /// Parses one `host:port[:user:pass]` line as handed out by proxy vendors.
    pub fn parse_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.trim().split(':').collect();
        let (address, port) = match parts.as_slice() {
            [address, port] | [address, port, _, _] => (*address, port.parse().ok()?),
            _ => return None,
        };
        if address.is_empty() {
            return None;
        }
        let credentials = match parts.as_slice() {
            [_, _, username, password] => Some(ProxyCredentials {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => None,
        };
        Some(Self {
            address: address.to_string(),
            port,
            credentials,
        })
    }
}
