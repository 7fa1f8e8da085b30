use jobscout_core::{OrganizationRef, Platform, SearchResult};
use percent_encoding::percent_decode_str;
use std::collections::HashSet;
use url::Url;

/// Organization slug a board URL belongs to, or `None` when the URL is not
/// a board URL of `platform`.
///
/// The slug is the first non-empty path segment, percent-decoded and kept
/// case-sensitive. Greenhouse embeds (`/embed/job_app?for=acme`) carry the
/// slug in the `for` parameter instead.
pub fn extract_org(platform: Platform, url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if !platform.hosts().contains(&host.as_str()) {
        return None;
    }

    let first = parsed.path_segments()?.find(|segment| !segment.is_empty())?;

    if platform == Platform::Greenhouse && first == "embed" {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "for")
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty());
    }

    let decoded = percent_decode_str(first).decode_utf8().ok()?;
    let decoded = decoded.trim();
    (!decoded.is_empty()).then(|| decoded.to_string())
}

/// Unique organizations behind a batch of search results, in first-seen order.
pub fn unique_organizations(platform: Platform, results: &[SearchResult]) -> Vec<OrganizationRef> {
    let mut seen = HashSet::new();
    results
        .iter()
        .filter_map(|result| extract_org(platform, &result.link))
        .filter(|identifier| seen.insert(identifier.clone()))
        .map(|identifier| OrganizationRef {
            platform,
            identifier,
        })
        .collect()
}
