use jobscout_core::SearchResult;
use regex::Regex;
use std::sync::OnceLock;

fn suffix_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"\s*\|.*$",
            r"(?i)\s*-\s*greenhouse.*$",
            r"(?i)\s*-\s*ashby.*$",
            r"(?i)\s*-\s*workable.*$",
            r"(?i)\s*-\s*lever.*$",
            r"(?i)\s+at\s+[^-]+$",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Job title inside a search hit's display title.
///
/// Hits read like "Platform Engineer - Acme | Greenhouse" or "Platform
/// Engineer at Acme". Board suffixes and "at Company" go first, then
/// anything after the first " - " separator. Hyphens inside words
/// ("Full-Stack") are kept.
pub fn extract_title(result: &SearchResult) -> String {
    let mut title = result.title.trim().to_string();
    for pattern in suffix_patterns() {
        title = pattern.replace(&title, "").into_owned();
    }

    let head = title.split(" - ").next().unwrap_or_default().trim();
    if head.is_empty() {
        title.trim().to_string()
    } else {
        head.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_strips_board_suffixes() {
        let cases = [
            ("Platform Engineer - Acme | Greenhouse", "Platform Engineer"),
            ("Job Application for Data Engineer at Acme", "Job Application for Data Engineer"),
            ("Senior SRE - Acme - Lever", "Senior SRE"),
            ("Backend Engineer - Ashby", "Backend Engineer"),
            ("Designer - Workable Careers", "Designer"),
            ("Full-Stack Engineer - Acme", "Full-Stack Engineer"),
            ("Staff Engineer", "Staff Engineer"),
            ("", ""),
        ];
        for (raw, expected) in cases {
            assert_eq!(extract_title(&hit(raw)), expected, "{:?}", raw);
        }
    }

}
