use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Contains,
    Partial,
    NoMatch,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Contains => "contains",
            MatchKind::Partial => "partial",
            MatchKind::NoMatch => "no-match",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    /// 0 to 100
    pub score: f64,
    pub kind: MatchKind,
}

impl FuzzyMatch {
    const NONE: FuzzyMatch = FuzzyMatch {
        score: 0.0,
        kind: MatchKind::NoMatch,
    };
}

const CONTAINS_SCORE: f64 = 85.0;
const PARTIAL_FLOOR: f64 = 50.0;
const MIN_WORD_LEN: usize = 3;

/// Lowercase, punctuation dropped, whitespace collapsed.
pub fn normalize_text(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity of two short texts: exact, substring, or word overlap.
///
/// Word overlap is the Jaccard index over words longer than two characters
/// and only counts when it exceeds 50%.
///
/// Empty input never matches: if either text normalizes to nothing the
/// result is `NoMatch` with score 0, even for `("", "")`.
pub fn fuzzy_match(a: &str, b: &str) -> FuzzyMatch {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a.is_empty() || b.is_empty() {
        return FuzzyMatch::NONE;
    }

    if a == b {
        return FuzzyMatch {
            score: 100.0,
            kind: MatchKind::Exact,
        };
    }
    if a.contains(&b) || b.contains(&a) {
        return FuzzyMatch {
            score: CONTAINS_SCORE,
            kind: MatchKind::Contains,
        };
    }

    let words = |text: &str| -> HashSet<String> {
        text.split(' ')
            .filter(|word| word.chars().count() >= MIN_WORD_LEN)
            .map(str::to_string)
            .collect()
    };
    let (left, right) = (words(&a), words(&b));
    let union = left.union(&right).count();
    if union == 0 {
        return FuzzyMatch::NONE;
    }

    let similarity = (left.intersection(&right).count() * 100) as f64 / union as f64;
    if similarity > PARTIAL_FLOOR {
        FuzzyMatch {
            score: similarity,
            kind: MatchKind::Partial,
        }
    } else {
        FuzzyMatch::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Sr. Engineer,  (Platform)!\n"), "sr engineer platform");
        assert_eq!(normalize_text("C++ / Rust_dev"), "c rust_dev");
        assert_eq!(normalize_text("!!!"), "");
    }

    #[test]
    fn test_exact_after_normalization() {
        let m = fuzzy_match("Platform Engineer!", "platform   engineer");
        assert_eq!(m.kind, MatchKind::Exact);
        assert_eq!(m.score, 100.0);
    }

    #[test]
    fn test_exact_match_is_reflexive() {
        for text in ["Engineer", "Senior Platform Engineer (Remote)", "QA", "Ünïcode Téam"] {
            assert_eq!(fuzzy_match(text, text).score, 100.0, "{}", text);
        }
    }

    #[test]
    fn test_contains_with_company_suffix() {
        let m = fuzzy_match("Platform Engineer - Acme", "Platform Engineer");
        assert_eq!(m.kind, MatchKind::Contains);
        assert_eq!(m.score, 85.0);
    }

    #[test]
    fn test_partial_word_overlap() {
        // {senior, platform, engineer} vs {staff, platform, engineer}: 2/4
        let m = fuzzy_match("Senior Platform Engineer", "Staff Platform Engineer");
        assert_eq!(m.kind, MatchKind::NoMatch);
        assert_eq!(m.score, 0.0);

        // {senior, platform, engineer, remote} vs {platform, engineer, remote}: 3/4
        let m = fuzzy_match("Senior Platform Engineer Remote", "Remote Platform Engineer");
        assert_eq!(m.kind, MatchKind::Partial);
        assert_eq!(m.score, 75.0);
    }

    #[test]
    fn test_short_words_are_ignored_for_overlap() {
        let m = fuzzy_match("VP of IT", "VP of HR");
        assert_eq!(m.kind, MatchKind::NoMatch);
    }

    #[test]
    fn test_empty_inputs_never_match() {
        assert_eq!(fuzzy_match("", "Engineer").kind, MatchKind::NoMatch);
        assert_eq!(fuzzy_match("Engineer", "").kind, MatchKind::NoMatch);
        assert_eq!(fuzzy_match("", "").score, 0.0);
        assert_eq!(fuzzy_match("--", "--").kind, MatchKind::NoMatch);
        assert_eq!(MatchKind::NoMatch.as_str(), "no-match");
    }
}
