//! Infers "recently posted" for boards that expose no publication date by
//! matching date-restricted search hits against scraped postings.

pub mod fuzzy;
pub mod matcher;
pub mod title;

pub use fuzzy::{fuzzy_match, normalize_text, FuzzyMatch, MatchKind};
pub use matcher::{find_match, mark_recent, Match};
pub use title::extract_title;
