use crate::fuzzy::fuzzy_match;
use crate::title::extract_title;
use jobscout_core::{JobPosting, MatchType, SearchResult};
use tracing::debug;

const STRONG_TITLE_SCORE: f64 = 70.0;
const DESCRIPTION_SCORE: f64 = 60.0;
const WEAK_TITLE_SCORE: f64 = 60.0;
const MIN_SNIPPET_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    /// Position of `job` within the candidate slice.
    pub index: usize,
    pub job: &'a JobPosting,
    pub score: f64,
    pub match_type: MatchType,
}

/// Best candidate for one search hit, or `None` when nothing is close enough.
///
/// Title agreement of 70 or more wins outright. Below that, a snippet longer
/// than 20 characters is compared with each candidate's description and wins
/// at 60 or more. A title score of 60 or more is the last resort. Ties keep
/// the earliest candidate.
pub fn find_match<'a>(
    search_title: &str,
    candidates: &'a [JobPosting],
    snippet: Option<&str>,
) -> Option<Match<'a>> {
    let best_title = best_by(candidates, |job| Some(fuzzy_match(search_title, &job.title).score));

    if let Some((index, score)) = best_title.filter(|(_, score)| *score >= STRONG_TITLE_SCORE) {
        return Some(Match {
            index,
            job: &candidates[index],
            score,
            match_type: MatchType::Title,
        });
    }

    if let Some(snippet) = snippet.filter(|s| s.chars().count() > MIN_SNIPPET_LEN) {
        let best_description = best_by(candidates, |job| {
            (!job.description.is_empty()).then(|| fuzzy_match(snippet, &job.description).score)
        });
        if let Some((index, score)) =
            best_description.filter(|(_, score)| *score >= DESCRIPTION_SCORE)
        {
            return Some(Match {
                index,
                job: &candidates[index],
                score,
                match_type: MatchType::Description,
            });
        }
    }

    best_title
        .filter(|(_, score)| *score >= WEAK_TITLE_SCORE)
        .map(|(index, score)| Match {
            index,
            job: &candidates[index],
            score,
            match_type: MatchType::TitleWeak,
        })
}

fn best_by<F>(candidates: &[JobPosting], score: F) -> Option<(usize, f64)>
where
    F: Fn(&JobPosting) -> Option<f64>,
{
    candidates
        .iter()
        .enumerate()
        .filter_map(|(index, job)| score(job).map(|s| (index, s)))
        .filter(|(_, s)| *s > 0.0)
        .fold(None, |best: Option<(usize, f64)>, (index, s)| match best {
            Some((_, top)) if top >= s => best,
            _ => Some((index, s)),
        })
}

/// Flags jobs that one of `hits` appears to describe. Returns how many were
/// newly marked.
///
/// `hits` must already be scoped to the jobs' platform and organization.
/// Each job is marked by the first hit that matches it; already marked jobs
/// are left untouched.
pub fn mark_recent(jobs: &mut [JobPosting], hits: &[SearchResult]) -> usize {
    if hits.is_empty() {
        return 0;
    }
    let titles: Vec<String> = hits.iter().map(extract_title).collect();
    let mut marked = 0;

    for job in jobs.iter_mut() {
        if job.recently_posted == Some(true) {
            continue;
        }
        let found = hits.iter().zip(&titles).find_map(|(hit, title)| {
            find_match(title, std::slice::from_ref(&*job), Some(&hit.snippet))
                .map(|m| (m.score, m.match_type, title))
        });
        if let Some((score, match_type, title)) = found {
            debug!(
                "[match-{}] {}/{}: {:?} -> {:?} ({:.0}%)",
                match_type.as_str(),
                job.source,
                job.organization,
                title,
                job.title,
                score
            );
            job.mark_recent(score, match_type);
            marked += 1;
        }
    }

    marked
}
