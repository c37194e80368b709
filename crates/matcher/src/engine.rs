//! Phrase matching with word-distance tolerance.
//!
//! A keyword matches a difference when its terms appear in order among the
//! difference's terms with at most `slop` other terms between consecutive
//! keyword terms. The check is one left-to-right pass per keyword term over a
//! reachability row: position `q` is reachable for term `i + 1` when it holds
//! that term and the nearest reachable position `p < q` for term `i` leaves a
//! gap `q - p - 1` the slop allows. Taking the nearest `p` is enough, since
//! any earlier one only widens the gap.

use std::collections::HashSet;

use diff::Difference;
use ingest::{Keyword, Slop};
use tracing::debug;

use crate::types::{EventFilter, Match};

/// Matches of `keyword` in `differences`.
///
/// Differences whose event the filter excludes are skipped before matching.
/// An empty set is not an error.
pub fn find_matches(
    keyword: &Keyword,
    differences: &[Difference],
    filter: EventFilter,
    snippet_offset: usize,
) -> HashSet<Match> {
    let matches: HashSet<Match> = differences
        .iter()
        .filter(|d| filter.admits(d.event))
        .filter(|d| matches_terms(&keyword.terms, &d.terms, keyword.slop))
        .map(|d| Match {
            event: d.event,
            keyword: keyword.original_input.clone(),
            text: d.text.clone(),
            snippet: d.snippet(snippet_offset).to_string(),
        })
        .collect();

    if !matches.is_empty() {
        debug!(keyword = %keyword, matches = matches.len(), "keyword_matched");
    }
    matches
}

/// Union of [`find_matches`] over several keywords.
pub fn find_all_matches<'a, I>(
    keywords: I,
    differences: &[Difference],
    filter: EventFilter,
    snippet_offset: usize,
) -> HashSet<Match>
where
    I: IntoIterator<Item = &'a Keyword>,
{
    if differences.is_empty() {
        return HashSet::new();
    }
    keywords
        .into_iter()
        .flat_map(|keyword| find_matches(keyword, differences, filter, snippet_offset))
        .collect()
}

/// True if `phrase` occurs in order within `window` under `slop`.
pub fn matches_terms<P, W>(phrase: &[P], window: &[W], slop: Slop) -> bool
where
    P: AsRef<str>,
    W: AsRef<str>,
{
    let Some((first, rest)) = phrase.split_first() else {
        return false;
    };
    if phrase.len() > window.len() {
        return false;
    }

    let mut reachable: Vec<bool> = window
        .iter()
        .map(|w| w.as_ref() == first.as_ref())
        .collect();

    for term in rest {
        let mut nearest: Option<usize> = None;
        let mut any = false;
        for (q, w) in window.iter().enumerate() {
            let was_reachable = reachable[q];
            reachable[q] = w.as_ref() == term.as_ref()
                && nearest.is_some_and(|p| slop.allows(q - p - 1));
            any |= reachable[q];
            if was_reachable {
                nearest = Some(q);
            }
        }
        if !any {
            return false;
        }
    }
    reachable.contains(&true)
}

#[cfg(test)]
mod tests;
