//! Author prestige scoring and top-paper selection.
//!
//! A paper is scored by its most established author. Only the first and last
//! author are looked up, since those positions usually hold the lead and the
//! senior author. Unresolved authors count as `(0, 0)`, so a paper nobody
//! could look up still competes with a neutral score.

use crate::config::PrestigeWeights;
use crate::scholar::ScholarLookup;
use crate::sources::PaperMetadata;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Bibliometrics for one author (or the best of a paper's authors).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorStats {
    pub h_index: u32,
    pub citations: u64,
}

impl AuthorStats {
    pub fn new(h_index: u32, citations: u64) -> Self {
        Self { h_index, citations }
    }

    /// Component-wise maximum.
    pub fn max(self, other: Self) -> Self {
        Self {
            h_index: self.h_index.max(other.h_index),
            citations: self.citations.max(other.citations),
        }
    }
}

/// `alpha * h_index + beta * ln(citations + 1)`. Zero for `(0, 0)`.
pub fn author_prestige(stats: AuthorStats, weights: PrestigeWeights) -> f64 {
    weights.alpha * f64::from(stats.h_index) + weights.beta * (stats.citations as f64).ln_1p()
}

/// The authors worth looking up: first and last, once each.
pub fn lookup_targets(authors: &[String]) -> Vec<&str> {
    match authors {
        [] => Vec::new(),
        [only] => vec![only.as_str()],
        [first, .., last] => vec![first.as_str(), last.as_str()],
    }
}

/// Max h-index and max citations over the resolved authors.
pub fn paper_stats(resolved: &[Option<AuthorStats>]) -> AuthorStats {
    resolved
        .iter()
        .flatten()
        .fold(AuthorStats::default(), |acc, s| acc.max(*s))
}

/// The score a paper must reach to be kept: the score at rank
/// `min(top_n, len - 1)` counted from the highest. `None` for no scores.
pub fn cutoff(scores: &[f64], top_n: usize) -> Option<f64> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let rank = top_n.min(sorted.len().saturating_sub(1)).max(1);
    sorted.get(rank - 1).copied()
}

/// Indices of the papers at or above the cutoff, in their original order.
/// Ties at the cutoff are all kept.
pub fn select_top(scores: &[f64], top_n: usize) -> Vec<usize> {
    let Some(threshold) = cutoff(scores, top_n) else {
        return Vec::new();
    };
    scores
        .iter()
        .enumerate()
        .filter(|(_, score)| **score >= threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Look up each paper's first and last author and score it.
///
/// Lookups run one at a time with `delay` between consecutive requests.
/// Returns one score per paper, in input order.
pub async fn score_papers(
    scholar: &dyn ScholarLookup,
    papers: &[PaperMetadata],
    weights: PrestigeWeights,
    delay: Duration,
) -> Vec<f64> {
    let mut scores = Vec::with_capacity(papers.len());
    let mut first_lookup = true;

    for paper in papers {
        let mut resolved = Vec::new();
        for author in lookup_targets(&paper.authors) {
            if !first_lookup && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            first_lookup = false;
            resolved.push(scholar.lookup(author).await);
        }

        let stats = paper_stats(&resolved);
        let score = author_prestige(stats, weights);
        debug!(
            "Scored \"{}\": h-index {}, citations {}, prestige {score:.2}",
            paper.title, stats.h_index, stats.citations
        );
        scores.push(score);
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authors(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn prestige_formula() {
        let weights = PrestigeWeights::default();
        assert_eq!(author_prestige(AuthorStats::default(), weights), 0.0);

        let score = author_prestige(AuthorStats::new(10, 99), weights);
        let expected = 10.0 + 2.0 * 100f64.ln();
        assert!((score - expected).abs() < 1e-9);

        let h_only = PrestigeWeights {
            alpha: 1.0,
            beta: 0.0,
        };
        assert_eq!(author_prestige(AuthorStats::new(7, 5000), h_only), 7.0);
    }

    #[test]
    fn only_first_and_last_authors_are_looked_up() {
        assert!(lookup_targets(&[]).is_empty());
        assert_eq!(lookup_targets(&authors(&["Ada"])), vec!["Ada"]);
        assert_eq!(lookup_targets(&authors(&["Ada", "Bo"])), vec!["Ada", "Bo"]);
        assert_eq!(
            lookup_targets(&authors(&["Ada", "Bo", "Cy", "Di"])),
            vec!["Ada", "Di"]
        );
    }

    #[test]
    fn paper_stats_take_maxima_independently() {
        let stats = paper_stats(&[
            Some(AuthorStats::new(40, 1_000)),
            None,
            Some(AuthorStats::new(12, 90_000)),
        ]);
        assert_eq!(stats, AuthorStats::new(40, 90_000));
        assert_eq!(paper_stats(&[None, None]), AuthorStats::default());
        assert_eq!(paper_stats(&[]), AuthorStats::default());
    }

    #[test]
    fn cutoff_is_rank_top_n_from_the_top() {
        let scores: Vec<f64> = (0..100).map(f64::from).collect();
        // 50th highest of 0..=99 is 50.
        assert_eq!(cutoff(&scores, 50), Some(50.0));
        assert_eq!(select_top(&scores, 50).len(), 50);
    }

    #[test]
    fn small_batches_drop_only_the_lowest() {
        let scores = [3.0, 9.0, 1.0, 5.0];
        assert_eq!(cutoff(&scores, 50), Some(3.0));
        assert_eq!(select_top(&scores, 50), vec![0, 1, 3]);
    }

    #[test]
    fn single_paper_is_kept_and_empty_selects_nothing() {
        assert_eq!(select_top(&[0.0], 50), vec![0]);
        assert_eq!(cutoff(&[], 50), None);
        assert!(select_top(&[], 50).is_empty());
    }

    #[test]
    fn ties_at_the_cutoff_are_kept() {
        let scores = [4.0, 2.0, 2.0, 2.0, 1.0];
        // top_n = 2: the 2nd highest is 2.0, and every 2.0 stays.
        assert_eq!(select_top(&scores, 2), vec![0, 1, 2, 3]);
    }
}
