//! String similarity scoring for the fuzzy stage.

use std::collections::BTreeSet;
use std::fmt::Debug;

/// Scores the similarity of two normalized names on a 0-100 scale.
pub trait SimilarityScorer: Send + Sync + Debug {
    /// Similarity of `a` and `b`, where 100 means equivalent.
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Token-set ratio: word order and repeated words are ignored, and a name
/// whose words are a subset of the other's scores 100.
///
/// Both names are split into word sets. The sorted intersection forms a
/// common prefix which is compared against the prefix extended by each
/// side's remaining words; the best of the three pairwise Levenshtein ratios
/// is the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSetScorer;

impl TokenSetScorer {
    /// Creates the scorer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SimilarityScorer for TokenSetScorer {
    fn score(&self, a: &str, b: &str) -> f64 {
        token_set_ratio(a, b)
    }
}

/// Token-set ratio of two strings, 0-100.
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let left: BTreeSet<&str> = a.split_whitespace().collect();
    let right: BTreeSet<&str> = b.split_whitespace().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let common = join(left.intersection(&right).copied());
    let only_left = join(left.difference(&right).copied());
    let only_right = join(right.difference(&left).copied());

    if !common.is_empty() && (only_left.is_empty() || only_right.is_empty()) {
        return 100.0;
    }

    let with_left = concat(&common, &only_left);
    let with_right = concat(&common, &only_right);

    let mut best = strsim::normalized_levenshtein(&with_left, &with_right);
    if !common.is_empty() {
        best = best
            .max(strsim::normalized_levenshtein(&common, &with_left))
            .max(strsim::normalized_levenshtein(&common, &with_right));
    }
    best * 100.0
}

fn join<'a>(words: impl Iterator<Item = &'a str>) -> String {
    words.collect::<Vec<_>>().join(" ")
}

fn concat(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}
