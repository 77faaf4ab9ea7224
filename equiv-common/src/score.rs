//! Scores and scored candidate sets
//!
//! A [`Score`] is either a finite value in `[Score::MIN, Score::MAX]` or the
//! null score, meaning "no evidence either way". Null is not zero: zero is a
//! valid mismatch score.

use crate::model::Identified;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Confidence score produced by a generator, scorer or combiner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    /// No opinion
    #[default]
    Null,
    /// Real-valued confidence
    Value(f64),
}

impl Score {
    pub const MIN: f64 = -10.0;
    pub const MAX: f64 = 10.0;

    pub const NULL: Score = Score::Null;
    pub const ZERO: Score = Score::Value(0.0);
    pub const ONE: Score = Score::Value(1.0);

    /// Create a score, clamping to the supported range
    ///
    /// Non-finite input yields the null score.
    pub fn of(value: f64) -> Self {
        if value.is_finite() {
            Score::Value(value.clamp(Self::MIN, Self::MAX))
        } else {
            Score::Null
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Score::Value(_))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Value(v) => Some(*v),
            Score::Null => None,
        }
    }

    /// Sum two scores; null is the identity
    pub fn add(self, other: Score) -> Score {
        match (self, other) {
            (Score::Null, s) | (s, Score::Null) => s,
            (Score::Value(a), Score::Value(b)) => Score::of(a + b),
        }
    }

    /// Apply `f` to a real score; null stays null
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Score {
        match self {
            Score::Value(v) => Score::of(f(v)),
            Score::Null => Score::Null,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Null => write!(f, "null"),
            Score::Value(v) => write!(f, "{v:.3}"),
        }
    }
}

// ============================================================================
// Thresholds
// ============================================================================

/// Threshold a score must pass; null never passes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreThreshold {
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
}

impl ScoreThreshold {
    /// Any strictly positive score
    pub const POSITIVE: ScoreThreshold = ScoreThreshold::GreaterThan(0.0);

    pub fn passes(&self, score: Score) -> bool {
        match (self, score) {
            (_, Score::Null) => false,
            (ScoreThreshold::GreaterThan(t), Score::Value(v)) => v > *t,
            (ScoreThreshold::GreaterThanOrEqual(t), Score::Value(v)) => v >= *t,
        }
    }
}

impl fmt::Display for ScoreThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreThreshold::GreaterThan(t) => write!(f, "> {t}"),
            ScoreThreshold::GreaterThanOrEqual(t) => write!(f, ">= {t}"),
        }
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// A candidate paired with the score one stage gave it
#[derive(Debug)]
pub struct ScoredCandidate<T> {
    pub candidate: Arc<T>,
    pub score: Score,
}

impl<T> Clone for ScoredCandidate<T> {
    fn clone(&self) -> Self {
        Self {
            candidate: Arc::clone(&self.candidate),
            score: self.score,
        }
    }
}

impl<T> ScoredCandidate<T> {
    pub fn new(candidate: Arc<T>, score: Score) -> Self {
        Self { candidate, score }
    }
}

/// Immutable candidate → score mapping produced by one named source
///
/// Keyed by canonical URI so identity is stable across publishers and
/// independent of which `Arc` a stage happened to hold.
#[derive(Debug)]
pub struct ScoredCandidates<T> {
    source: String,
    candidates: BTreeMap<String, ScoredCandidate<T>>,
}

impl<T> Clone for ScoredCandidates<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            candidates: self.candidates.clone(),
        }
    }
}

impl<T: Identified> ScoredCandidates<T> {
    /// Start building a candidate set attributed to `source`
    pub fn from_source(source: impl Into<String>) -> ScoredCandidatesBuilder<T> {
        ScoredCandidatesBuilder {
            source: source.into(),
            candidates: BTreeMap::new(),
        }
    }

    pub fn empty(source: impl Into<String>) -> Self {
        Self::from_source(source).build()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Score for a candidate URI; absence reads as the null score
    pub fn score_for(&self, uri: &str) -> Score {
        self.candidates
            .get(uri)
            .map(|c| c.score)
            .unwrap_or(Score::NULL)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.candidates.contains_key(uri)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredCandidate<T>> {
        self.candidates.values()
    }

    pub fn into_candidates(self) -> Vec<ScoredCandidate<T>> {
        self.candidates.into_values().collect()
    }

    /// Candidates ordered by descending score, nulls last, ties by URI
    pub fn ordered_by_score(&self) -> Vec<ScoredCandidate<T>> {
        let mut ordered: Vec<_> = self.candidates.values().cloned().collect();
        sort_by_score(&mut ordered);
        ordered
    }

    /// URI → stringified score, the shape the result reporter records
    pub fn to_report(&self) -> BTreeMap<String, String> {
        self.candidates
            .iter()
            .map(|(uri, c)| (uri.clone(), c.score.to_string()))
            .collect()
    }
}

/// Sort candidates by descending score with nulls last and URI tie-break
pub fn sort_by_score<T: Identified>(candidates: &mut [ScoredCandidate<T>]) {
    candidates.sort_by(|a, b| {
        let ordering = match (a.score.value(), b.score.value()) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        ordering.then_with(|| {
            a.candidate
                .canonical_uri()
                .cmp(b.candidate.canonical_uri())
        })
    });
}

/// Accumulates scores for a [`ScoredCandidates`]
///
/// Adding the same candidate twice sums the scores.
pub struct ScoredCandidatesBuilder<T> {
    source: String,
    candidates: BTreeMap<String, ScoredCandidate<T>>,
}

impl<T: Identified> ScoredCandidatesBuilder<T> {
    pub fn add_equivalent(mut self, candidate: Arc<T>, score: Score) -> Self {
        self.add(candidate, score);
        self
    }

    pub fn add(&mut self, candidate: Arc<T>, score: Score) {
        let uri = candidate.canonical_uri().to_string();
        self.candidates
            .entry(uri)
            .and_modify(|existing| existing.score = existing.score.add(score))
            .or_insert_with(|| ScoredCandidate::new(candidate, score));
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn build(self) -> ScoredCandidates<T> {
        ScoredCandidates {
            source: self.source,
            candidates: self.candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Content, Publisher};

    fn item(uri: &str) -> Arc<Content> {
        Arc::new(Content::item(uri, Publisher::from(Publisher::PA)))
    }

    #[test]
    fn test_null_is_additive_identity() {
        assert_eq!(Score::NULL.add(Score::ONE), Score::ONE);
        assert_eq!(Score::ONE.add(Score::NULL), Score::ONE);
        assert_eq!(Score::NULL.add(Score::NULL), Score::NULL);
        assert_eq!(Score::ONE.add(Score::ONE), Score::of(2.0));
    }

    #[test]
    fn test_null_is_not_zero() {
        assert_ne!(Score::NULL, Score::ZERO);
        assert!(Score::ZERO.is_real());
        assert!(!Score::NULL.is_real());
    }

    #[test]
    fn test_non_finite_becomes_null_and_range_clamped() {
        assert_eq!(Score::of(f64::NAN), Score::NULL);
        assert_eq!(Score::of(f64::INFINITY), Score::NULL);
        assert_eq!(Score::of(1e9), Score::Value(Score::MAX));
        assert_eq!(Score::of(-1e9), Score::Value(Score::MIN));
    }

    #[test]
    fn test_threshold_never_passes_null() {
        assert!(!ScoreThreshold::POSITIVE.passes(Score::NULL));
        assert!(!ScoreThreshold::POSITIVE.passes(Score::ZERO));
        assert!(ScoreThreshold::GreaterThanOrEqual(0.0).passes(Score::ZERO));
        assert!(ScoreThreshold::GreaterThan(0.2).passes(Score::of(0.3)));
    }

    #[test]
    fn test_builder_sums_repeated_candidates() {
        let a = item("http://pa/a");
        let scores = ScoredCandidates::from_source("test")
            .add_equivalent(a.clone(), Score::of(0.5))
            .add_equivalent(a, Score::of(0.25))
            .add_equivalent(item("http://pa/b"), Score::NULL)
            .build();

        assert_eq!(scores.len(), 2);
        assert_eq!(scores.score_for("http://pa/a"), Score::of(0.75));
        assert_eq!(scores.score_for("http://pa/b"), Score::NULL);
        assert_eq!(scores.score_for("http://pa/missing"), Score::NULL);
    }

    #[test]
    fn test_ordered_by_score_puts_nulls_last() {
        let scores = ScoredCandidates::from_source("test")
            .add_equivalent(item("http://pa/null"), Score::NULL)
            .add_equivalent(item("http://pa/low"), Score::of(0.1))
            .add_equivalent(item("http://pa/high"), Score::of(0.9))
            .build();

        let uris: Vec<_> = scores
            .ordered_by_score()
            .into_iter()
            .map(|c| c.candidate.canonical_uri().to_string())
            .collect();
        assert_eq!(uris, vec!["http://pa/high", "http://pa/low", "http://pa/null"]);
    }
}
