//! Score combiners
//!
//! A combiner folds the per-source candidate sets of generators and scorers
//! into a single candidate set.

use equiv_common::{Identified, Publisher, Score, ScoreThreshold, ScoredCandidate, ScoredCandidates};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Folds several scored candidate sets into one
pub trait ScoreCombiner<T>: Send + Sync {
    fn name(&self) -> &'static str;

    fn combine(&self, scores: &[ScoredCandidates<T>]) -> ScoredCandidates<T>;
}

fn joined_sources<T: Identified>(scores: &[ScoredCandidates<T>]) -> String {
    scores
        .iter()
        .map(|s| s.source())
        .collect::<Vec<_>>()
        .join("/")
}

/// Averages real scores, ignoring sources that gave a null score
///
/// The divisor is the largest number of real scores any candidate from the
/// same publisher received, so a candidate nobody else scored is not
/// rewarded for the silence of the other sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScoreAwareAveragingCombiner {
    ignore_null_scoring_candidate: bool,
}

impl NullScoreAwareAveragingCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score 0 for candidates whose publisher only ever got one real score
    pub fn ignoring_null_scoring_candidates() -> Self {
        Self {
            ignore_null_scoring_candidate: true,
        }
    }
}

struct Tally<T> {
    candidate: Arc<T>,
    total: Score,
    count: usize,
}

impl<T: Identified + Send + Sync> ScoreCombiner<T> for NullScoreAwareAveragingCombiner {
    fn name(&self) -> &'static str {
        "Null-Score-Aware-Averaging"
    }

    fn combine(&self, scores: &[ScoredCandidates<T>]) -> ScoredCandidates<T> {
        let mut tallies: BTreeMap<String, Tally<T>> = BTreeMap::new();
        for source in scores {
            for scored in source.iter() {
                let tally = tallies
                    .entry(scored.candidate.canonical_uri().to_string())
                    .or_insert_with(|| Tally {
                        candidate: Arc::clone(&scored.candidate),
                        total: Score::NULL,
                        count: 0,
                    });
                tally.total = tally.total.add(scored.score);
                if scored.score.is_real() {
                    tally.count += 1;
                }
            }
        }

        let mut publisher_counts: BTreeMap<Publisher, usize> = BTreeMap::new();
        for tally in tallies.values() {
            let max = publisher_counts
                .entry(tally.candidate.publisher().clone())
                .or_insert(0);
            *max = (*max).max(tally.count);
        }

        let mut combined = ScoredCandidates::from_source(joined_sources(scores));
        for (uri, tally) in tallies {
            let count = publisher_counts
                .get(tally.candidate.publisher())
                .copied()
                .unwrap_or(1)
                .max(1);
            let score = match tally.total {
                Score::Null => Score::NULL,
                Score::Value(_) if self.ignore_null_scoring_candidate && count == 1 => {
                    debug!(candidate = %uri, "Only one real score for publisher, scoring zero");
                    Score::ZERO
                }
                total => total.map(|v| v / count as f64),
            };
            combined.add(tally.candidate, score);
        }
        combined.build()
    }
}

/// Nulls combined scores of candidates no required source scored highly enough
pub struct RequiredScoreFilteringCombiner<T> {
    delegate: Box<dyn ScoreCombiner<T>>,
    required_sources: Vec<String>,
    threshold: ScoreThreshold,
}

impl<T> RequiredScoreFilteringCombiner<T> {
    /// Require a positive score from at least one of `required_sources`
    pub fn new<I, S>(delegate: Box<dyn ScoreCombiner<T>>, required_sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            delegate,
            required_sources: required_sources.into_iter().map(Into::into).collect(),
            threshold: ScoreThreshold::POSITIVE,
        }
    }

    pub fn with_threshold(mut self, threshold: ScoreThreshold) -> Self {
        self.threshold = threshold;
        self
    }
}

impl<T: Identified + Send + Sync> ScoreCombiner<T> for RequiredScoreFilteringCombiner<T> {
    fn name(&self) -> &'static str {
        "Required-Score-Filtering"
    }

    fn combine(&self, scores: &[ScoredCandidates<T>]) -> ScoredCandidates<T> {
        let combined = self.delegate.combine(scores);
        let required: Vec<&ScoredCandidates<T>> = scores
            .iter()
            .filter(|s| self.required_sources.iter().any(|r| r == s.source()))
            .collect();

        let mut filtered = ScoredCandidates::from_source(combined.source());
        for ScoredCandidate { candidate, score } in combined.into_candidates() {
            let uri = candidate.canonical_uri();
            let passes = required
                .iter()
                .any(|source| self.threshold.passes(source.score_for(uri)));
            let score = if passes {
                score
            } else {
                debug!(candidate = %uri, "No required source passed, nulling score");
                Score::NULL
            };
            filtered.add(candidate, score);
        }
        filtered.build()
    }
}
