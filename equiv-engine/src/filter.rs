//! Candidate filters applied after combining

use equiv_common::{Identified, RunReporter, ScoreThreshold, ScoredCandidate};
use std::collections::BTreeSet;
use tracing::debug;

/// Prunes combined candidates
pub trait EquivalenceFilter<T>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Human-readable description recorded in pipeline metadata
    fn describe(&self) -> String {
        self.name().to_string()
    }

    fn apply(
        &self,
        candidates: Vec<ScoredCandidate<T>>,
        subject: &T,
        report: &RunReporter,
    ) -> Vec<ScoredCandidate<T>>;
}

fn retain_logged<T: Identified>(
    filter: &'static str,
    candidates: Vec<ScoredCandidate<T>>,
    report: &RunReporter,
    keep: impl Fn(&ScoredCandidate<T>) -> bool,
) -> Vec<ScoredCandidate<T>> {
    candidates
        .into_iter()
        .filter(|c| {
            let kept = keep(c);
            if !kept {
                debug!(
                    subject = %report.subject(),
                    candidate = c.candidate.canonical_uri(),
                    filter,
                    "Candidate removed"
                );
            }
            kept
        })
        .collect()
}

/// Keeps candidates whose score passes a threshold
#[derive(Debug, Clone, Copy)]
pub struct MinimumScoreFilter {
    threshold: ScoreThreshold,
}

impl MinimumScoreFilter {
    pub fn new(threshold: ScoreThreshold) -> Self {
        Self { threshold }
    }
}

impl<T: Identified + Send + Sync> EquivalenceFilter<T> for MinimumScoreFilter {
    fn name(&self) -> &'static str {
        "Minimum-Score"
    }

    fn describe(&self) -> String {
        format!("Minimum-Score[{}]", self.threshold)
    }

    fn apply(
        &self,
        candidates: Vec<ScoredCandidate<T>>,
        _subject: &T,
        report: &RunReporter,
    ) -> Vec<ScoredCandidate<T>> {
        retain_logged("Minimum-Score", candidates, report, |c| self.threshold.passes(c.score))
    }
}

/// Drops explicitly excluded candidates by URI or id
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    uris: BTreeSet<String>,
    ids: BTreeSet<u64>,
}

impl ExclusionFilter {
    pub fn new(uris: BTreeSet<String>, ids: BTreeSet<u64>) -> Self {
        Self { uris, ids }
    }

    pub fn excludes<T: Identified>(&self, content: &T) -> bool {
        self.uris.contains(content.canonical_uri())
            || content.id().is_some_and(|id| self.ids.contains(&id))
    }
}

impl<T: Identified + Send + Sync> EquivalenceFilter<T> for ExclusionFilter {
    fn name(&self) -> &'static str {
        "Exclusion"
    }

    fn apply(
        &self,
        candidates: Vec<ScoredCandidate<T>>,
        _subject: &T,
        report: &RunReporter,
    ) -> Vec<ScoredCandidate<T>> {
        retain_logged("Exclusion", candidates, report, |c| !self.excludes(c.candidate.as_ref()))
    }
}

/// Drops candidates from the subject's own publisher
#[derive(Debug, Clone, Copy, Default)]
pub struct SamePublisherFilter;

impl<T: Identified + Send + Sync> EquivalenceFilter<T> for SamePublisherFilter {
    fn name(&self) -> &'static str {
        "Same-Publisher"
    }

    fn apply(
        &self,
        candidates: Vec<ScoredCandidate<T>>,
        subject: &T,
        report: &RunReporter,
    ) -> Vec<ScoredCandidate<T>> {
        retain_logged("Same-Publisher", candidates, report, |c| {
            c.candidate.publisher() != subject.publisher()
        })
    }
}

/// Applies filters in order; a candidate survives only if every filter keeps it
pub struct FilterChain<T> {
    filters: Vec<Box<dyn EquivalenceFilter<T>>>,
}

impl<T> FilterChain<T> {
    pub fn new(filters: Vec<Box<dyn EquivalenceFilter<T>>>) -> Self {
        Self { filters }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<T: Identified + Send + Sync> EquivalenceFilter<T> for FilterChain<T> {
    fn name(&self) -> &'static str {
        "Conjunctive"
    }

    fn describe(&self) -> String {
        let members: Vec<String> = self.filters.iter().map(|f| f.describe()).collect();
        format!("ConjunctiveFilter[{}]", members.join(", "))
    }

    fn apply(
        &self,
        candidates: Vec<ScoredCandidate<T>>,
        subject: &T,
        report: &RunReporter,
    ) -> Vec<ScoredCandidate<T>> {
        self.filters
            .iter()
            .fold(candidates, |remaining, filter| filter.apply(remaining, subject, report))
    }
}
