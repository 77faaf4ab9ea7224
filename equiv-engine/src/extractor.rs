//! Final equivalence decision per publisher
//!
//! Extractors receive one publisher's filtered candidates sorted by
//! descending score and pick the strong equivalents among them.

use chrono::Duration;
use equiv_common::{Broadcast, Content, Identified, RunReporter, ScoreThreshold, ScoredCandidate};
use tracing::debug;

/// Picks strong equivalents from one publisher's sorted candidates
pub trait EquivalenceExtractor<T>: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(
        &self,
        candidates: &[ScoredCandidate<T>],
        subject: &T,
        report: &RunReporter,
    ) -> Vec<ScoredCandidate<T>>;
}

/// The single best candidate, if its score passes the threshold
#[derive(Debug, Clone, Copy)]
pub struct TopScoringExtractor {
    threshold: ScoreThreshold,
}

impl TopScoringExtractor {
    pub fn new(threshold: ScoreThreshold) -> Self {
        Self { threshold }
    }
}

impl<T: Identified + Send + Sync> EquivalenceExtractor<T> for TopScoringExtractor {
    fn name(&self) -> &'static str {
        "Top-Scoring"
    }

    fn extract(
        &self,
        candidates: &[ScoredCandidate<T>],
        _subject: &T,
        report: &RunReporter,
    ) -> Vec<ScoredCandidate<T>> {
        match candidates.first() {
            Some(top) if self.threshold.passes(top.score) => {
                debug!(
                    subject = %report.subject(),
                    candidate = top.candidate.canonical_uri(),
                    score = %top.score,
                    "Extracted top candidate"
                );
                vec![top.clone()]
            }
            _ => Vec::new(),
        }
    }
}

/// Every candidate whose score passes the threshold
#[derive(Debug, Clone, Copy)]
pub struct AllOverThresholdExtractor {
    threshold: ScoreThreshold,
}

impl AllOverThresholdExtractor {
    pub fn new(threshold: ScoreThreshold) -> Self {
        Self { threshold }
    }
}

impl<T: Identified + Send + Sync> EquivalenceExtractor<T> for AllOverThresholdExtractor {
    fn name(&self) -> &'static str {
        "All-Over-Threshold"
    }

    fn extract(
        &self,
        candidates: &[ScoredCandidate<T>],
        _subject: &T,
        _report: &RunReporter,
    ) -> Vec<ScoredCandidate<T>> {
        candidates
            .iter()
            .filter(|c| self.threshold.passes(c.score))
            .cloned()
            .collect()
    }
}

/// Several equivalents from one publisher for a multiply-listed item
///
/// Applies to items only. Keeps the top candidate plus every other item
/// candidate scoring within 0.3 of it that has a broadcast contained in one
/// of the subject's broadcasts (or containing one), give or take five
/// minutes. Returns nothing unless at least two candidates qualify.
#[derive(Debug, Clone, Copy)]
pub struct MultipleCandidateExtractor {
    score_window: f64,
    broadcast_flexibility: Duration,
}

impl Default for MultipleCandidateExtractor {
    fn default() -> Self {
        Self {
            score_window: 0.3,
            broadcast_flexibility: Duration::minutes(5),
        }
    }
}

impl MultipleCandidateExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `inner` lies inside `outer`, widened by the flexibility
    fn contained(&self, inner: &Broadcast, outer: &Broadcast) -> bool {
        let starts_inside = outer
            .transmission_start
            .checked_sub_signed(self.broadcast_flexibility)
            .map_or(true, |lower| inner.transmission_start > lower);
        let ends_inside = outer
            .transmission_end
            .checked_add_signed(self.broadcast_flexibility)
            .map_or(true, |upper| inner.transmission_end < upper);
        starts_inside && ends_inside
    }

    fn broadcasts_overlap(&self, subject: &Content, candidate: &Content) -> bool {
        subject.broadcasts.iter().any(|s| {
            candidate
                .broadcasts
                .iter()
                .any(|c| self.contained(c, s) || self.contained(s, c))
        })
    }
}

impl EquivalenceExtractor<Content> for MultipleCandidateExtractor {
    fn name(&self) -> &'static str {
        "Multiple-Candidate"
    }

    fn extract(
        &self,
        candidates: &[ScoredCandidate<Content>],
        subject: &Content,
        report: &RunReporter,
    ) -> Vec<ScoredCandidate<Content>> {
        if subject.kind.is_container() {
            return Vec::new();
        }
        let Some(top) = candidates.first() else {
            return Vec::new();
        };
        let Some(top_score) = top.score.value() else {
            return Vec::new();
        };
        if top.candidate.kind.is_container() {
            return Vec::new();
        }

        let mut selected = vec![top.clone()];
        selected.extend(
            candidates
                .iter()
                .skip(1)
                .filter(|c| !c.candidate.kind.is_container())
                .filter(|c| {
                    c.score
                        .value()
                        .is_some_and(|s| (s - top_score).abs() < self.score_window)
                })
                .filter(|c| self.broadcasts_overlap(subject, &c.candidate))
                .cloned(),
        );

        if selected.len() > 1 {
            debug!(
                subject = %report.subject(),
                count = selected.len(),
                "Extracted multiple candidates from one publisher"
            );
            selected
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use equiv_common::reporter::NoopReporter;
    use equiv_common::{Publisher, Score};
    use std::sync::Arc;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 2, hour, minute, 0).unwrap()
    }

    fn aired(uri: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Content {
        Content::item(uri, Publisher::from(Publisher::PA))
            .with_broadcast(Broadcast::new("http://channel", start, end).unwrap())
    }

    fn scored(content: Content, score: f64) -> ScoredCandidate<Content> {
        ScoredCandidate::new(Arc::new(content), Score::of(score))
    }

    fn report() -> RunReporter {
        RunReporter::new("subject", Arc::new(NoopReporter))
    }

    #[test]
    fn test_top_scoring_requires_threshold() {
        let subject = aired("http://s", at(20, 0), at(21, 0));
        let extractor = TopScoringExtractor::new(ScoreThreshold::GreaterThan(0.5));
        let candidates = vec![
            scored(aired("http://a", at(20, 0), at(21, 0)), 0.9),
            scored(aired("http://b", at(20, 0), at(21, 0)), 0.8),
        ];
        let extracted = extractor.extract(&candidates, &subject, &report());
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].candidate.canonical_uri, "http://a");

        let weak = vec![scored(aired("http://a", at(20, 0), at(21, 0)), 0.4)];
        assert!(extractor.extract(&weak, &subject, &report()).is_empty());
    }

    #[test]
    fn test_all_over_threshold() {
        let subject = aired("http://s", at(20, 0), at(21, 0));
        let extractor = AllOverThresholdExtractor::new(ScoreThreshold::GreaterThanOrEqual(0.8));
        let candidates = vec![
            scored(aired("http://a", at(20, 0), at(21, 0)), 0.9),
            scored(aired("http://b", at(20, 0), at(21, 0)), 0.8),
            scored(aired("http://c", at(20, 0), at(21, 0)), 0.7),
        ];
        assert_eq!(extractor.extract(&candidates, &subject, &report()).len(), 2);
    }

    #[test]
    fn test_multiple_candidates_for_split_listing() {
        let subject = aired("http://s", at(20, 0), at(22, 0));
        let extractor = MultipleCandidateExtractor::new();
        let candidates = vec![
            scored(aired("http://part-1", at(20, 0), at(21, 0)), 1.0),
            scored(aired("http://part-2", at(21, 0), at(22, 0)), 0.9),
            scored(aired("http://elsewhere", at(23, 0), at(23, 30)), 0.95),
            scored(aired("http://weak", at(20, 0), at(21, 0)), 0.5),
        ];
        let extracted = extractor.extract(&candidates, &subject, &report());
        let uris: Vec<&str> = extracted
            .iter()
            .map(|c| c.candidate.canonical_uri.as_str())
            .collect();
        assert_eq!(uris, vec!["http://part-1", "http://part-2"]);
    }

    #[test]
    fn test_multiple_candidates_needs_two() {
        let subject = aired("http://s", at(20, 0), at(22, 0));
        let candidates = vec![scored(aired("http://only", at(20, 0), at(21, 0)), 1.0)];
        assert!(MultipleCandidateExtractor::new()
            .extract(&candidates, &subject, &report())
            .is_empty());

        let brand = Content::brand("http://brand", Publisher::from(Publisher::PA));
        assert!(MultipleCandidateExtractor::new()
            .extract(&candidates, &brand, &report())
            .is_empty());
    }
}
