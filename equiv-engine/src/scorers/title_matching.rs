//! Title-type-aware title scorer
//!
//! Rules by type pairing:
//! - identical raw titles: perfect match
//! - `SEQUENCE` vs `SEQUENCE`: perfect when the numbers agree, otherwise zero
//! - `DATE` vs `DATE`: perfect when the dates agree
//! - `DEFAULT` vs `DEFAULT`: normalised comparison
//! - typed vs `DEFAULT`: the typed token is stripped and the remainder compared
//!   as a default title
//!
//! Anything else scores the configured mismatch score.

use super::EquivalenceScorer;
use crate::title::{remove_postfixes, TitleNormalizer, TitleType};
use equiv_common::{Content, Result, RunReporter, Score, ScoredCandidates};
use std::sync::Arc;
use tracing::debug;

pub struct TitleMatchingScorer {
    normalizer: TitleNormalizer,
    perfect: Score,
    partial: Score,
    mismatch: Score,
    sequence_mismatch: Score,
    partial_colon_match: bool,
}

impl Default for TitleMatchingScorer {
    fn default() -> Self {
        Self {
            normalizer: TitleNormalizer::standard(),
            perfect: Score::of(2.0),
            partial: Score::ONE,
            mismatch: Score::NULL,
            sequence_mismatch: Score::ZERO,
            partial_colon_match: false,
        }
    }
}

impl TitleMatchingScorer {
    pub const NAME: &'static str = "Title";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mismatch_score(mut self, score: Score) -> Self {
        self.mismatch = score;
        self
    }

    pub fn with_perfect_score(mut self, score: Score) -> Self {
        self.perfect = score;
        self
    }

    /// Score titles agreeing up to a colon with `score` instead of mismatching
    pub fn with_partial_colon_match(mut self, score: Score) -> Self {
        self.partial_colon_match = true;
        self.partial = score;
        self
    }

    /// Score one subject/candidate pair
    pub fn score_pair(&self, subject: &Content, candidate: &Content) -> Score {
        let (Some(subject_title), Some(candidate_title)) = (subject.title(), candidate.title())
        else {
            return Score::NULL;
        };

        if !has_word_char(subject_title) || !has_word_char(candidate_title) {
            return self.mismatch;
        }

        if subject_title == candidate_title {
            return self.perfect;
        }

        let subject_type = TitleType::of(subject_title);
        let candidate_type = TitleType::of(candidate_title);

        match (subject_type, candidate_type) {
            (TitleType::Sequence(a), TitleType::Sequence(b)) => {
                if a == b {
                    self.perfect
                } else {
                    self.sequence_mismatch
                }
            }
            (TitleType::Date(a), TitleType::Date(b)) => {
                if a == b {
                    self.perfect
                } else {
                    self.mismatch
                }
            }
            (TitleType::Default, _) | (_, TitleType::Default) => {
                // Date and sequence tokens span the whole title, so a typed
                // side has nothing left once its token is stripped
                let subject_text = default_text(subject_type, subject_title, subject.year);
                let candidate_text = default_text(candidate_type, candidate_title, candidate.year);
                self.compare_default(&subject_text, &candidate_text)
            }
            _ => self.mismatch,
        }
    }

    fn compare_default(&self, subject: &str, candidate: &str) -> Score {
        if self.normalizer.titles_match(subject, candidate) {
            self.perfect
        } else if self.partial_colon_match
            && self.normalizer.colon_prefix_match(subject, candidate)
        {
            self.partial
        } else {
            self.mismatch
        }
    }
}

fn default_text(title_type: TitleType, title: &str, year: Option<i32>) -> String {
    if title_type.is_default() {
        remove_postfixes(title, year)
    } else {
        String::new()
    }
}

fn has_word_char(title: &str) -> bool {
    title.chars().any(char::is_alphanumeric)
}

impl EquivalenceScorer for TitleMatchingScorer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn score(
        &self,
        subject: &Content,
        candidates: &[Arc<Content>],
        report: &RunReporter,
    ) -> Result<ScoredCandidates<Content>> {
        if subject.title().is_none() {
            debug!(subject = %report.subject(), "No title on subject, all candidates score null");
        }

        let mut scores = ScoredCandidates::from_source(Self::NAME);
        for candidate in candidates {
            let score = self.score_pair(subject, candidate);
            debug!(
                subject = %report.subject(),
                candidate = %candidate.canonical_uri,
                title = candidate.title().unwrap_or_default(),
                %score,
                "Scored title"
            );
            scores.add(Arc::clone(candidate), score);
        }
        Ok(scores.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equiv_common::reporter::NoopReporter;
    use equiv_common::Publisher;

    fn item(uri: &str, title: &str) -> Content {
        Content::item(uri, Publisher::from(Publisher::PA)).with_title(title)
    }

    fn score(a: &str, b: &str) -> Score {
        TitleMatchingScorer::new().score_pair(&item("http://a", a), &item("http://b", b))
    }

    const PERFECT: Score = Score::Value(2.0);

    #[test]
    fn test_identical_titles_are_perfect() {
        assert_eq!(score("Kinross", "Kinross"), PERFECT);
    }

    #[test]
    fn test_sequence_titles() {
        assert_eq!(score("Episode 1", "Episode: 1"), PERFECT);
        assert_eq!(score("Episode 1", "Episode - 1"), PERFECT);
        assert_eq!(score("Episode 1", "Episode 5"), Score::ZERO);
    }

    #[test]
    fn test_date_titles() {
        assert_eq!(score("09/10/2011", "9/10/2011"), PERFECT);
        assert_eq!(score("9/10/11", "09/10/2011"), PERFECT);
        assert_eq!(score("09/10/2011", "10/10/2011"), Score::NULL);
    }

    #[test]
    fn test_typed_against_default_strips_token() {
        assert_eq!(score("Episode 1", "Kinross"), Score::NULL);
        assert_eq!(score("09/10/2011", "Kinross"), Score::NULL);
        assert_eq!(score("Episode 1", "09/10/2011"), Score::NULL);
    }

    #[test]
    fn test_default_titles() {
        assert_eq!(score("Kinross", "2. Kinross"), PERFECT);
        assert_eq!(score("The Great Escape", "Great Escape"), PERFECT);
        assert_eq!(score("Foo / Bar", "Foo/Bar"), PERFECT);
        assert_eq!(score("B&Q", "BandQ"), Score::NULL);
    }

    #[test]
    fn test_year_postfix_removed_for_own_year() {
        let scorer = TitleMatchingScorer::new();
        let film = item("http://a", "Heat (1995)").with_year(1995);
        assert_eq!(scorer.score_pair(&film, &item("http://b", "Heat")), PERFECT);
    }

    #[test]
    fn test_missing_or_separator_titles() {
        let scorer = TitleMatchingScorer::new().with_mismatch_score(Score::ZERO);
        let untitled = Content::item("http://a", Publisher::from(Publisher::PA));
        assert_eq!(scorer.score_pair(&untitled, &item("http://b", "X")), Score::NULL);
        assert_eq!(
            scorer.score_pair(&item("http://a", "--"), &item("http://b", "--")),
            Score::ZERO
        );
    }

    #[test]
    fn test_partial_colon_match_is_opt_in() {
        let subject = item("http://a", "Storyville: The Crash");
        let candidate = item("http://b", "Storyville");
        assert_eq!(TitleMatchingScorer::new().score_pair(&subject, &candidate), Score::NULL);

        let scorer = TitleMatchingScorer::new().with_partial_colon_match(Score::ONE);
        assert_eq!(scorer.score_pair(&subject, &candidate), Score::ONE);
    }

    #[test]
    fn test_score_covers_every_candidate() {
        let scorer = TitleMatchingScorer::new();
        let report = RunReporter::new("http://a", Arc::new(NoopReporter));
        let candidates = vec![
            Arc::new(item("http://b", "Kinross")),
            Arc::new(item("http://c", "Other")),
        ];
        let scores = scorer
            .score(&item("http://a", "Kinross"), &candidates, &report)
            .unwrap();
        assert_eq!(scores.source(), "Title");
        assert_eq!(scores.score_for("http://b"), PERFECT);
        assert!(scores.contains("http://c"));
        assert_eq!(scores.score_for("http://c"), Score::NULL);
    }
}
