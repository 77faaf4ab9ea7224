//! Token-subset title scorers
//!
//! One scorer, [`BroadcastTitleScorer`], parameterised by a
//! [`TitleComparator`] deciding whether two titles match. Comparators share
//! the same shape: case-fold, tokenise, drop stop words, then measure how
//! much of the shorter title the longer one covers.

use super::EquivalenceScorer;
use crate::cache::ContainerTitleCache;
use crate::title::spell_number;
use equiv_common::{ChannelSet, Content, Error, Result, RunReporter, Score, ScoredCandidates};
use std::collections::BTreeSet;
use std::sync::Arc;
use strsim::normalized_levenshtein;
use tracing::debug;

const STOP_WORDS: &[&str] = &["the", "in", "a", "an", "and", "of", "to", "show", "new"];

const DEFAULT_THRESHOLD_PERCENT: u8 = 80;
const MIN_SHARED_TOKENS: usize = 2;

/// Outcome of comparing two titles
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TitleComparison {
    /// Equal ignoring case and surrounding whitespace
    Exact,
    /// Enough significant tokens in common
    Subset { shared: usize, confidence: f64 },
    /// Single token spelling out the other title's initials
    Acronym,
    Mismatch,
}

impl TitleComparison {
    pub fn is_match(&self) -> bool {
        !matches!(self, TitleComparison::Mismatch)
    }
}

/// Decides whether two titles name the same programme
pub trait TitleComparator: Send + Sync {
    /// Name of the scorer built on this comparator
    fn name(&self) -> &'static str;

    fn compare(&self, subject: &str, candidate: &str) -> TitleComparison;

    fn titles_match(&self, subject: &str, candidate: &str) -> bool {
        self.compare(subject, candidate).is_match()
    }
}

/// Threshold and stop words shared by the subset comparators
#[derive(Debug, Clone)]
struct SubsetRule {
    threshold: f64,
    stop_words: BTreeSet<&'static str>,
    min_shared: usize,
}

impl SubsetRule {
    fn new(threshold_percent: u8, extra_stop_words: &[&'static str]) -> Result<Self> {
        if threshold_percent > 100 {
            return Err(Error::InvalidInput(format!(
                "title threshold must be between 0 and 100, got {threshold_percent}"
            )));
        }
        Ok(Self::unchecked(threshold_percent, extra_stop_words))
    }

    fn unchecked(threshold_percent: u8, extra_stop_words: &[&'static str]) -> Self {
        Self {
            threshold: f64::from(threshold_percent) / 100.0,
            stop_words: STOP_WORDS
                .iter()
                .chain(extra_stop_words)
                .copied()
                .collect(),
            min_shared: MIN_SHARED_TOKENS,
        }
    }

    fn significant(&self, tokens: impl Iterator<Item = String>) -> Vec<String> {
        let mut seen = BTreeSet::new();
        tokens
            .filter(|t| !t.is_empty() && !self.stop_words.contains(t.as_str()))
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    /// Compare token lists, `matches` deciding when two tokens are the same word
    fn compare(
        &self,
        subject: &str,
        candidate: &str,
        subject_tokens: &[String],
        candidate_tokens: &[String],
        matches: impl Fn(&str, &str) -> bool,
    ) -> TitleComparison {
        if exactly_equal(subject, candidate) {
            return TitleComparison::Exact;
        }

        let (shorter, longer) = if subject_tokens.len() <= candidate_tokens.len() {
            (subject_tokens, candidate_tokens)
        } else {
            (candidate_tokens, subject_tokens)
        };
        if shorter.is_empty() {
            return TitleComparison::Mismatch;
        }

        let shared = shorter
            .iter()
            .filter(|token| longer.iter().any(|other| matches(token, other)))
            .count();
        let confidence = shared as f64 / shorter.len() as f64;

        if shared >= self.min_shared && confidence >= self.threshold {
            TitleComparison::Subset { shared, confidence }
        } else {
            TitleComparison::Mismatch
        }
    }
}

fn exactly_equal(subject: &str, candidate: &str) -> bool {
    let subject = subject.trim();
    !subject.is_empty() && subject.to_lowercase() == candidate.trim().to_lowercase()
}

/// Lower-cased words split on anything not alphanumeric, small numbers spelled out
fn word_tokens(title: &str) -> impl Iterator<Item = String> + '_ {
    title
        .split(|c: char| !c.is_alphanumeric())
        .flat_map(|word| match spell_number(word) {
            Some(spelled) => spelled.split(' ').map(str::to_string).collect::<Vec<_>>(),
            None => vec![word.to_lowercase()],
        })
}

/// Exact token subset; punctuation only separates tokens
#[derive(Debug, Clone)]
pub struct SubsetTitles {
    rule: SubsetRule,
}

impl SubsetTitles {
    pub fn new(threshold_percent: u8) -> Result<Self> {
        Ok(Self {
            rule: SubsetRule::new(threshold_percent, &[])?,
        })
    }
}

impl Default for SubsetTitles {
    fn default() -> Self {
        Self {
            rule: SubsetRule::unchecked(DEFAULT_THRESHOLD_PERCENT, &[]),
        }
    }
}

impl TitleComparator for SubsetTitles {
    fn name(&self) -> &'static str {
        "Broadcast-Title-Subset"
    }

    fn compare(&self, subject: &str, candidate: &str) -> TitleComparison {
        let subject_tokens = self.rule.significant(word_tokens(subject));
        let candidate_tokens = self.rule.significant(word_tokens(candidate));
        self.rule
            .compare(subject, candidate, &subject_tokens, &candidate_tokens, |a, b| a == b)
    }
}

/// Exact token subset after deleting punctuation outright
///
/// `Don't Stop` tokenises to `dont stop` rather than `don t stop`.
#[derive(Debug, Clone)]
pub struct PunctuationInsensitiveTitles {
    rule: SubsetRule,
}

impl PunctuationInsensitiveTitles {
    pub fn new(threshold_percent: u8) -> Result<Self> {
        Ok(Self {
            rule: SubsetRule::new(threshold_percent, &[])?,
        })
    }

    fn tokens(&self, title: &str) -> Vec<String> {
        let stripped: String = title
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();
        self.rule
            .significant(stripped.split_whitespace().map(str::to_lowercase))
    }
}

impl Default for PunctuationInsensitiveTitles {
    fn default() -> Self {
        Self {
            rule: SubsetRule::unchecked(DEFAULT_THRESHOLD_PERCENT, &[]),
        }
    }
}

impl TitleComparator for PunctuationInsensitiveTitles {
    fn name(&self) -> &'static str {
        "Punctuation-Broadcast-Title"
    }

    fn compare(&self, subject: &str, candidate: &str) -> TitleComparison {
        let subject_tokens = self.tokens(subject);
        let candidate_tokens = self.tokens(candidate);
        self.rule
            .compare(subject, candidate, &subject_tokens, &candidate_tokens, |a, b| a == b)
    }
}

/// Token subset where tokens match by normalised Levenshtein similarity
#[derive(Debug, Clone)]
pub struct EditDistanceSubsetTitles {
    rule: SubsetRule,
}

impl EditDistanceSubsetTitles {
    pub fn new(threshold_percent: u8) -> Result<Self> {
        Ok(Self {
            rule: SubsetRule::new(threshold_percent, &["&"])?,
        })
    }

    fn tokens(&self, title: &str) -> Vec<String> {
        self.rule.significant(title.split_whitespace().map(|token| {
            token
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '&')
                .to_lowercase()
        }))
    }
}

impl Default for EditDistanceSubsetTitles {
    fn default() -> Self {
        Self {
            rule: SubsetRule::unchecked(DEFAULT_THRESHOLD_PERCENT, &["&"]),
        }
    }
}

impl TitleComparator for EditDistanceSubsetTitles {
    fn name(&self) -> &'static str {
        "LD-Broadcast-Title-Subset"
    }

    fn compare(&self, subject: &str, candidate: &str) -> TitleComparison {
        let subject_tokens = self.tokens(subject);
        let candidate_tokens = self.tokens(candidate);
        let threshold = self.rule.threshold;
        self.rule
            .compare(subject, candidate, &subject_tokens, &candidate_tokens, |a, b| {
                normalized_levenshtein(a, b) >= threshold
            })
    }
}

fn initials<'a>(words: impl Iterator<Item = &'a String>) -> String {
    words.filter_map(|w| w.chars().next()).collect()
}

/// Subset matching plus acronym detection
///
/// `BBC News At Ten` matches `BNAT`; with stop words dropped, `Match of the
/// Day` matches `MD` as well as `MOTD`.
#[derive(Debug, Clone)]
pub struct AcronymTitles {
    subset: SubsetTitles,
}

impl AcronymTitles {
    pub fn new(threshold_percent: u8) -> Result<Self> {
        Ok(Self {
            subset: SubsetTitles::new(threshold_percent)?,
        })
    }

    fn is_acronym_of(&self, acronym: &[String], words: &[String]) -> bool {
        let [acronym] = acronym else {
            return false;
        };
        if words.len() < 2 || acronym.chars().count() < 2 {
            return false;
        }
        let all = initials(words.iter());
        let significant = initials(
            words
                .iter()
                .filter(|w| !self.subset.rule.stop_words.contains(w.as_str())),
        );
        *acronym == all || *acronym == significant
    }
}

impl Default for AcronymTitles {
    fn default() -> Self {
        Self {
            subset: SubsetTitles::default(),
        }
    }
}

impl TitleComparator for AcronymTitles {
    fn name(&self) -> &'static str {
        "Acronym-Broadcast-Title"
    }

    fn compare(&self, subject: &str, candidate: &str) -> TitleComparison {
        let comparison = self.subset.compare(subject, candidate);
        if comparison.is_match() {
            return comparison;
        }

        let subject_words: Vec<String> = word_tokens(subject).filter(|t| !t.is_empty()).collect();
        let candidate_words: Vec<String> =
            word_tokens(candidate).filter(|t| !t.is_empty()).collect();
        if self.is_acronym_of(&subject_words, &candidate_words)
            || self.is_acronym_of(&candidate_words, &subject_words)
        {
            TitleComparison::Acronym
        } else {
            TitleComparison::Mismatch
        }
    }
}

/// Title scorer for broadcast-matched candidates
///
/// Besides comparing the two titles directly, each side's top-level
/// container title is compared against the other side's title, so an
/// episode titled after its brand still matches. Any broadcast on a sports
/// channel forces the mismatch score.
pub struct BroadcastTitleScorer<C> {
    comparator: C,
    containers: Arc<ContainerTitleCache>,
    sports_channels: Arc<ChannelSet>,
    match_score: Score,
    mismatch_score: Score,
}

impl<C: TitleComparator> BroadcastTitleScorer<C> {
    pub fn new(
        comparator: C,
        containers: Arc<ContainerTitleCache>,
        sports_channels: Arc<ChannelSet>,
    ) -> Self {
        Self {
            comparator,
            containers,
            sports_channels,
            match_score: Score::ONE,
            mismatch_score: Score::NULL,
        }
    }

    pub fn with_match_score(mut self, score: Score) -> Self {
        self.match_score = score;
        self
    }

    /// Score for titles that do not match; must be null or non-negative
    pub fn with_mismatch_score(mut self, score: Score) -> Result<Self> {
        if score.value().is_some_and(|v| v < 0.0) {
            return Err(Error::InvalidInput(format!(
                "{} mismatch score must not be negative, got {score}",
                self.comparator.name()
            )));
        }
        self.mismatch_score = score;
        Ok(self)
    }

    fn on_sports_channel(&self, content: &Content) -> bool {
        content
            .broadcasts
            .iter()
            .any(|b| self.sports_channels.contains(&b.channel_uri))
    }

    fn matches(&self, subject: Option<&str>, candidate: Option<&str>) -> bool {
        match (subject, candidate) {
            (Some(s), Some(c)) => self.comparator.titles_match(s, c),
            _ => false,
        }
    }

    /// Score one subject/candidate pair
    pub fn score_pair(&self, subject: &Content, candidate: &Content) -> Result<Score> {
        if self.on_sports_channel(subject) || self.on_sports_channel(candidate) {
            debug!(
                candidate = %candidate.canonical_uri,
                "Sports channel broadcast, title not informative"
            );
            return Ok(self.mismatch_score);
        }

        if self.matches(subject.title(), candidate.title()) {
            return Ok(self.match_score);
        }

        let subject_container = self.containers.top_level_title(subject)?;
        if self.matches(subject_container.as_deref(), candidate.title()) {
            return Ok(self.match_score);
        }

        let candidate_container = self.containers.top_level_title(candidate)?;
        if self.matches(subject.title(), candidate_container.as_deref()) {
            return Ok(self.match_score);
        }

        Ok(self.mismatch_score)
    }
}

impl<C: TitleComparator> EquivalenceScorer for BroadcastTitleScorer<C> {
    fn name(&self) -> &'static str {
        self.comparator.name()
    }

    fn score(
        &self,
        subject: &Content,
        candidates: &[Arc<Content>],
        report: &RunReporter,
    ) -> Result<ScoredCandidates<Content>> {
        let mut scores = ScoredCandidates::from_source(self.comparator.name());
        for candidate in candidates {
            let score = self.score_pair(subject, candidate)?;
            debug!(
                subject = %report.subject(),
                scorer = self.comparator.name(),
                candidate = %candidate.canonical_uri,
                %score,
                "Scored broadcast title"
            );
            scores.add(Arc::clone(candidate), score);
        }
        Ok(scores.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::InMemoryStore;
    use chrono::{TimeZone, Utc};
    use equiv_common::{Broadcast, Publisher};

    fn scorer<C: TitleComparator>(
        comparator: C,
        store: Arc<InMemoryStore>,
    ) -> BroadcastTitleScorer<C> {
        BroadcastTitleScorer::new(
            comparator,
            Arc::new(ContainerTitleCache::disabled(store)),
            Arc::new(ChannelSet::new(["http://ref/channel/sky-sports-1"])),
        )
    }

    fn item(uri: &str, title: &str) -> Content {
        Content::item(uri, Publisher::from(Publisher::PA)).with_title(title)
    }

    #[test]
    fn test_threshold_must_be_a_percentage() {
        assert!(SubsetTitles::new(100).is_ok());
        assert!(matches!(SubsetTitles::new(101), Err(Error::InvalidInput(_))));
        assert!(matches!(
            EditDistanceSubsetTitles::new(150),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_subset_titles() {
        let subset = SubsetTitles::default();
        assert!(subset.titles_match(
            "Doctor Who: The Christmas Special",
            "doctor who christmas special",
        ));
        assert!(subset.titles_match("Kinross", "KINROSS "));
        assert!(!subset.titles_match("Doctor Who", "Doctor Foster"));
    }

    #[test]
    fn test_single_shared_token_never_matches() {
        let subset = SubsetTitles::new(0).unwrap();
        assert_eq!(subset.compare("Snooker", "World Snooker"), TitleComparison::Mismatch);
        assert_eq!(subset.compare("The Show", "A Show"), TitleComparison::Mismatch);
    }

    #[test]
    fn test_stop_words_ignored() {
        let subset = SubsetTitles::default();
        assert!(subset.titles_match(
            "The Lord of the Rings: Two Towers",
            "Lord Rings Two Towers"
        ));
    }

    #[test]
    fn test_small_numbers_match_their_spelling() {
        let subset = SubsetTitles::default();
        assert!(subset.titles_match(
            "Apollo 13: Mission Control",
            "Apollo Thirteen Mission Control",
        ));
        assert!(subset.titles_match("Catch 22 Revisited", "catch twenty two revisited"));
        assert!(!subset.titles_match("Olympics 2012 Review", "Olympics Twenty Twelve"));
    }

    #[test]
    fn test_punctuation_variant_deletes_symbols() {
        let punctuation = PunctuationInsensitiveTitles::default();
        assert!(punctuation.titles_match("Don't Stop Me Now!", "Dont Stop Me Now"));
        assert!(!SubsetTitles::default().titles_match("Don't Stop", "Dont Stop"));
    }

    #[test]
    fn test_edit_distance_tolerates_typos() {
        let edit = EditDistanceSubsetTitles::default();
        assert!(edit.titles_match("Coronation Street", "Coronaton Streeet"));
        assert!(edit.titles_match("Tom & Jerry Tales", "Tom Jerry Tales"));
        assert!(!edit.titles_match("Coronation Street", "Sesame Street"));
    }

    #[test]
    fn test_acronyms() {
        let acronym = AcronymTitles::default();
        assert_eq!(acronym.compare("Match of the Day", "MOTD"), TitleComparison::Acronym);
        assert_eq!(acronym.compare("MD", "Match of the Day"), TitleComparison::Acronym);
        assert_eq!(acronym.compare("Match of the Day", "QI"), TitleComparison::Mismatch);
    }

    #[test]
    fn test_negative_mismatch_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let result = scorer(SubsetTitles::default(), store).with_mismatch_score(Score::of(-1.0));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_sports_channel_overrides_identical_titles() {
        let store = Arc::new(InMemoryStore::new());
        let scorer = scorer(SubsetTitles::default(), store);
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 21, 0, 0).unwrap();
        let subject = item("http://pa/a", "Live Premier League Football").with_broadcast(
            Broadcast::new("http://ref/channel/sky-sports-1", start, end).unwrap(),
        );
        let candidate = item("http://pa/b", "Live Premier League Football");

        assert_eq!(scorer.score_pair(&subject, &candidate).unwrap(), Score::NULL);
        assert_eq!(scorer.score_pair(&candidate, &subject).unwrap(), Score::NULL);
    }

    #[test]
    fn test_container_titles_compared() {
        let store = Arc::new(InMemoryStore::new());
        store.add_content(
            Content::brand("http://pa/brand", Publisher::from(Publisher::PA))
                .with_title("Gardeners' World Live"),
        );
        let scorer = scorer(SubsetTitles::default(), store);
        let episode = Content::episode("http://pa/ep", Publisher::from(Publisher::PA))
            .with_title("Episode 12")
            .with_container("http://pa/brand");
        let candidate = item("http://bbc/x", "Gardeners World Live");

        assert_eq!(scorer.score_pair(&episode, &candidate).unwrap(), Score::ONE);
        assert_eq!(scorer.score_pair(&candidate, &episode).unwrap(), Score::ONE);
        assert_eq!(
            scorer.score_pair(&episode, &item("http://bbc/y", "Countryfile")).unwrap(),
            Score::NULL
        );
    }
}
