//! Title scorer for transmission-log content
//!
//! Transmission logs carry capped, upper-cased titles that are often just the
//! brand name, so this scorer applies txlog-specific clean-up and, when only
//! one side is a txlog, also tries the other side's brand and series titles
//! joined in every order. Treat the result as a sanity check against
//! equivalences made purely on broadcast time, not as strong evidence.

use super::EquivalenceScorer;
use crate::cache::ContainerTitleCache;
use crate::title::{remove_postfixes, TitleNormalizer, TitleType};
use equiv_common::{Content, ContentKind, Publisher, Result, RunReporter, Score, ScoredCandidates};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::mem::discriminant;
use std::sync::Arc;
use tracing::debug;

const TXLOG_TITLE_LENGTH: usize = 40;

static TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*)\(\d{4}\)$").unwrap());

static GENERIC_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[Ss]eries|[Ee]pisode) \d+$").unwrap());

static BBC_O_CLOCK_NEWS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+) o'clock news").unwrap());

const BBC_TITLE_REPLACEMENTS: &[(&str, &str)] =
    &[("news 24", "joins bbc news"), ("!mpossible", "impossible")];

/// Title, publisher and year of one side of a comparison
#[derive(Debug, Clone, PartialEq)]
struct TitleFields {
    title: String,
    publisher: Publisher,
    year: Option<i32>,
}

impl TitleFields {
    fn of(content: &Content) -> Option<Self> {
        content.title().map(|title| Self {
            title: title.to_string(),
            publisher: content.publisher.clone(),
            year: content.year,
        })
    }

    fn with_title(&self, title: String) -> Self {
        Self {
            title,
            ..self.clone()
        }
    }
}

pub struct TxlogTitleScorer {
    normalizer: TitleNormalizer,
    txlog_publishers: BTreeSet<Publisher>,
    perfect: Score,
    partial: Score,
    mismatch: Score,
    containers: Option<Arc<ContainerTitleCache>>,
}

impl Default for TxlogTitleScorer {
    fn default() -> Self {
        Self {
            normalizer: TitleNormalizer::txlog(),
            txlog_publishers: [Publisher::BARB_TRANSMISSIONS, Publisher::LAYER3_TXLOGS]
                .into_iter()
                .map(Publisher::from)
                .collect(),
            perfect: Score::of(2.0),
            partial: Score::ONE,
            mismatch: Score::ZERO,
            containers: None,
        }
    }
}

impl TxlogTitleScorer {
    pub const NAME: &'static str = "Txlog-Title";

    pub fn new() -> Self {
        Self::default()
    }

    /// Also compare against container and series title permutations
    pub fn with_containers(mut self, cache: Arc<ContainerTitleCache>) -> Self {
        self.containers = Some(cache);
        self
    }

    pub fn with_txlog_publishers(mut self, publishers: BTreeSet<Publisher>) -> Self {
        self.txlog_publishers = publishers;
        self
    }

    pub fn with_scores(mut self, perfect: Score, partial: Score, mismatch: Score) -> Self {
        self.perfect = perfect;
        self.partial = partial;
        self.mismatch = mismatch;
        self
    }

    fn is_txlog(&self, publisher: &Publisher) -> bool {
        self.txlog_publishers.contains(publisher)
    }

    /// Score one subject/candidate pair, including container permutations
    pub fn score_pair(&self, subject: &Content, candidate: &Content) -> Result<Score> {
        let (Some(subject_fields), Some(candidate_fields)) =
            (TitleFields::of(subject), TitleFields::of(candidate))
        else {
            return Ok(Score::NULL);
        };

        let own = self.score_fields(&subject_fields, &candidate_fields);
        if own == self.perfect {
            return Ok(own);
        }

        let Some(parent) = self.score_with_containers(subject, candidate)? else {
            return Ok(own);
        };
        let better = match (parent.value(), own.value()) {
            (Some(p), Some(o)) => p > o,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if better {
            debug!(
                candidate = %candidate.canonical_uri,
                parent = %parent,
                own = %own,
                "Container title permutation scored higher than own title"
            );
            Ok(parent)
        } else {
            Ok(own)
        }
    }

    fn score_fields(&self, subject: &TitleFields, candidate: &TitleFields) -> Score {
        let mut subject_title = subject.title.trim().to_lowercase();
        let mut candidate_title = candidate.title.trim().to_lowercase();

        let subject_txlog = self.is_txlog(&subject.publisher);
        let candidate_txlog = self.is_txlog(&candidate.publisher);

        if subject_txlog || candidate_txlog {
            if subject.publisher == Publisher::BBC_NITRO
                || candidate.publisher == Publisher::BBC_NITRO
            {
                subject_title = bbc_title(&subject_title);
                candidate_title = bbc_title(&candidate_title);
            }
            subject_title = truncate_chars(&subject_title, TXLOG_TITLE_LENGTH);
            candidate_title = truncate_chars(&candidate_title, TXLOG_TITLE_LENGTH);
        }
        if subject_txlog {
            subject_title = remove_trailing_year(&subject_title);
        }
        if candidate_txlog {
            candidate_title = remove_trailing_year(&candidate_title);
        }

        if subject_title == candidate_title {
            return self.perfect;
        }

        let subject_type = TitleType::of(&subject.title);
        let candidate_type = TitleType::of(&candidate.title);
        if discriminant(&subject_type) != discriminant(&candidate_type) {
            return Score::NULL;
        }

        let subject_title = remove_postfixes(&subject_title, subject.year);
        let candidate_title = remove_postfixes(&candidate_title, candidate.year);
        if self.normalizer.titles_match(&subject_title, &candidate_title) {
            self.perfect
        } else if self
            .normalizer
            .colon_prefix_match(&subject_title, &candidate_title)
        {
            self.partial
        } else {
            self.mismatch
        }
    }

    /// Best score of the txlog title against joined container titles
    ///
    /// Only applies when exactly one side is a txlog and the other side has
    /// a resolvable container.
    fn score_with_containers(
        &self,
        subject: &Content,
        candidate: &Content,
    ) -> Result<Option<Score>> {
        let Some(cache) = &self.containers else {
            return Ok(None);
        };
        let (txlog, other) = match (
            self.is_txlog(&subject.publisher),
            self.is_txlog(&candidate.publisher),
        ) {
            (true, false) => (subject, candidate),
            (false, true) => (candidate, subject),
            _ => return Ok(None),
        };
        let (Some(txlog_fields), Some(other_fields)) =
            (TitleFields::of(txlog), TitleFields::of(other))
        else {
            return Ok(None);
        };

        let Some(parent) = match &other.container_uri {
            Some(uri) => cache.top_level_container(uri)?,
            None => None,
        }
        .and_then(|c| TitleFields::of(&c)) else {
            return Ok(None);
        };

        let series = match (&other.kind, &other.series_uri) {
            (ContentKind::Episode, Some(uri)) => cache
                .container(uri)?
                .and_then(|c| TitleFields::of(&c)),
            _ => None,
        };

        let mut fields = vec![other_fields.clone(), parent];
        fields.extend(series);

        let mut best: Option<Score> = None;
        for subset in non_empty_subsets(&fields) {
            if let [only] = subset.as_slice() {
                if *only == other_fields || GENERIC_TITLE.is_match(&only.title) {
                    continue;
                }
            }
            for ordering in permutations(&subset) {
                let joined = ordering
                    .iter()
                    .map(|f| f.title.as_str())
                    .collect::<Vec<_>>()
                    .join("-");
                let score = self.score_fields(&txlog_fields, &other_fields.with_title(joined));
                let improves = match (best, score.value()) {
                    (None, _) => true,
                    (Some(Score::Null), _) => true,
                    (Some(Score::Value(b)), Some(s)) => s > b,
                    (Some(Score::Value(_)), None) => false,
                };
                if improves {
                    best = Some(score);
                    if score == self.perfect {
                        return Ok(best);
                    }
                }
            }
        }
        Ok(best)
    }
}

impl EquivalenceScorer for TxlogTitleScorer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn score(
        &self,
        subject: &Content,
        candidates: &[Arc<Content>],
        report: &RunReporter,
    ) -> Result<ScoredCandidates<Content>> {
        let mut scores = ScoredCandidates::from_source(Self::NAME);
        for candidate in candidates {
            let score = self.score_pair(subject, candidate)?;
            debug!(
                subject = %report.subject(),
                candidate = %candidate.canonical_uri,
                %score,
                "Scored txlog title"
            );
            scores.add(Arc::clone(candidate), score);
        }
        Ok(scores.build())
    }
}

/// BBC-specific rewrites between Nitro and BBC transmission logs
fn bbc_title(title: &str) -> String {
    if let Some((_, replacement)) = BBC_TITLE_REPLACEMENTS.iter().find(|(t, _)| *t == title) {
        return replacement.to_string();
    }
    let title = title
        .strip_prefix("bbc")
        .filter(|rest| !rest.trim().is_empty())
        .map(str::trim)
        .unwrap_or(title);
    let title = title
        .strip_suffix("highlights")
        .filter(|rest| !rest.trim().is_empty())
        .map(str::trim)
        .unwrap_or(title);
    let title = BBC_O_CLOCK_NEWS.replace(title, "news at ${1}");
    title.replacen("weekend news", "news", 1)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn remove_trailing_year(title: &str) -> String {
    TRAILING_YEAR
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| title.to_string())
}

fn non_empty_subsets<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    (1..(1u32 << items.len()))
        .map(|mask| {
            items
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, item)| item.clone())
                .collect()
        })
        .collect()
}

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut result = Vec::new();
    for (i, head) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            result.push(tail);
        }
    }
    result
}
