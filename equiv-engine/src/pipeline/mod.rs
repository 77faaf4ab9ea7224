//! Pipeline assembly and evaluation
//!
//! A [`Pipeline`] runs one subject through the stages in order: generators
//! propose candidates, scorers score their union, the combiner folds every
//! source into one score per candidate, the filter prunes, and extractors
//! pick the strong equivalents per publisher. Every stage reports what it
//! did through the [`RunReporter`].

mod composite;
mod metadata;
pub mod standard;

pub use composite::{
    EquivalenceResultHandler, EquivalenceUpdater, FirstMatchingPredicatePipeline,
    PipelineRegistry, ResultPredicate, SourceSpecificPipelines,
};
pub use metadata::{GeneratorMetadata, PipelineMetadata, UpdaterMetadata};

use crate::combiner::ScoreCombiner;
use crate::extractor::EquivalenceExtractor;
use crate::filter::{EquivalenceFilter, ExclusionFilter};
use crate::generators::EquivalenceGenerator;
use crate::scorers::EquivalenceScorer;
use equiv_common::score::sort_by_score;
use equiv_common::{
    Error, Identified, Publisher, Result, ResultReporter, RunReporter, ScoredCandidate,
    ScoredCandidates, Stage,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of evaluating one subject
pub struct EquivalenceResult<T> {
    pub subject: String,
    /// One candidate set per generator, exclusions removed
    pub generated: Vec<ScoredCandidates<T>>,
    /// One candidate set per scorer
    pub scored: Vec<ScoredCandidates<T>>,
    pub combined: ScoredCandidates<T>,
    /// Strong equivalents, keyed by candidate publisher
    pub strong: BTreeMap<Publisher, Vec<ScoredCandidate<T>>>,
}

impl<T: Identified> EquivalenceResult<T> {
    fn empty(subject: &T) -> Self {
        Self {
            subject: subject.canonical_uri().to_string(),
            generated: Vec::new(),
            scored: Vec::new(),
            combined: ScoredCandidates::empty("none"),
            strong: BTreeMap::new(),
        }
    }

    pub fn has_strong_equivalents(&self) -> bool {
        self.strong.values().any(|c| !c.is_empty())
    }

    pub fn strong_uris(&self) -> Vec<&str> {
        self.strong
            .values()
            .flatten()
            .map(|c| c.candidate.canonical_uri())
            .collect()
    }
}

impl<T> Clone for EquivalenceResult<T> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            generated: self.generated.clone(),
            scored: self.scored.clone(),
            combined: self.combined.clone(),
            strong: self.strong.clone(),
        }
    }
}

/// Anything that can evaluate a subject into an [`EquivalenceResult`]
pub trait EquivalenceResultProvider<T>: Send + Sync {
    fn provide(&self, subject: &T, reporter: &Arc<dyn ResultReporter>)
        -> Result<EquivalenceResult<T>>;

    fn metadata(&self) -> UpdaterMetadata;
}

/// Components for a [`Pipeline`]; all stages except exclusions are required
pub struct PipelineConfig<T> {
    generators: Option<Vec<Box<dyn EquivalenceGenerator<T>>>>,
    scorers: Option<Vec<Box<dyn EquivalenceScorer<T>>>>,
    combiner: Option<Box<dyn ScoreCombiner<T>>>,
    filter: Option<Box<dyn EquivalenceFilter<T>>>,
    extractors: Option<Vec<Box<dyn EquivalenceExtractor<T>>>>,
    excluded_uris: BTreeSet<String>,
    excluded_ids: BTreeSet<u64>,
}

impl<T> Default for PipelineConfig<T> {
    fn default() -> Self {
        Self {
            generators: None,
            scorers: None,
            combiner: None,
            filter: None,
            extractors: None,
            excluded_uris: BTreeSet::new(),
            excluded_ids: BTreeSet::new(),
        }
    }
}

impl<T> PipelineConfig<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generators(mut self, generators: Vec<Box<dyn EquivalenceGenerator<T>>>) -> Self {
        self.generators = Some(generators);
        self
    }

    /// Scorers may be an empty list, but must be given
    pub fn scorers(mut self, scorers: Vec<Box<dyn EquivalenceScorer<T>>>) -> Self {
        self.scorers = Some(scorers);
        self
    }

    pub fn combiner(mut self, combiner: Box<dyn ScoreCombiner<T>>) -> Self {
        self.combiner = Some(combiner);
        self
    }

    pub fn filter(mut self, filter: Box<dyn EquivalenceFilter<T>>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Tried in order; the first to pick anything wins
    pub fn extractors(mut self, extractors: Vec<Box<dyn EquivalenceExtractor<T>>>) -> Self {
        self.extractors = Some(extractors);
        self
    }

    pub fn excluded_uris<I: IntoIterator<Item = String>>(mut self, uris: I) -> Self {
        self.excluded_uris = uris.into_iter().collect();
        self
    }

    pub fn excluded_ids<I: IntoIterator<Item = u64>>(mut self, ids: I) -> Self {
        self.excluded_ids = ids.into_iter().collect();
        self
    }
}

pub struct Pipeline<T> {
    generators: Vec<Box<dyn EquivalenceGenerator<T>>>,
    scorers: Vec<Box<dyn EquivalenceScorer<T>>>,
    combiner: Box<dyn ScoreCombiner<T>>,
    filter: Box<dyn EquivalenceFilter<T>>,
    extractors: Vec<Box<dyn EquivalenceExtractor<T>>>,
    exclusions: ExclusionFilter,
    metadata: PipelineMetadata,
}

impl<T: Identified + Send + Sync + 'static> Pipeline<T> {
    /// Assemble a pipeline, rejecting missing stages
    pub fn new(config: PipelineConfig<T>) -> Result<Self> {
        let generators = config
            .generators
            .filter(|g| !g.is_empty())
            .ok_or(Error::MissingField("generators"))?;
        let scorers = config.scorers.ok_or(Error::MissingField("scorers"))?;
        let combiner = config.combiner.ok_or(Error::MissingField("combiner"))?;
        let filter = config.filter.ok_or(Error::MissingField("filter"))?;
        let extractors = config
            .extractors
            .filter(|e| !e.is_empty())
            .ok_or(Error::MissingField("extractors"))?;

        let metadata = PipelineMetadata {
            generators: generators.iter().map(|g| g.metadata()).collect(),
            scorers: scorers.iter().map(|s| s.name().to_string()).collect(),
            combiner: combiner.name().to_string(),
            filter: filter.describe(),
            extractors: extractors.iter().map(|e| e.name().to_string()).collect(),
            excluded_uris: config.excluded_uris.clone(),
            excluded_ids: config.excluded_ids.clone(),
        };

        Ok(Self {
            generators,
            scorers,
            combiner,
            filter,
            extractors,
            exclusions: ExclusionFilter::new(config.excluded_uris, config.excluded_ids),
            metadata,
        })
    }

    pub fn pipeline_metadata(&self) -> &PipelineMetadata {
        &self.metadata
    }

    fn without_excluded(&self, scores: ScoredCandidates<T>) -> ScoredCandidates<T> {
        if !scores.iter().any(|c| self.exclusions.excludes(c.candidate.as_ref())) {
            return scores;
        }
        let mut kept = ScoredCandidates::from_source(scores.source());
        for scored in scores.into_candidates() {
            if self.exclusions.excludes(scored.candidate.as_ref()) {
                debug!(candidate = scored.candidate.canonical_uri(), "Excluded candidate dropped");
                continue;
            }
            kept.add(scored.candidate, scored.score);
        }
        kept.build()
    }

    /// Run every stage for one subject
    pub fn evaluate(
        &self,
        subject: &T,
        reporter: &Arc<dyn ResultReporter>,
    ) -> Result<EquivalenceResult<T>> {
        let report = RunReporter::new(subject.canonical_uri(), Arc::clone(reporter));

        if self.exclusions.excludes(subject) {
            info!(subject = %report.subject(), "Subject excluded, skipping evaluation");
            return Ok(EquivalenceResult::empty(subject));
        }

        let mut generated = Vec::with_capacity(self.generators.len());
        for generator in &self.generators {
            let scores = self.without_excluded(generator.generate(subject, &report)?);
            report.record_scores(Stage::Generator, &scores);
            generated.push(scores);
        }

        let mut union: BTreeMap<String, Arc<T>> = BTreeMap::new();
        for scored in generated.iter().flat_map(|s| s.iter()) {
            union
                .entry(scored.candidate.canonical_uri().to_string())
                .or_insert_with(|| Arc::clone(&scored.candidate));
        }
        let candidates: Vec<Arc<T>> = union.into_values().collect();

        let mut scored = Vec::with_capacity(self.scorers.len());
        for scorer in &self.scorers {
            let scores = scorer.score(subject, &candidates, &report)?;
            report.record_scores(Stage::Scorer, &scores);
            scored.push(scores);
        }

        let all: Vec<ScoredCandidates<T>> =
            generated.iter().chain(scored.iter()).cloned().collect();
        let combined = self.combiner.combine(&all);
        report.record(Stage::Combiner, self.combiner.name(), combined.to_report());

        let filtered = self
            .filter
            .apply(combined.ordered_by_score(), subject, &report);
        report.record(
            Stage::Filter,
            self.filter.name(),
            filtered
                .iter()
                .map(|c| (c.candidate.canonical_uri().to_string(), c.score.to_string()))
                .collect(),
        );

        let mut by_publisher: BTreeMap<Publisher, Vec<ScoredCandidate<T>>> = BTreeMap::new();
        for candidate in filtered {
            by_publisher
                .entry(candidate.candidate.publisher().clone())
                .or_default()
                .push(candidate);
        }

        let mut strong = BTreeMap::new();
        for (publisher, mut candidates) in by_publisher {
            sort_by_score(&mut candidates);
            for extractor in &self.extractors {
                let chosen = extractor.extract(&candidates, subject, &report);
                if chosen.is_empty() {
                    continue;
                }
                report.record(
                    Stage::Extractor,
                    extractor.name(),
                    chosen
                        .iter()
                        .map(|c| (c.candidate.canonical_uri().to_string(), c.score.to_string()))
                        .collect(),
                );
                strong.insert(publisher, chosen);
                break;
            }
        }

        let result = EquivalenceResult {
            subject: subject.canonical_uri().to_string(),
            generated,
            scored,
            combined,
            strong,
        };
        info!(
            subject = %result.subject,
            candidates = candidates.len(),
            strong = result.strong_uris().len(),
            "Equivalence evaluation complete"
        );
        Ok(result)
    }
}

impl<T: Identified + Send + Sync + 'static> EquivalenceResultProvider<T> for Pipeline<T> {
    fn provide(
        &self,
        subject: &T,
        reporter: &Arc<dyn ResultReporter>,
    ) -> Result<EquivalenceResult<T>> {
        self.evaluate(subject, reporter)
    }

    fn metadata(&self) -> UpdaterMetadata {
        UpdaterMetadata::Pipeline(self.metadata.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::NullScoreAwareAveragingCombiner;
    use crate::extractor::TopScoringExtractor;
    use crate::filter::MinimumScoreFilter;
    use equiv_common::reporter::InMemoryReporter;
    use equiv_common::{Content, Score, ScoreThreshold};

    struct Fixed(Vec<Arc<Content>>);

    impl EquivalenceGenerator for Fixed {
        fn name(&self) -> &'static str {
            "Fixed"
        }

        fn generate(
            &self,
            _subject: &Content,
            _report: &RunReporter,
        ) -> Result<ScoredCandidates<Content>> {
            Ok(self
                .0
                .iter()
                .fold(ScoredCandidates::from_source("Fixed"), |b, c| {
                    b.add_equivalent(Arc::clone(c), Score::ONE)
                })
                .build())
        }
    }

    fn item(uri: &str, publisher: &str) -> Arc<Content> {
        Arc::new(Content::item(uri, Publisher::from(publisher)))
    }

    fn pipeline(excluded: &[&str]) -> Pipeline<Content> {
        Pipeline::new(
            PipelineConfig::new()
                .generators(vec![Box::new(Fixed(vec![
                    item("http://pa/a", Publisher::PA),
                    item("http://c4/b", Publisher::C4),
                    item("http://pa/excluded", Publisher::PA),
                ]))])
                .scorers(Vec::new())
                .combiner(Box::new(NullScoreAwareAveragingCombiner::new()))
                .filter(Box::new(MinimumScoreFilter::new(ScoreThreshold::GreaterThan(0.2))))
                .extractors(vec![Box::new(TopScoringExtractor::new(
                    ScoreThreshold::GreaterThan(0.5),
                ))])
                .excluded_uris(excluded.iter().map(|u| u.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_stage_rejected() {
        let result = Pipeline::<Content>::new(
            PipelineConfig::new()
                .scorers(Vec::new())
                .combiner(Box::new(NullScoreAwareAveragingCombiner::new())),
        );
        assert!(matches!(result, Err(Error::MissingField("generators"))));
    }

    #[test]
    fn test_strong_equivalent_per_publisher() {
        let reporter = Arc::new(InMemoryReporter::new());
        let sink: Arc<dyn ResultReporter> = reporter.clone();
        let subject = Content::item("http://bbc/s", Publisher::from(Publisher::BBC));

        let result = pipeline(&["http://pa/excluded"]).evaluate(&subject, &sink).unwrap();
        assert_eq!(result.strong.len(), 2);
        assert_eq!(result.strong_uris(), vec!["http://c4/b", "http://pa/a"]);
        assert!(!result.combined.contains("http://pa/excluded"));
        assert!(!reporter.results_for("Fixed").is_empty());
    }

    #[test]
    fn test_excluded_subject_yields_empty_result() {
        let sink: Arc<dyn ResultReporter> = Arc::new(InMemoryReporter::new());
        let subject = Content::item("http://bbc/s", Publisher::from(Publisher::BBC));

        let result = pipeline(&["http://bbc/s"]).evaluate(&subject, &sink).unwrap();
        assert!(!result.has_strong_equivalents());
        assert!(result.generated.is_empty());
    }
}
