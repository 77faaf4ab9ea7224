//! Ready-made pipelines assembled from [`EngineConfig`]

use super::{Pipeline, PipelineConfig};
use crate::cache::ContainerTitleCache;
use crate::combiner::{NullScoreAwareAveragingCombiner, RequiredScoreFilteringCombiner};
use crate::extractor::{AllOverThresholdExtractor, MultipleCandidateExtractor, TopScoringExtractor};
use crate::filter::{FilterChain, MinimumScoreFilter, SamePublisherFilter};
use crate::generators::{
    ActualTransmissionGenerator, BroadcastMatchingGenerator, RegionalTxlogGenerator, TierLenient,
};
use crate::resolvers::{ChannelResolver, ContentResolver, ScheduleResolver};
use crate::scorers::{BroadcastTitleScorer, SubsetTitles, TitleMatchingScorer, TxlogTitleScorer};
use equiv_common::config::EngineConfig;
use equiv_common::{
    ChannelSet, ChannelVariants, Content, Publisher, Result, Score, ScoreThreshold,
    TieredBroadcaster,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// The external stores every standard pipeline reads from
#[derive(Clone)]
pub struct Collaborators {
    pub schedule: Arc<dyn ScheduleResolver>,
    pub channels: Arc<dyn ChannelResolver>,
    pub content: Arc<dyn ContentResolver>,
}

impl Collaborators {
    pub fn new(
        schedule: Arc<dyn ScheduleResolver>,
        channels: Arc<dyn ChannelResolver>,
        content: Arc<dyn ContentResolver>,
    ) -> Self {
        Self {
            schedule,
            channels,
            content,
        }
    }

    /// One store serving all three contracts
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ScheduleResolver + ChannelResolver + ContentResolver + 'static,
    {
        Self {
            schedule: store.clone(),
            channels: store.clone(),
            content: store,
        }
    }
}

/// Builds pipelines sharing one set of tables and one container-title cache
pub struct StandardPipelines {
    config: EngineConfig,
    collaborators: Collaborators,
    variants: Arc<ChannelVariants>,
    tiers: Arc<TieredBroadcaster>,
    sports: Arc<ChannelSet>,
    containers: Arc<ContainerTitleCache>,
}

impl StandardPipelines {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let containers = Arc::new(
            ContainerTitleCache::new(Arc::clone(&collaborators.content), config.cache.ttl())
                .with_max_entries(config.cache.container_title_max_entries),
        );
        info!(
            cache_ttl_secs = config.cache.container_title_ttl_secs,
            cache_max_entries = config.cache.container_title_max_entries,
            subset_threshold = config.title.subset_threshold_percent,
            "Standard pipelines configured"
        );
        Ok(Self {
            variants: Arc::new(config.channel_variants()),
            tiers: Arc::new(config.tiers()),
            sports: Arc::new(config.sports_channels()),
            containers,
            collaborators,
            config,
        })
    }

    pub fn container_cache(&self) -> &Arc<ContainerTitleCache> {
        &self.containers
    }

    fn filter(&self, minimum: ScoreThreshold) -> FilterChain<Content> {
        FilterChain::new(vec![
            Box::new(MinimumScoreFilter::new(minimum)),
            Box::new(SamePublisherFilter),
        ])
    }

    fn title_scorer(&self) -> TitleMatchingScorer {
        let scorer = TitleMatchingScorer::new();
        if self.config.title.partial_colon_match {
            scorer.with_partial_colon_match(Score::ONE)
        } else {
            scorer
        }
    }

    /// Broadcast-window matching confirmed by title
    ///
    /// Candidates need a positive broadcast score to be kept at all.
    pub fn broadcast_item_pipeline<I>(
        &self,
        targets: I,
        excluded_uris: BTreeSet<String>,
    ) -> Result<Pipeline<Content>>
    where
        I: IntoIterator<Item = Publisher>,
    {
        let broadcast = BroadcastMatchingGenerator::builder(
            Arc::clone(&self.collaborators.schedule),
            Arc::clone(&self.collaborators.channels),
            targets,
        )
        .variants(Arc::clone(&self.variants))
        .tiers(Arc::clone(&self.tiers))
        .threshold(TierLenient {
            tier_one: 0.5,
            default: 0.66,
        })
        .config(&self.config.broadcast)
        .build();

        let subset = BroadcastTitleScorer::new(
            SubsetTitles::new(self.config.title.subset_threshold_percent)?,
            Arc::clone(&self.containers),
            Arc::clone(&self.sports),
        )
        .with_mismatch_score(Score::ZERO)?;

        Pipeline::new(
            PipelineConfig::new()
                .generators(vec![Box::new(broadcast)])
                .scorers(vec![Box::new(self.title_scorer()), Box::new(subset)])
                .combiner(Box::new(RequiredScoreFilteringCombiner::new(
                    Box::new(NullScoreAwareAveragingCombiner::new()),
                    [BroadcastMatchingGenerator::NAME],
                )))
                .filter(Box::new(self.filter(ScoreThreshold::GreaterThan(0.2))))
                .extractors(vec![
                    Box::new(MultipleCandidateExtractor::new()),
                    Box::new(TopScoringExtractor::new(ScoreThreshold::GreaterThan(0.2))),
                ])
                .excluded_uris(excluded_uris),
        )
    }

    /// Transmission-log equivalence by as-aired times and regional siblings
    pub fn txlog_item_pipeline<I>(&self, targets: I) -> Result<Pipeline<Content>>
    where
        I: IntoIterator<Item = Publisher>,
    {
        let targets: BTreeSet<Publisher> = targets.into_iter().collect();

        let actual = ActualTransmissionGenerator::builder(
            Arc::clone(&self.collaborators.schedule),
            Arc::clone(&self.collaborators.channels),
        )
        .publishers(targets.iter().cloned())
        .variants(Arc::clone(&self.variants))
        .config(&self.config.actual_transmission)
        .build();

        let regional = RegionalTxlogGenerator::new(
            Arc::clone(&self.collaborators.schedule),
            Arc::clone(&self.collaborators.channels),
        )
        .with_variants(Arc::clone(&self.variants))
        .with_config(&self.config.regional);

        let titles = TxlogTitleScorer::new().with_containers(Arc::clone(&self.containers));

        Pipeline::new(
            PipelineConfig::new()
                .generators(vec![Box::new(actual), Box::new(regional)])
                .scorers(vec![Box::new(titles)])
                .combiner(Box::new(NullScoreAwareAveragingCombiner::new()))
                .filter(Box::new(self.filter(ScoreThreshold::GreaterThanOrEqual(1.0))))
                .extractors(vec![Box::new(AllOverThresholdExtractor::new(
                    ScoreThreshold::GreaterThanOrEqual(1.0),
                ))]),
        )
    }
}
