//! Broadcast-window matching
//!
//! For every eligible broadcast of the subject, the schedule is queried on
//! the broadcast's channel and its variants, widened by a flexibility
//! window. A candidate's match ratio is the fraction of the subject's
//! eligible broadcasts it has a corresponding broadcast for, and a
//! configurable [`RatioThreshold`] decides between the full and the partial
//! score.

use super::{starts_within, widen, within, EquivalenceGenerator};
use crate::pipeline::GeneratorMetadata;
use crate::resolvers::{resolve_channels, ChannelResolver, ScheduleResolver};
use crate::scorers::EquivalenceScorer;
use chrono::Duration;
use equiv_common::config::BroadcastMatchingConfig;
use equiv_common::{
    Broadcast, ChannelSet, ChannelVariants, Content, Identified, Publisher, Result, RunReporter,
    Score, ScoredCandidates, Tier, TieredBroadcaster,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Broadcast eligibility predicate
pub type BroadcastFilter = Arc<dyn Fn(&Broadcast) -> bool + Send + Sync>;

/// Everything a [`RatioThreshold`] may base its decision on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchContext {
    /// Matched fraction of the subject's eligible broadcasts
    pub ratio: f64,
    pub subject_tier: Tier,
    pub candidate_tier: Tier,
}

impl MatchContext {
    pub fn either_tier_one(&self) -> bool {
        self.subject_tier == Tier::One || self.candidate_tier == Tier::One
    }
}

/// Decides whether a match ratio earns the full score
pub trait RatioThreshold: Send + Sync {
    fn passes(&self, context: &MatchContext) -> bool;

    fn describe(&self) -> String {
        "custom".to_string()
    }
}

impl<F> RatioThreshold for F
where
    F: Fn(&MatchContext) -> bool + Send + Sync,
{
    fn passes(&self, context: &MatchContext) -> bool {
        self(context)
    }
}

/// `ratio > bound`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioAbove(pub f64);

impl RatioThreshold for RatioAbove {
    fn passes(&self, context: &MatchContext) -> bool {
        context.ratio > self.0
    }

    fn describe(&self) -> String {
        format!("ratio > {}", self.0)
    }
}

/// Looser bound when either side is a tier-one broadcaster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierLenient {
    pub tier_one: f64,
    pub default: f64,
}

impl RatioThreshold for TierLenient {
    fn passes(&self, context: &MatchContext) -> bool {
        let bound = if context.either_tier_one() {
            self.tier_one
        } else {
            self.default
        };
        context.ratio > bound
    }

    fn describe(&self) -> String {
        format!(
            "ratio > {} (tier one), ratio > {} otherwise",
            self.tier_one, self.default
        )
    }
}

/// Matches candidates whose broadcasts line up with the subject's
pub struct BroadcastMatchingGenerator {
    schedule: Arc<dyn ScheduleResolver>,
    channels: Arc<dyn ChannelResolver>,
    variants: Arc<ChannelVariants>,
    tiers: Arc<TieredBroadcaster>,
    publishers: BTreeSet<Publisher>,
    flexibility: Duration,
    short_flexibility: Duration,
    short_max_duration: Duration,
    extended_end: Option<(Duration, Score)>,
    broadcast_filter: BroadcastFilter,
    ignored_channels: ChannelSet,
    threshold: Arc<dyn RatioThreshold>,
    full_score: Score,
    partial_score: Score,
}

pub struct BroadcastMatchingBuilder {
    generator: BroadcastMatchingGenerator,
}

impl BroadcastMatchingBuilder {
    pub fn variants(mut self, variants: Arc<ChannelVariants>) -> Self {
        self.generator.variants = variants;
        self
    }

    pub fn tiers(mut self, tiers: Arc<TieredBroadcaster>) -> Self {
        self.generator.tiers = tiers;
        self
    }

    pub fn flexibility(mut self, flexibility: Duration) -> Self {
        self.generator.flexibility = flexibility;
        self
    }

    /// Tighter flexibility for broadcasts shorter than `max_duration`
    pub fn short_broadcasts(mut self, flexibility: Duration, max_duration: Duration) -> Self {
        self.generator.short_flexibility = flexibility;
        self.generator.short_max_duration = max_duration;
        self
    }

    /// Score `score` for candidates matching only with a widened end window
    pub fn extended_end(mut self, flexibility: Duration, score: Score) -> Self {
        self.generator.extended_end = Some((flexibility, score));
        self
    }

    pub fn broadcast_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Broadcast) -> bool + Send + Sync + 'static,
    {
        self.generator.broadcast_filter = Arc::new(filter);
        self
    }

    /// Channels skipped unless they carry the subject's only broadcast
    pub fn ignored_channels(mut self, channels: ChannelSet) -> Self {
        self.generator.ignored_channels = channels;
        self
    }

    pub fn threshold(mut self, threshold: impl RatioThreshold + 'static) -> Self {
        self.generator.threshold = Arc::new(threshold);
        self
    }

    pub fn scores(mut self, full: Score, partial: Score) -> Self {
        self.generator.full_score = full;
        self.generator.partial_score = partial;
        self
    }

    /// Apply the `[broadcast]` configuration section
    pub fn config(self, config: &BroadcastMatchingConfig) -> Self {
        let horizon = config.horizon();
        let full = self.generator.full_score;
        let builder = self
            .flexibility(config.flexibility())
            .short_broadcasts(
                config.short_broadcast_flexibility(),
                config.short_broadcast_max_duration(),
            )
            .broadcast_filter(starts_within(horizon));
        match config.extended_end_flexibility() {
            Some(flexibility) => builder.extended_end(flexibility, full.map(|v| v / 10.0)),
            None => builder,
        }
    }

    pub fn build(self) -> BroadcastMatchingGenerator {
        self.generator
    }
}

impl BroadcastMatchingGenerator {
    pub const NAME: &'static str = "Broadcast";

    pub fn builder<I>(
        schedule: Arc<dyn ScheduleResolver>,
        channels: Arc<dyn ChannelResolver>,
        publishers: I,
    ) -> BroadcastMatchingBuilder
    where
        I: IntoIterator<Item = Publisher>,
    {
        let defaults = BroadcastMatchingConfig::default();
        let horizon = defaults.horizon();
        BroadcastMatchingBuilder {
            generator: Self {
                schedule,
                channels,
                variants: Arc::new(ChannelVariants::bbc_defaults()),
                tiers: Arc::new(TieredBroadcaster::default()),
                publishers: publishers.into_iter().collect(),
                flexibility: defaults.flexibility(),
                short_flexibility: defaults.short_broadcast_flexibility(),
                short_max_duration: defaults.short_broadcast_max_duration(),
                extended_end: None,
                broadcast_filter: Arc::new(starts_within(horizon)),
                ignored_channels: ChannelSet::bbc_regional_defaults(),
                threshold: Arc::new(RatioAbove(0.66)),
                full_score: Score::ONE,
                partial_score: Score::of(0.5),
            },
        }
    }

    pub fn threshold_description(&self) -> String {
        self.threshold.describe()
    }

    fn flexibility_for(&self, broadcast: &Broadcast) -> Duration {
        if broadcast.duration() < self.short_max_duration {
            self.short_flexibility
        } else {
            self.flexibility
        }
    }

    /// Subject broadcasts that take part in matching
    fn eligible_broadcasts<'a>(&self, subject: &'a Content) -> Vec<&'a Broadcast> {
        let published: Vec<&Broadcast> = subject.actively_published_broadcasts().collect();
        let only_broadcast = published.len() == 1;
        published
            .into_iter()
            .filter(|b| only_broadcast || !self.ignored_channels.contains(&b.channel_uri))
            .filter(|b| (self.broadcast_filter)(*b))
            .collect()
    }

    fn target_publishers(&self, subject: &Content) -> BTreeSet<Publisher> {
        self.publishers
            .iter()
            .filter(|p| **p != subject.publisher)
            .cloned()
            .collect()
    }

    /// Whether `candidate` aired `reference` within `start_flex`/`end_flex`
    fn has_corresponding_broadcast(
        &self,
        candidate: &Content,
        reference: &Broadcast,
        start_flex: Duration,
        end_flex: Duration,
    ) -> bool {
        candidate.actively_published_broadcasts().any(|b| {
            self.variants
                .same_or_variant(&reference.channel_uri, &b.channel_uri)
                && within(b.transmission_start, reference.transmission_start, start_flex)
                && within(b.transmission_end, reference.transmission_end, end_flex)
        })
    }

    /// Score for `candidate` against the subject's eligible broadcasts
    ///
    /// `None` when no broadcast corresponds at all.
    fn score_candidate(
        &self,
        subject: &Content,
        eligible: &[&Broadcast],
        candidate: &Content,
    ) -> Option<Score> {
        if eligible.is_empty() {
            return None;
        }

        let matched = eligible
            .iter()
            .filter(|b| {
                let flex = self.flexibility_for(b);
                self.has_corresponding_broadcast(candidate, b, flex, flex)
            })
            .count();

        if matched > 0 {
            let context = MatchContext {
                ratio: matched as f64 / eligible.len() as f64,
                subject_tier: self.tiers.classify(subject),
                candidate_tier: self.tiers.classify(candidate),
            };
            let score = if self.threshold.passes(&context) {
                self.full_score
            } else {
                self.partial_score
            };
            debug!(
                candidate = %candidate.canonical_uri,
                matched,
                eligible = eligible.len(),
                ratio = context.ratio,
                %score,
                "Broadcast match"
            );
            return Some(score);
        }

        let (end_flex, score) = self.extended_end?;
        eligible
            .iter()
            .any(|b| {
                self.has_corresponding_broadcast(candidate, b, self.flexibility_for(b), end_flex)
            })
            .then(|| {
                debug!(candidate = %candidate.canonical_uri, %score, "Extended end match");
                score
            })
    }

    /// Candidates scheduled around `broadcast` on its channel and variants
    fn schedule_around(
        &self,
        broadcast: &Broadcast,
        publishers: &BTreeSet<Publisher>,
    ) -> Result<Vec<Arc<Content>>> {
        let channel_uris = self.variants.expand(&broadcast.channel_uri);
        let channels = resolve_channels(self.channels.as_ref(), &channel_uris)?;
        if channels.is_empty() {
            return Ok(Vec::new());
        }

        let flex = self.flexibility_for(broadcast);
        let end_flex = match self.extended_end {
            Some((extended, _)) => extended.max(flex),
            None => flex,
        };
        let (start, end) = widen(
            broadcast.transmission_start,
            broadcast.transmission_end,
            flex,
            end_flex,
        )?;
        self.schedule.resolve(start, end, &channels, publishers)
    }
}

impl EquivalenceGenerator for BroadcastMatchingGenerator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn generate(
        &self,
        subject: &Content,
        report: &RunReporter,
    ) -> Result<ScoredCandidates<Content>> {
        let publishers = self.target_publishers(subject);
        let eligible = self.eligible_broadcasts(subject);

        let mut pool: BTreeMap<String, Arc<Content>> = BTreeMap::new();
        for broadcast in &eligible {
            for candidate in self.schedule_around(broadcast, &publishers)? {
                if candidate.canonical_uri == subject.canonical_uri
                    || !candidate.actively_published
                {
                    continue;
                }
                pool.entry(candidate.canonical_uri.clone()).or_insert(candidate);
            }
        }

        let mut scores = ScoredCandidates::from_source(Self::NAME);
        for candidate in pool.into_values() {
            if let Some(score) = self.score_candidate(subject, &eligible, &candidate) {
                scores.add(candidate, score);
            }
        }

        debug!(
            subject = %report.subject(),
            processed = eligible.len(),
            total = subject.broadcasts.len(),
            candidates = scores.len(),
            "Broadcast matching complete"
        );
        Ok(scores.build())
    }

    fn metadata(&self) -> GeneratorMetadata {
        GeneratorMetadata::source_limited(Self::NAME, self.publishers.clone())
    }
}

impl EquivalenceScorer for BroadcastMatchingGenerator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn score(
        &self,
        subject: &Content,
        candidates: &[Arc<Content>],
        report: &RunReporter,
    ) -> Result<ScoredCandidates<Content>> {
        let eligible = self.eligible_broadcasts(subject);
        let mut scores = ScoredCandidates::from_source(Self::NAME);
        for candidate in candidates {
            let score = if candidate.canonical_uri() == subject.canonical_uri() {
                Score::NULL
            } else {
                self.score_candidate(subject, &eligible, candidate)
                    .unwrap_or(Score::NULL)
            };
            scores.add(Arc::clone(candidate), score);
        }
        debug!(subject = %report.subject(), scored = scores.len(), "Broadcast scoring complete");
        Ok(scores.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::InMemoryStore;
    use chrono::{DateTime, TimeZone, Utc};
    use equiv_common::reporter::NoopReporter;
    use equiv_common::Channel;

    const BBC_ONE: &str = "http://www.bbc.co.uk/services/bbcone/london";
    const ITV: &str = "http://www.itv.com/channels/itv1/london";

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    fn store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.add_channel(Channel::new(BBC_ONE, Publisher::from(Publisher::BBC)));
        store.add_channel(Channel::new(ITV, Publisher::from(Publisher::ITV)));
        store
    }

    fn airing(
        uri: &str,
        publisher: &str,
        slots: &[(&str, DateTime<Utc>, DateTime<Utc>)],
    ) -> Content {
        slots.iter().fold(
            Content::item(uri, Publisher::from(publisher)).with_title("Panorama"),
            |content, (channel, start, end)| {
                content.with_broadcast(Broadcast::new(*channel, *start, *end).unwrap())
            },
        )
    }

    fn generator(store: &Arc<InMemoryStore>) -> BroadcastMatchingGenerator {
        BroadcastMatchingGenerator::builder(
            store.clone(),
            store.clone(),
            [Publisher::from(Publisher::PA), Publisher::from(Publisher::BBC)],
        )
        .broadcast_filter(|_| true)
        .build()
    }

    fn report() -> RunReporter {
        RunReporter::new("subject", Arc::new(NoopReporter))
    }

    #[test]
    fn test_own_publisher_excluded() {
        let store = store();
        let subject = store.add_content(airing(
            "http://bbc/a",
            Publisher::BBC,
            &[(BBC_ONE, at(20, 0), at(21, 0))],
        ));
        store.add_content(airing(
            "http://bbc/b",
            Publisher::BBC,
            &[(BBC_ONE, at(20, 0), at(21, 0))],
        ));
        store.add_content(airing("http://pa/c", Publisher::PA, &[(BBC_ONE, at(20, 1), at(21, 1))]));

        let scores = generator(&store).generate(&subject, &report()).unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores.score_for("http://pa/c"), Score::ONE);
    }

    #[test]
    fn test_different_channel_never_matches() {
        let store = store();
        let subject = store.add_content(airing(
            "http://bbc/a",
            Publisher::BBC,
            &[(BBC_ONE, at(20, 0), at(21, 0))],
        ));
        store.add_content(airing("http://pa/c", Publisher::PA, &[(ITV, at(20, 0), at(21, 0))]));

        let scores = generator(&store).generate(&subject, &report()).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn test_short_broadcasts_use_tighter_window() {
        let store = store();
        let subject = store.add_content(airing(
            "http://bbc/a",
            Publisher::BBC,
            &[(BBC_ONE, at(20, 0), at(20, 5))],
        ));
        store.add_content(airing(
            "http://pa/near",
            Publisher::PA,
            &[(BBC_ONE, at(20, 2), at(20, 7))],
        ));
        store.add_content(airing(
            "http://pa/far",
            Publisher::PA,
            &[(BBC_ONE, at(20, 3), at(20, 8))],
        ));

        let scores = generator(&store).generate(&subject, &report()).unwrap();
        assert!(scores.contains("http://pa/near"));
        assert!(!scores.contains("http://pa/far"));
    }

    #[test]
    fn test_extended_end_scores_separately() {
        let store = store();
        let subject = store.add_content(airing(
            "http://bbc/a",
            Publisher::BBC,
            &[(BBC_ONE, at(20, 0), at(21, 0))],
        ));
        store.add_content(airing(
            "http://pa/long",
            Publisher::PA,
            &[(BBC_ONE, at(20, 0), at(23, 0))],
        ));

        let strict = generator(&store).generate(&subject, &report()).unwrap();
        assert!(strict.is_empty());

        let extended = BroadcastMatchingGenerator::builder(
            store.clone(),
            store.clone(),
            [Publisher::from(Publisher::PA)],
        )
        .broadcast_filter(|_| true)
        .extended_end(Duration::minutes(185), Score::of(0.1))
        .build();
        let scores = extended.generate(&subject, &report()).unwrap();
        assert_eq!(scores.score_for("http://pa/long"), Score::of(0.1));
    }

    #[test]
    fn test_ignored_regional_channel_needs_single_broadcast() {
        let regional = "http://www.bbc.co.uk/services/bbcone/wales";
        let store = store();
        store.add_channel(Channel::new(regional, Publisher::from(Publisher::BBC)));
        store.add_content(airing(
            "http://pa/c",
            Publisher::PA,
            &[(regional, at(20, 0), at(21, 0))],
        ));

        let single = airing("http://bbc/a", Publisher::BBC, &[(regional, at(20, 0), at(21, 0))]);
        let scores = generator(&store).generate(&single, &report()).unwrap();
        assert!(scores.contains("http://pa/c"));

        let repeated = airing(
            "http://bbc/b",
            Publisher::BBC,
            &[(regional, at(20, 0), at(21, 0)), (BBC_ONE, at(22, 0), at(23, 0))],
        );
        let scores = generator(&store).generate(&repeated, &report()).unwrap();
        assert!(!scores.contains("http://pa/c"));
    }

    #[test]
    fn test_tier_lenient_threshold() {
        let threshold = TierLenient {
            tier_one: 0.0,
            default: 0.66,
        };
        let context = |ratio, tier| MatchContext {
            ratio,
            subject_tier: tier,
            candidate_tier: Tier::Two,
        };
        assert!(threshold.passes(&context(0.5, Tier::One)));
        assert!(!threshold.passes(&context(0.5, Tier::Two)));
        assert!(threshold.passes(&context(0.67, Tier::Two)));

        let closure = |c: &MatchContext| c.ratio >= 0.5;
        assert!(closure.passes(&context(0.5, Tier::Two)));
        assert_eq!(RatioAbove(0.66).describe(), "ratio > 0.66");
    }

    #[test]
    fn test_scores_supplied_candidates() {
        let store = store();
        let subject = airing("http://bbc/a", Publisher::BBC, &[(BBC_ONE, at(20, 0), at(21, 0))]);
        let matching = Arc::new(airing(
            "http://pa/c",
            Publisher::PA,
            &[(BBC_ONE, at(20, 0), at(21, 0))],
        ));
        let elsewhere = Arc::new(airing(
            "http://pa/d",
            Publisher::PA,
            &[(ITV, at(20, 0), at(21, 0))],
        ));

        let scores = EquivalenceScorer::score(
            &generator(&store),
            &subject,
            &[matching, elsewhere],
            &report(),
        )
        .unwrap();
        assert_eq!(scores.score_for("http://pa/c"), Score::ONE);
        assert!(scores.contains("http://pa/d"));
        assert_eq!(scores.score_for("http://pa/d"), Score::NULL);
    }
}
