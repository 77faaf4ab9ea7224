//! Sibling regional/transmission-log channel matching
//!
//! Regional opt-outs and per-provider log identifiers carry the same
//! programme under different channel URIs at (almost) the same time. Only
//! the sibling channels of the subject's channel are searched, and titles
//! must be identical.

use super::{widen, within, EquivalenceGenerator};
use crate::pipeline::GeneratorMetadata;
use crate::resolvers::{resolve_channels, ChannelResolver, ScheduleResolver};
use chrono::Duration;
use equiv_common::config::RegionalConfig;
use equiv_common::{
    Broadcast, ChannelVariants, Content, Publisher, Result, RunReporter, Score, ScoredCandidates,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

pub struct RegionalTxlogGenerator {
    schedule: Arc<dyn ScheduleResolver>,
    channels: Arc<dyn ChannelResolver>,
    variants: Arc<ChannelVariants>,
    publishers: BTreeSet<Publisher>,
    flexibility: Duration,
    score: Score,
}

impl RegionalTxlogGenerator {
    pub const NAME: &'static str = "Regional-Txlog";

    pub fn new(schedule: Arc<dyn ScheduleResolver>, channels: Arc<dyn ChannelResolver>) -> Self {
        Self {
            schedule,
            channels,
            variants: Arc::new(ChannelVariants::bbc_defaults()),
            publishers: [Publisher::LAYER3_TXLOGS, Publisher::BARB_TRANSMISSIONS]
                .into_iter()
                .map(Publisher::from)
                .collect(),
            flexibility: RegionalConfig::default().flexibility(),
            score: Score::of(2.0),
        }
    }

    pub fn with_variants(mut self, variants: Arc<ChannelVariants>) -> Self {
        self.variants = variants;
        self
    }

    pub fn with_publishers<I: IntoIterator<Item = Publisher>>(mut self, publishers: I) -> Self {
        self.publishers = publishers.into_iter().collect();
        self
    }

    pub fn with_flexibility(mut self, flexibility: Duration) -> Self {
        self.flexibility = flexibility;
        self
    }

    pub fn with_score(mut self, score: Score) -> Self {
        self.score = score;
        self
    }

    pub fn with_config(self, config: &RegionalConfig) -> Self {
        self.with_flexibility(config.flexibility())
    }

    fn aired_on(&self, candidate: &Content, channel_uri: &str, reference: &Broadcast) -> bool {
        candidate.actively_published_broadcasts().any(|b| {
            b.channel_uri == channel_uri
                && within(b.transmission_start, reference.transmission_start, self.flexibility)
                && within(b.transmission_end, reference.transmission_end, self.flexibility)
        })
    }
}

impl EquivalenceGenerator for RegionalTxlogGenerator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn generate(
        &self,
        subject: &Content,
        report: &RunReporter,
    ) -> Result<ScoredCandidates<Content>> {
        let mut scores = ScoredCandidates::from_source(Self::NAME);
        let Some(title) = subject.title() else {
            debug!(subject = %report.subject(), "No title, skipping regional matching");
            return Ok(scores.build());
        };

        let mut matched = BTreeSet::new();
        for broadcast in subject.actively_published_broadcasts() {
            let siblings = self.variants.siblings(&broadcast.channel_uri);
            if siblings.is_empty() {
                continue;
            }
            let channels = resolve_channels(self.channels.as_ref(), &siblings)?;
            if channels.is_empty() {
                continue;
            }

            let (start, end) = widen(
                broadcast.transmission_start,
                broadcast.transmission_end,
                self.flexibility,
                self.flexibility,
            )?;
            let schedule =
                self.schedule.unmerged_schedule(start, end, &channels, &self.publishers)?;

            for listing in &schedule.channels {
                for candidate in &listing.items {
                    if candidate.canonical_uri == subject.canonical_uri
                        || !candidate.actively_published
                        || matched.contains(&candidate.canonical_uri)
                        || candidate.title() != Some(title)
                    {
                        continue;
                    }
                    if self.aired_on(candidate, &listing.channel.uri, broadcast) {
                        debug!(
                            subject = %report.subject(),
                            candidate = %candidate.canonical_uri,
                            channel = %listing.channel.uri,
                            "Regional variant match"
                        );
                        matched.insert(candidate.canonical_uri.clone());
                        scores.add(Arc::clone(candidate), self.score);
                    }
                }
            }
        }

        Ok(scores.build())
    }

    fn metadata(&self) -> GeneratorMetadata {
        GeneratorMetadata::source_limited(Self::NAME, self.publishers.clone())
    }
}
