//! As-aired time matching between programme metadata and transmission logs
//!
//! Stricter than broadcast-window matching: candidates must agree on actual
//! start and end times to within a second. Transmission-log publishers only
//! carry one set of times, so for them the scheduled times stand in for the
//! actual ones.

use super::{widen, within, EquivalenceGenerator};
use crate::pipeline::GeneratorMetadata;
use crate::resolvers::{resolve_channels, ChannelResolver, ScheduleResolver};
use chrono::{DateTime, Duration, Utc};
use equiv_common::config::ActualTransmissionConfig;
use equiv_common::{
    Broadcast, ChannelSet, ChannelVariants, Content, Publisher, Result, RunReporter, Score,
    ScoredCandidates,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

type EffectiveTimes = (Option<DateTime<Utc>>, Option<DateTime<Utc>>);

pub struct ActualTransmissionGenerator {
    schedule: Arc<dyn ScheduleResolver>,
    channels: Arc<dyn ChannelResolver>,
    variants: Arc<ChannelVariants>,
    publishers: BTreeSet<Publisher>,
    scheduled_as_actual: BTreeSet<Publisher>,
    start_only_channels: ChannelSet,
    flexibility: Duration,
    schedule_window: Duration,
    score: Score,
}

pub struct ActualTransmissionBuilder {
    generator: ActualTransmissionGenerator,
}

impl ActualTransmissionBuilder {
    pub fn publishers<I: IntoIterator<Item = Publisher>>(mut self, publishers: I) -> Self {
        self.generator.publishers = publishers.into_iter().collect();
        self
    }

    /// Publishers whose scheduled times are their as-aired times
    pub fn scheduled_as_actual<I: IntoIterator<Item = Publisher>>(mut self, publishers: I) -> Self {
        self.generator.scheduled_as_actual = publishers.into_iter().collect();
        self
    }

    /// Channels whose logs only carry a reliable start time
    pub fn start_only_channels(mut self, channels: ChannelSet) -> Self {
        self.generator.start_only_channels = channels;
        self
    }

    pub fn variants(mut self, variants: Arc<ChannelVariants>) -> Self {
        self.generator.variants = variants;
        self
    }

    pub fn flexibility(mut self, flexibility: Duration) -> Self {
        self.generator.flexibility = flexibility;
        self
    }

    pub fn schedule_window(mut self, window: Duration) -> Self {
        self.generator.schedule_window = window;
        self
    }

    pub fn score(mut self, score: Score) -> Self {
        self.generator.score = score;
        self
    }

    pub fn config(self, config: &ActualTransmissionConfig) -> Self {
        self.flexibility(config.flexibility())
            .schedule_window(config.schedule_window())
    }

    pub fn build(self) -> ActualTransmissionGenerator {
        self.generator
    }
}

impl ActualTransmissionGenerator {
    pub const NAME: &'static str = "Actual-Transmission";

    pub fn builder(
        schedule: Arc<dyn ScheduleResolver>,
        channels: Arc<dyn ChannelResolver>,
    ) -> ActualTransmissionBuilder {
        let defaults = ActualTransmissionConfig::default();
        ActualTransmissionBuilder {
            generator: Self {
                schedule,
                channels,
                variants: Arc::new(ChannelVariants::bbc_defaults()),
                publishers: [Publisher::BBC_NITRO, Publisher::BARB_TRANSMISSIONS]
                    .into_iter()
                    .map(Publisher::from)
                    .collect(),
                scheduled_as_actual: [Publisher::BARB_TRANSMISSIONS, Publisher::LAYER3_TXLOGS]
                    .into_iter()
                    .map(Publisher::from)
                    .collect(),
                start_only_channels: ChannelSet::start_time_only_defaults(),
                flexibility: defaults.flexibility(),
                schedule_window: defaults.schedule_window(),
                score: Score::of(3.0),
            },
        }
    }

    fn effective_times(&self, content: &Content, broadcast: &Broadcast) -> EffectiveTimes {
        if self.scheduled_as_actual.contains(&content.publisher) {
            (
                Some(broadcast.actual_start.unwrap_or(broadcast.transmission_start)),
                Some(broadcast.actual_end.unwrap_or(broadcast.transmission_end)),
            )
        } else {
            (broadcast.actual_start, broadcast.actual_end)
        }
    }

    /// Both sides aired together, within flexibility
    ///
    /// Missing times on either side mean no match, except that start-only
    /// channels never need an end time.
    fn aired_together(
        &self,
        subject: &Content,
        subject_broadcast: &Broadcast,
        candidate: &Content,
        candidate_broadcast: &Broadcast,
    ) -> bool {
        if !self
            .variants
            .same_or_variant(&subject_broadcast.channel_uri, &candidate_broadcast.channel_uri)
        {
            return false;
        }

        let start_only = self
            .start_only_channels
            .contains(&subject_broadcast.channel_uri)
            || self
                .start_only_channels
                .contains(&candidate_broadcast.channel_uri);

        let (subject_start, subject_end) = self.effective_times(subject, subject_broadcast);
        let (candidate_start, candidate_end) = self.effective_times(candidate, candidate_broadcast);

        let (Some(subject_start), Some(candidate_start)) = (subject_start, candidate_start) else {
            return false;
        };
        if !within(candidate_start, subject_start, self.flexibility) {
            return false;
        }
        if start_only {
            return true;
        }
        match (subject_end, candidate_end) {
            (Some(subject_end), Some(candidate_end)) => {
                within(candidate_end, subject_end, self.flexibility)
            }
            _ => false,
        }
    }
}

impl EquivalenceGenerator for ActualTransmissionGenerator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn generate(
        &self,
        subject: &Content,
        report: &RunReporter,
    ) -> Result<ScoredCandidates<Content>> {
        let publishers: BTreeSet<Publisher> = self
            .publishers
            .iter()
            .filter(|p| **p != subject.publisher)
            .cloned()
            .collect();

        let mut scores = ScoredCandidates::from_source(Self::NAME);
        let mut matched = BTreeSet::new();

        for broadcast in subject.actively_published_broadcasts() {
            let channel_uris = self.variants.expand(&broadcast.channel_uri);
            let channels = resolve_channels(self.channels.as_ref(), &channel_uris)?;
            if channels.is_empty() {
                continue;
            }

            let (start, end) = widen(
                broadcast.transmission_start,
                broadcast.transmission_end,
                self.schedule_window,
                self.schedule_window,
            )?;
            let candidates = self.schedule.resolve(start, end, &channels, &publishers)?;

            for candidate in candidates {
                if candidate.canonical_uri == subject.canonical_uri
                    || !candidate.actively_published
                    || matched.contains(&candidate.canonical_uri)
                {
                    continue;
                }
                let aired_together = candidate
                    .actively_published_broadcasts()
                    .any(|b| self.aired_together(subject, broadcast, &candidate, b));
                if aired_together {
                    debug!(
                        subject = %report.subject(),
                        candidate = %candidate.canonical_uri,
                        channel = %broadcast.channel_uri,
                        "Actual transmission match"
                    );
                    matched.insert(candidate.canonical_uri.clone());
                    scores.add(candidate, self.score);
                }
            }
        }

        Ok(scores.build())
    }

    fn metadata(&self) -> GeneratorMetadata {
        GeneratorMetadata::source_limited(Self::NAME, self.publishers.clone())
    }
}
