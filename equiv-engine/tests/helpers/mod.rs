//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use dashmap::DashMap;
use equiv_common::reporter::NoopReporter;
use equiv_common::{Broadcast, Channel, Content, Publisher, Result, RunReporter};
use equiv_engine::pipeline::{EquivalenceResult, EquivalenceResultHandler};
use equiv_engine::InMemoryStore;
use std::sync::Arc;

pub const BBC_ONE_LONDON: &str = "http://www.bbc.co.uk/services/bbcone/london";
pub const BBC_ONE_EAST: &str = "http://www.bbc.co.uk/services/bbcone/east";
pub const BBC_TWO_WALES: &str = "http://www.bbc.co.uk/services/bbctwo/wales";
pub const ITV_LONDON: &str = "http://www.itv.com/channels/itv1/london";
pub const ESPN: &str = "http://ref.atlasapi.org/channels/espn";

/// A fixed evening, long enough ago to pass every broadcast horizon
pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, hour, minute, second).unwrap()
}

pub fn plus_seconds(time: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    time + Duration::seconds(seconds)
}

/// Store with every channel the tests broadcast on
pub fn store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for (uri, broadcaster) in [
        (BBC_ONE_LONDON, Publisher::BBC),
        (BBC_ONE_EAST, Publisher::BBC),
        (BBC_TWO_WALES, Publisher::BBC),
        (ITV_LONDON, Publisher::ITV),
        (ESPN, Publisher::PA),
    ] {
        store.add_channel(Channel::new(uri, Publisher::from(broadcaster)));
    }
    store
}

pub fn broadcast(channel: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Broadcast {
    Broadcast::new(channel, start, end).unwrap()
}

/// Titled item with one broadcast per slot
pub fn airing(
    uri: &str,
    publisher: &str,
    title: &str,
    slots: &[(&str, DateTime<Utc>, DateTime<Utc>)],
) -> Content {
    slots.iter().fold(
        Content::item(uri, Publisher::from(publisher)).with_title(title),
        |content, (channel, start, end)| content.with_broadcast(broadcast(channel, *start, *end)),
    )
}

pub fn report() -> RunReporter {
    RunReporter::new("test-subject", Arc::new(NoopReporter))
}

/// Handler that remembers the strong equivalents of every handled subject
#[derive(Default)]
pub struct CollectingHandler {
    pub strong: DashMap<String, Vec<String>>,
}

impl CollectingHandler {
    pub fn strong_for(&self, subject: &str) -> Vec<String> {
        self.strong
            .get(subject)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

impl EquivalenceResultHandler<Content> for CollectingHandler {
    fn handle(&self, result: &EquivalenceResult<Content>) -> Result<()> {
        self.strong.insert(
            result.subject.clone(),
            result.strong_uris().into_iter().map(str::to_string).collect(),
        );
        Ok(())
    }
}
