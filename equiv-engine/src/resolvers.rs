//! External collaborator contracts
//!
//! Schedule, channel and content stores are owned outside the engine. All
//! calls are synchronous and may block; concurrency comes from evaluating
//! many subjects at once. Any `Err` returned here propagates out of the
//! pipeline for the subject being evaluated.

use chrono::{DateTime, Utc};
use equiv_common::{Channel, Content, Identified, Publisher, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

/// Items scheduled on one channel within a query window
#[derive(Debug, Clone)]
pub struct ScheduleChannel {
    pub channel: Channel,
    pub items: Vec<Arc<Content>>,
}

/// Per-channel partition of a schedule query
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub channels: Vec<ScheduleChannel>,
}

impl Schedule {
    /// All items across channels, deduplicated by canonical URI
    pub fn merged(&self) -> Vec<Arc<Content>> {
        let mut seen = BTreeSet::new();
        self.channels
            .iter()
            .flat_map(|c| c.items.iter())
            .filter(|item| seen.insert(item.canonical_uri().to_string()))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(|c| c.items.is_empty())
    }
}

/// Schedule store
pub trait ScheduleResolver: Send + Sync {
    /// Items from `publishers` broadcast on each of `channels` within `[start, end]`
    fn unmerged_schedule(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        channels: &[Channel],
        publishers: &BTreeSet<Publisher>,
    ) -> Result<Schedule>;

    /// Items across all channels, deduplicated
    fn resolve(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        channels: &[Channel],
        publishers: &BTreeSet<Publisher>,
    ) -> Result<Vec<Arc<Content>>> {
        Ok(self
            .unmerged_schedule(start, end, channels, publishers)?
            .merged())
    }
}

/// Channel store
pub trait ChannelResolver: Send + Sync {
    /// `Ok(None)` when the URI is unknown
    fn from_uri(&self, uri: &str) -> Result<Option<Channel>>;
}

/// Content store
pub trait ContentResolver: Send + Sync {
    /// Resolve whichever of `uris` exist, keyed by canonical URI
    fn find_by_canonical_uris(&self, uris: &[String]) -> Result<BTreeMap<String, Arc<Content>>>;
}

/// Resolve channel URIs, dropping (and logging) any that do not resolve
///
/// Resolver errors are not swallowed.
pub fn resolve_channels<'a, I>(resolver: &dyn ChannelResolver, uris: I) -> Result<Vec<Channel>>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut channels = Vec::new();
    for uri in uris {
        match resolver.from_uri(uri)? {
            Some(channel) => channels.push(channel),
            None => warn!(channel = %uri, "Channel did not resolve, skipping"),
        }
    }
    Ok(channels)
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-process store implementing every resolver contract
///
/// Suitable for embedding small datasets and for tests. The schedule view is
/// derived from each item's actively published broadcasts.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    channels: RwLock<BTreeMap<String, Channel>>,
    content: RwLock<BTreeMap<String, Arc<Content>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Every write is a single map insert, so a poisoned map is still whole
    // and both reads and writes carry on with it.
    pub fn add_channel(&self, channel: Channel) {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel.uri.clone(), channel);
    }

    /// Insert or replace content, returning the stored handle
    pub fn add_content(&self, content: Content) -> Arc<Content> {
        let content = Arc::new(content);
        self.content
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(content.canonical_uri.clone(), Arc::clone(&content));
        content
    }

    pub fn content(&self, uri: &str) -> Option<Arc<Content>> {
        self.content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }
}

impl ScheduleResolver for InMemoryStore {
    fn unmerged_schedule(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        channels: &[Channel],
        publishers: &BTreeSet<Publisher>,
    ) -> Result<Schedule> {
        let store = self.content.read().unwrap_or_else(PoisonError::into_inner);

        let channels = channels
            .iter()
            .map(|channel| {
                let items = store
                    .values()
                    .filter(|item| publishers.contains(&item.publisher))
                    .filter(|item| {
                        item.actively_published_broadcasts().any(|b| {
                            b.channel_uri == channel.uri
                                && b.transmission_start <= end
                                && b.transmission_end >= start
                        })
                    })
                    .cloned()
                    .collect();
                ScheduleChannel {
                    channel: channel.clone(),
                    items,
                }
            })
            .collect();

        Ok(Schedule { channels })
    }
}

impl ChannelResolver for InMemoryStore {
    fn from_uri(&self, uri: &str) -> Result<Option<Channel>> {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        Ok(channels.get(uri).cloned())
    }
}

impl ContentResolver for InMemoryStore {
    fn find_by_canonical_uris(&self, uris: &[String]) -> Result<BTreeMap<String, Arc<Content>>> {
        let store = self.content.read().unwrap_or_else(PoisonError::into_inner);
        Ok(uris
            .iter()
            .filter_map(|uri| store.get(uri).map(|c| (uri.clone(), Arc::clone(c))))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use equiv_common::Broadcast;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let pa = Publisher::from(Publisher::PA);
        store.add_channel(Channel::new("http://channel/one", pa.clone()));
        store.add_channel(Channel::new("http://channel/two", pa.clone()));
        store.add_content(
            Content::item("http://pa/1", pa.clone()).with_broadcast(
                Broadcast::new("http://channel/one", at(10, 0), at(11, 0)).unwrap(),
            ),
        );
        store.add_content(
            Content::item("http://pa/2", pa.clone()).with_broadcast(
                Broadcast::new("http://channel/two", at(10, 0), at(11, 0)).unwrap(),
            ),
        );
        store.add_content(
            Content::item("http://pa/3", pa).with_broadcast(
                Broadcast::new("http://channel/one", at(10, 0), at(11, 0))
                    .unwrap()
                    .unpublished(),
            ),
        );
        store
    }

    #[test]
    fn test_writes_survive_a_poisoned_lock() {
        let store = Arc::new(store());
        let poisoner = Arc::clone(&store);
        let outcome = std::thread::spawn(move || {
            let _guard = poisoner.content.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(outcome.is_err());
        assert!(store.content.is_poisoned());

        let pa = Publisher::from(Publisher::PA);
        store.add_content(Content::item("http://pa/4", pa.clone()));
        store.add_channel(Channel::new("http://channel/three", pa));

        assert!(store.content("http://pa/4").is_some());
        assert!(store.from_uri("http://channel/three").unwrap().is_some());
        let found = store
            .find_by_canonical_uris(&["http://pa/1".to_string(), "http://pa/4".to_string()])
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_unmerged_schedule_partitions_by_channel() {
        let store = store();
        let channels = resolve_channels(
            &store,
            &["http://channel/one".to_string(), "http://channel/two".to_string()],
        )
        .unwrap();
        let publishers = BTreeSet::from([Publisher::from(Publisher::PA)]);

        let schedule = store
            .unmerged_schedule(at(9, 0), at(12, 0), &channels, &publishers)
            .unwrap();
        assert_eq!(schedule.channels.len(), 2);
        assert_eq!(schedule.channels[0].items.len(), 1);
        assert_eq!(schedule.channels[0].items[0].canonical_uri, "http://pa/1");
        assert_eq!(schedule.merged().len(), 2);
    }

    #[test]
    fn test_schedule_filters_publishers_and_window() {
        let store = store();
        let channels = resolve_channels(&store, &["http://channel/one".to_string()]).unwrap();

        let other = BTreeSet::from([Publisher::from(Publisher::BBC_NITRO)]);
        assert!(store
            .unmerged_schedule(at(9, 0), at(12, 0), &channels, &other)
            .unwrap()
            .is_empty());

        let pa = BTreeSet::from([Publisher::from(Publisher::PA)]);
        assert!(store
            .unmerged_schedule(at(12, 0), at(13, 0), &channels, &pa)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unresolvable_channels_are_dropped() {
        let store = store();
        let channels = resolve_channels(
            &store,
            &["http://channel/one".to_string(), "http://channel/missing".to_string()],
        )
        .unwrap();
        assert_eq!(channels.len(), 1);
    }

    #[test]
    fn test_find_by_canonical_uris_returns_resolved_subset() {
        let store = store();
        let found = store
            .find_by_canonical_uris(&["http://pa/1".to_string(), "http://pa/none".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("http://pa/1"));
    }
}
