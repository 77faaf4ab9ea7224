//! Content, broadcast and publisher models
//!
//! Every value here is immutable once handed to the engine and re-derived
//! per pipeline run by whichever resolver produced it.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Publisher key, e.g. `pressassociation.com`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Publisher(String);

impl Publisher {
    pub const BBC: &'static str = "bbc.co.uk";
    pub const BBC_NITRO: &'static str = "nitro.bbc.co.uk";
    pub const PA: &'static str = "pressassociation.com";
    pub const BARB_TRANSMISSIONS: &'static str = "barb-transmissions";
    pub const LAYER3_TXLOGS: &'static str = "layer3-txlogs";
    pub const ITV: &'static str = "cps.itv.com";
    pub const C4: &'static str = "pmlsd.channel4.com";
    pub const C5: &'static str = "datasubmission.channel5.com";
    pub const UKTV: &'static str = "uktv.co.uk";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Publisher {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl PartialEq<str> for Publisher {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Publisher {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity contract shared by everything the pipeline can score
pub trait Identified {
    /// Canonical URI, stable across publishers
    fn canonical_uri(&self) -> &str;

    /// Numeric id, when the store assigned one
    fn id(&self) -> Option<u64>;

    fn publisher(&self) -> &Publisher;
}

// ============================================================================
// Broadcasts
// ============================================================================

/// One scheduled transmission of a piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broadcast {
    pub channel_uri: String,
    pub transmission_start: DateTime<Utc>,
    pub transmission_end: DateTime<Utc>,

    /// As-aired times; independent of the scheduled times
    #[serde(default)]
    pub actual_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_end: Option<DateTime<Utc>>,

    #[serde(default)]
    pub source_id: Option<String>,

    #[serde(default = "default_true")]
    pub actively_published: bool,
}

fn default_true() -> bool {
    true
}

impl Broadcast {
    /// Create a scheduled broadcast
    ///
    /// # Returns
    /// `Error::InvalidInput` when `end` precedes `start`
    pub fn new(
        channel_uri: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self> {
        let channel_uri = channel_uri.into();
        if end < start {
            return Err(Error::InvalidInput(format!(
                "broadcast on {channel_uri} ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self {
            channel_uri,
            transmission_start: start,
            transmission_end: end,
            actual_start: None,
            actual_end: None,
            source_id: None,
            actively_published: true,
        })
    }

    /// Attach as-aired times
    pub fn with_actual_times(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidInput(format!(
                "actual transmission on {} ends ({end}) before it starts ({start})",
                self.channel_uri
            )));
        }
        self.actual_start = Some(start);
        self.actual_end = Some(end);
        Ok(self)
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.actively_published = false;
        self
    }

    /// Scheduled duration
    pub fn duration(&self) -> Duration {
        self.transmission_end - self.transmission_start
    }

    /// Actual start/end when both are present
    pub fn actual_times(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.actual_start.zip(self.actual_end)
    }
}

// ============================================================================
// Content
// ============================================================================

/// Kind of content record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Item,
    Episode,
    Film,
    Brand,
    Series,
}

impl ContentKind {
    pub fn is_container(&self) -> bool {
        matches!(self, ContentKind::Brand | ContentKind::Series)
    }
}

/// A content record from one publisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub canonical_uri: String,
    #[serde(default)]
    pub id: Option<u64>,
    pub publisher: Publisher,
    pub kind: ContentKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,

    /// Brand for items and episodes; parent brand for a series
    #[serde(default)]
    pub container_uri: Option<String>,

    /// Series for episodes
    #[serde(default)]
    pub series_uri: Option<String>,

    #[serde(default)]
    pub broadcasts: Vec<Broadcast>,

    /// Publisher-specific key/value annotations (e.g. broadcaster group ids)
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,

    #[serde(default = "default_true")]
    pub actively_published: bool,
}

impl Content {
    pub fn new(uri: impl Into<String>, publisher: Publisher, kind: ContentKind) -> Self {
        Self {
            canonical_uri: uri.into(),
            id: None,
            publisher,
            kind,
            title: None,
            year: None,
            container_uri: None,
            series_uri: None,
            broadcasts: Vec::new(),
            custom_fields: BTreeMap::new(),
            actively_published: true,
        }
    }

    pub fn item(uri: impl Into<String>, publisher: Publisher) -> Self {
        Self::new(uri, publisher, ContentKind::Item)
    }

    pub fn episode(uri: impl Into<String>, publisher: Publisher) -> Self {
        Self::new(uri, publisher, ContentKind::Episode)
    }

    pub fn brand(uri: impl Into<String>, publisher: Publisher) -> Self {
        Self::new(uri, publisher, ContentKind::Brand)
    }

    pub fn series(uri: impl Into<String>, publisher: Publisher) -> Self {
        Self::new(uri, publisher, ContentKind::Series)
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_container(mut self, uri: impl Into<String>) -> Self {
        self.container_uri = Some(uri.into());
        self
    }

    pub fn with_series(mut self, uri: impl Into<String>) -> Self {
        self.series_uri = Some(uri.into());
        self
    }

    pub fn with_broadcast(mut self, broadcast: Broadcast) -> Self {
        self.broadcasts.push(broadcast);
        self
    }

    pub fn with_custom_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_fields.insert(key.into(), value.into());
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.actively_published = false;
        self
    }

    /// Title, if present and not blank
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Brands, and series without a parent brand
    pub fn is_top_level_container(&self) -> bool {
        match self.kind {
            ContentKind::Brand => true,
            ContentKind::Series => self.container_uri.is_none(),
            _ => false,
        }
    }

    pub fn actively_published_broadcasts(&self) -> impl Iterator<Item = &Broadcast> {
        self.broadcasts.iter().filter(|b| b.actively_published)
    }
}

impl Identified for Content {
    fn canonical_uri(&self) -> &str {
        &self.canonical_uri
    }

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn publisher(&self) -> &Publisher {
        &self.publisher
    }
}
