//! Channels and channel variant topology
//!
//! A variant group is a static table of channel URIs that carry the same
//! logical service: regional opt-outs of a national channel, or the several
//! transmission-log identifiers one provider uses for a single channel.
//!
//! Two shapes are supported:
//! - **Star**: a primary channel with members. The primary's siblings are
//!   every member; each member's only sibling is the primary.
//! - **Clique**: no primary. Every member is a sibling of every other.

use crate::model::Publisher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Media carried by a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Video,
    Audio,
}

/// A resolved broadcast channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub uri: String,
    #[serde(default)]
    pub title: Option<String>,
    pub broadcaster: Publisher,
    pub media_type: MediaType,
    #[serde(default)]
    pub high_definition: bool,
}

impl Channel {
    pub fn new(uri: impl Into<String>, broadcaster: Publisher) -> Self {
        Self {
            uri: uri.into(),
            title: None,
            broadcaster,
            media_type: MediaType::Video,
            high_definition: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    pub fn high_definition(mut self) -> Self {
        self.high_definition = true;
        self
    }
}

// ============================================================================
// Variant groups
// ============================================================================

/// One group of channel URIs representing the same logical service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantGroup {
    #[serde(default)]
    pub primary: Option<String>,
    pub members: BTreeSet<String>,
}

impl VariantGroup {
    /// Star-shaped group around `primary`
    pub fn star<I, S>(primary: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            primary: Some(primary.into()),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Group whose members are all mutual siblings
    pub fn clique<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            primary: None,
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    fn siblings_of(&self, uri: &str) -> BTreeSet<String> {
        match &self.primary {
            Some(primary) if primary == uri => self
                .members
                .iter()
                .filter(|m| m.as_str() != uri)
                .cloned()
                .collect(),
            Some(primary) if self.members.contains(uri) => {
                BTreeSet::from([primary.clone()])
            }
            Some(_) => BTreeSet::new(),
            None if self.members.contains(uri) => self
                .members
                .iter()
                .filter(|m| m.as_str() != uri)
                .cloned()
                .collect(),
            None => BTreeSet::new(),
        }
    }
}

/// Static channel variant table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelVariants {
    groups: Vec<VariantGroup>,
}

impl ChannelVariants {
    pub fn new(groups: Vec<VariantGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[VariantGroup] {
        &self.groups
    }

    /// Sibling URIs of `uri` across every group, excluding `uri` itself
    pub fn siblings(&self, uri: &str) -> BTreeSet<String> {
        self.groups
            .iter()
            .flat_map(|group| group.siblings_of(uri))
            .collect()
    }

    /// `uri` plus all of its siblings
    pub fn expand(&self, uri: &str) -> BTreeSet<String> {
        let mut uris = self.siblings(uri);
        uris.insert(uri.to_string());
        uris
    }

    /// Same channel, or registered siblings in either direction
    pub fn same_or_variant(&self, a: &str, b: &str) -> bool {
        a == b || self.siblings(a).contains(b) || self.siblings(b).contains(a)
    }

    /// Built-in BBC regional and transmission-log groups
    pub fn bbc_defaults() -> Self {
        let barb_bbc_two_england = BARB_BBC_TWO_ENGLAND
            .iter()
            .map(|id| format!("{BARB_CHANNEL_PREFIX}{id}"));

        let bbc_one_txlogs = BBC_ONE_TXLOG_REGIONS
            .iter()
            .map(|region| format!("{BBC_SERVICE_PREFIX}bbcone/{region}"));

        let bbc_two_txlogs = BARB_BBC_TWO_ENGLAND
            .iter()
            .map(|id| format!("{BARB_CHANNEL_PREFIX}{id}"))
            .chain(
                BBC_TWO_TXLOG_REGIONS
                    .iter()
                    .map(|region| format!("{BBC_SERVICE_PREFIX}bbctwo/{region}")),
            );

        Self::new(vec![
            VariantGroup::star(
                format!("{BBC_SERVICE_PREFIX}bbctwo/england"),
                barb_bbc_two_england,
            ),
            VariantGroup::clique(bbc_one_txlogs),
            VariantGroup::clique(bbc_two_txlogs),
        ])
    }
}

// ============================================================================
// Channel sets
// ============================================================================

/// Data-driven channel membership table (sports channels, ignored regions)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelSet(BTreeSet<String>);

impl ChannelSet {
    pub fn new<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(uris.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.0.contains(uri)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Channels whose fixtures are re-titled per event
    pub fn sports_defaults() -> Self {
        let named = SPORTS_CHANNELS
            .iter()
            .map(|name| format!("{REF_CHANNEL_PREFIX}{name}"));
        let pa_channels = SPORTS_PA_CHANNEL_IDS
            .iter()
            .map(|id| format!("{REF_CHANNEL_PREFIX}pressassociation.com/{id}"));
        let pa_stations = SPORTS_PA_STATION_IDS
            .iter()
            .map(|id| format!("{REF_CHANNEL_PREFIX}pressassociation.com/stations/{id}"));
        Self::new(named.chain(pa_channels).chain(pa_stations))
    }

    /// BBC regional channels skipped unless they carry the subject's only broadcast
    pub fn bbc_regional_defaults() -> Self {
        let bbc_one = BBC_ONE_IGNORED_REGIONS
            .iter()
            .map(|region| format!("{BBC_SERVICE_PREFIX}bbcone/{region}"));
        let bbc_two = BBC_TWO_IGNORED_REGIONS
            .iter()
            .map(|region| format!("{BBC_SERVICE_PREFIX}bbctwo/{region}"));
        Self::new(
            bbc_one
                .chain(bbc_two)
                .chain(std::iter::once(format!("{BBC_SERVICE_PREFIX}radio4/lw"))),
        )
    }

    /// Channels whose transmission logs only carry reliable start times
    pub fn start_time_only_defaults() -> Self {
        Self::new([
            format!("{BBC_SERVICE_PREFIX}bbctwo/wales"),
            format!("{BBC_SERVICE_PREFIX}bbctwo/ni"),
        ])
    }
}

impl FromIterator<String> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

const BBC_SERVICE_PREFIX: &str = "http://www.bbc.co.uk/services/";
const BARB_CHANNEL_PREFIX: &str = "http://channels.barb.co.uk/channels/";
const REF_CHANNEL_PREFIX: &str = "http://ref.atlasapi.org/channels/";

const BARB_BBC_TWO_ENGLAND: &[u32] = &[
    1081, 1082, 1083, 1084, 1085, 1086, 1087, 1088, 1093, 1094, 1095,
];

const BBC_ONE_TXLOG_REGIONS: &[&str] = &[
    "east",
    "east_midlands",
    "east_yorkshire",
    "london",
    "ni",
    "north_east",
    "north_west",
    "scotland",
    "south",
    "south_east",
    "south_west",
    "wales",
    "west",
    "west_midlands",
];

const BBC_TWO_TXLOG_REGIONS: &[&str] = &["ni", "scotland", "wales"];

const BBC_ONE_IGNORED_REGIONS: &[&str] = &[
    "ni",
    "cambridge",
    "channel_islands",
    "east",
    "east_midlands",
    "hd",
    "north_east",
    "north_west",
    "oxford",
    "scotland",
    "south",
    "south_east",
    "wales",
    "south_west",
    "west",
    "west_midlands",
    "east_yorkshire",
    "yorkshire",
];

const BBC_TWO_IGNORED_REGIONS: &[&str] =
    &["ni", "ni_analogue", "scotland", "wales", "wales_analogue"];

const SPORTS_CHANNELS: &[&str] = &[
    "attheraces",
    "chelseatv",
    "espn",
    "espnhd",
    "eurosport",
    "eurosport2",
    "eurosporthd",
    "extremesports",
    "liverpoolfctv",
    "motorstv",
    "mutv",
    "racinguk",
    "setantaireland",
    "setantasports1ireland",
    "skysports1",
    "skysports1hd",
    "skysports2",
    "skysports2hd",
    "skysports3",
    "skysports3hd",
    "skysports4",
    "skysports4hd",
    "skysportsf1",
    "skysportsnews",
    "skysportsnewshd",
    "theactivechannel",
];

const SPORTS_PA_CHANNEL_IDS: &[u32] = &[
    1638, 1671, 1676, 1677, 1678, 1679, 1745, 1804, 1805, 1806, 1807, 1889, 1890, 1896, 1898,
    1899, 1928, 1938, 1939, 1941, 1951, 1952, 1953, 1954, 1955, 1956, 1957, 1958, 1959, 1960,
    1961, 1962, 1963, 1964, 1965, 1966, 1967, 1968, 1970, 1971, 1984, 1992, 2011, 2015, 2020,
    2021,
];

const SPORTS_PA_STATION_IDS: &[u32] = &[
    150, 152, 195, 635, 637, 652, 798, 877, 936, 944, 955, 1045, 1046, 1104, 1110, 1139, 1150,
    1152, 1153, 1154, 1155, 1156, 1157, 1158,
];

#[cfg(test)]
mod tests {
    use super::*;

    const ENGLAND: &str = "http://www.bbc.co.uk/services/bbctwo/england";
    const BARB_1081: &str = "http://channels.barb.co.uk/channels/1081";
    const BARB_1082: &str = "http://channels.barb.co.uk/channels/1082";
    const BBC_ONE_LONDON: &str = "http://www.bbc.co.uk/services/bbcone/london";
    const BBC_ONE_WALES: &str = "http://www.bbc.co.uk/services/bbcone/wales";

    #[test]
    fn test_star_primary_has_all_members_as_siblings() {
        let variants = ChannelVariants::bbc_defaults();
        let siblings = variants.siblings(ENGLAND);
        assert_eq!(siblings.len(), 11);
        assert!(siblings.contains(BARB_1081));
        assert!(!siblings.contains(ENGLAND));
    }

    #[test]
    fn test_star_member_sees_primary_and_txlog_clique() {
        let variants = ChannelVariants::bbc_defaults();
        let siblings = variants.siblings(BARB_1081);

        // Primary from the star, other BBC Two txlog ids from the clique
        assert!(siblings.contains(ENGLAND));
        assert!(siblings.contains(BARB_1082));
        assert!(siblings.contains("http://www.bbc.co.uk/services/bbctwo/wales"));
        assert!(!siblings.contains(BARB_1081));
    }

    #[test]
    fn test_clique_members_are_mutual_siblings() {
        let variants = ChannelVariants::bbc_defaults();
        assert!(variants.siblings(BBC_ONE_LONDON).contains(BBC_ONE_WALES));
        assert!(variants.siblings(BBC_ONE_WALES).contains(BBC_ONE_LONDON));
        assert!(variants.same_or_variant(BBC_ONE_LONDON, BBC_ONE_WALES));
    }

    #[test]
    fn test_unknown_channel_expands_to_itself() {
        let variants = ChannelVariants::bbc_defaults();
        let expanded = variants.expand("http://example.com/channel");
        assert_eq!(expanded.len(), 1);
        assert!(variants.siblings("http://example.com/channel").is_empty());
        assert!(!variants.same_or_variant(BBC_ONE_LONDON, ENGLAND));
    }

    #[test]
    fn test_default_channel_sets() {
        let sports = ChannelSet::sports_defaults();
        assert!(sports.contains("http://ref.atlasapi.org/channels/skysports1"));
        assert!(sports.contains("http://ref.atlasapi.org/channels/pressassociation.com/1970"));
        assert!(
            sports.contains("http://ref.atlasapi.org/channels/pressassociation.com/stations/955")
        );
        assert!(!sports.contains("http://ref.atlasapi.org/channels/bbcone"));

        let ignored = ChannelSet::bbc_regional_defaults();
        assert!(ignored.contains("http://www.bbc.co.uk/services/bbcone/east_yorkshire"));
        assert!(ignored.contains("http://www.bbc.co.uk/services/radio4/lw"));
        assert!(!ignored.contains("http://www.bbc.co.uk/services/bbcone/london"));
    }
}
