//! Tiered broadcaster classification
//!
//! Tier one covers the major terrestrial broadcasters whose schedules are
//! trusted; everything else is tier two. Classification is a pure lookup over
//! static tables: the content's publisher, then any broadcaster-group id
//! carried in its custom fields.

use crate::config::TierConfig;
use crate::model::{Content, Publisher};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use tracing::warn;

pub const TXLOG_BROADCASTER_GROUP: &str = "txlog:broadcaster_group";
pub const NLE_BROADCASTER_GROUP: &str = "nle:broadcaster_group";
pub const CDMF_BROADCASTER_GROUP: &str = "cdmf:broadcaster_group";

/// Broadcaster trust tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    One,
    Two,
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.trim().to_ascii_lowercase().as_str() {
            "tier-one" | "tier_one" | "t1" | "1" => Ok(Tier::One),
            "tier-two" | "tier_two" | "t2" | "2" => Ok(Tier::Two),
            other => Err(format!("unknown tier label '{other}'")),
        }
    }
}

/// Classifies content into a [`Tier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieredBroadcaster {
    tier_one_publishers: BTreeSet<Publisher>,
    tier_one_groups: BTreeSet<String>,
    group_fields: Vec<String>,
}

impl Default for TieredBroadcaster {
    fn default() -> Self {
        Self {
            tier_one_publishers: [
                Publisher::BBC_NITRO,
                Publisher::ITV,
                Publisher::C4,
                Publisher::C5,
                Publisher::UKTV,
            ]
            .into_iter()
            .map(Publisher::from)
            .collect(),
            // BBC, ITV, Channel 4, Channel 5, UKTV. Sky ("5") is tier two.
            tier_one_groups: ["1", "2", "3", "4", "63"]
                .into_iter()
                .map(String::from)
                .collect(),
            group_fields: default_group_fields(),
        }
    }
}

pub(crate) fn default_group_fields() -> Vec<String> {
    vec![
        TXLOG_BROADCASTER_GROUP.to_string(),
        NLE_BROADCASTER_GROUP.to_string(),
        CDMF_BROADCASTER_GROUP.to_string(),
    ]
}

impl TieredBroadcaster {
    pub fn new(
        tier_one_publishers: BTreeSet<Publisher>,
        tier_one_groups: BTreeSet<String>,
        group_fields: Vec<String>,
    ) -> Self {
        Self {
            tier_one_publishers,
            tier_one_groups,
            group_fields,
        }
    }

    /// Build from configuration, falling back to defaults for omitted tables
    ///
    /// An entry whose label is not a known tier is logged and skipped; the
    /// rest of the table still applies.
    pub fn from_config(config: &TierConfig) -> Self {
        let defaults = Self::default();

        let tier_one_publishers = match &config.publishers {
            Some(table) => tier_one_keys(table, "publisher")
                .into_iter()
                .map(Publisher::new)
                .collect(),
            None => defaults.tier_one_publishers,
        };

        let tier_one_groups = match &config.broadcaster_groups {
            Some(table) => tier_one_keys(table, "broadcaster group"),
            None => defaults.tier_one_groups,
        };

        let group_fields = config
            .group_fields
            .clone()
            .unwrap_or(defaults.group_fields);

        Self::new(tier_one_publishers, tier_one_groups, group_fields)
    }

    /// Tier of a content item
    pub fn classify(&self, content: &Content) -> Tier {
        if self.tier_one_publishers.contains(&content.publisher) {
            return Tier::One;
        }

        let tier_one_group = self
            .group_fields
            .iter()
            .filter_map(|field| content.custom_fields.get(field))
            .any(|group| self.tier_one_groups.contains(group.trim()));

        if tier_one_group {
            Tier::One
        } else {
            Tier::Two
        }
    }

    pub fn is_tier_one(&self, content: &Content) -> bool {
        self.classify(content) == Tier::One
    }
}

fn tier_one_keys(table: &BTreeMap<String, String>, kind: &str) -> BTreeSet<String> {
    table
        .iter()
        .filter_map(|(key, label)| match label.parse::<Tier>() {
            Ok(Tier::One) => Some(key.clone()),
            Ok(Tier::Two) => None,
            Err(e) => {
                warn!(%key, error = %e, "Skipping {kind} tier entry");
                None
            }
        })
        .collect()
}
