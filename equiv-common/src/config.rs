//! Engine configuration loading and path resolution
//!
//! The engine is configured from a single TOML file. Every section is
//! optional; omitted values fall back to built-in defaults, and omitted
//! tables (variant groups, tiers, sports channels) fall back to the built-in
//! broadcast-domain tables.
//!
//! # Config Path Priority
//!
//! 1. Command-line argument
//! 2. Environment variable
//! 3. User config directory (`~/.config/equiv-engine/engine.toml` on Linux)
//! 4. System default (`/etc/equiv-engine/engine.toml`)

use crate::channel::{ChannelSet, ChannelVariants, VariantGroup};
use crate::tier::TieredBroadcaster;
use crate::{Error, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_DIR_NAME: &str = "equiv-engine";
const CONFIG_FILE_NAME: &str = "engine.toml";

/// Longest duration any `*_secs` setting may hold (one year)
pub const MAX_DURATION_SECS: u64 = 366 * 24 * 60 * 60;

/// Longest broadcast horizon, in days
pub const MAX_HORIZON_DAYS: u32 = 366;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub broadcast: BroadcastMatchingConfig,

    #[serde(default)]
    pub actual_transmission: ActualTransmissionConfig,

    #[serde(default)]
    pub regional: RegionalConfig,

    #[serde(default)]
    pub title: TitleConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub tiers: TierConfig,

    /// Channel variant groups; built-in BBC groups when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_variants: Option<Vec<VariantGroupConfig>>,

    /// Sports channel URIs; built-in list when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sports_channels: Option<Vec<String>>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Broadcast-window matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMatchingConfig {
    #[serde(default = "default_broadcast_flexibility_secs")]
    pub flexibility_secs: u64,

    /// Tighter flexibility for short-form broadcasts
    #[serde(default = "default_short_broadcast_flexibility_secs")]
    pub short_broadcast_flexibility_secs: u64,

    /// Broadcasts shorter than this use the short-broadcast flexibility
    #[serde(default = "default_short_broadcast_max_duration_secs")]
    pub short_broadcast_max_duration_secs: u64,

    /// End-time flexibility for the extended match; disabled when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_end_flexibility_secs: Option<u64>,

    /// Broadcasts starting further ahead than this are not processed
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
}

impl Default for BroadcastMatchingConfig {
    fn default() -> Self {
        Self {
            flexibility_secs: default_broadcast_flexibility_secs(),
            short_broadcast_flexibility_secs: default_short_broadcast_flexibility_secs(),
            short_broadcast_max_duration_secs: default_short_broadcast_max_duration_secs(),
            extended_end_flexibility_secs: None,
            horizon_days: default_horizon_days(),
        }
    }
}

impl BroadcastMatchingConfig {
    pub fn flexibility(&self) -> Duration {
        seconds(self.flexibility_secs)
    }

    pub fn short_broadcast_flexibility(&self) -> Duration {
        seconds(self.short_broadcast_flexibility_secs)
    }

    pub fn short_broadcast_max_duration(&self) -> Duration {
        seconds(self.short_broadcast_max_duration_secs)
    }

    pub fn extended_end_flexibility(&self) -> Option<Duration> {
        self.extended_end_flexibility_secs.map(seconds)
    }

    pub fn horizon(&self) -> Duration {
        Duration::days(i64::from(self.horizon_days.min(MAX_HORIZON_DAYS)))
    }
}

/// Actual-transmission-time matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualTransmissionConfig {
    #[serde(default = "default_actual_flexibility_secs")]
    pub flexibility_secs: u64,

    /// How far around the subject's scheduled slot to search
    #[serde(default = "default_schedule_window_secs")]
    pub schedule_window_secs: u64,
}

impl Default for ActualTransmissionConfig {
    fn default() -> Self {
        Self {
            flexibility_secs: default_actual_flexibility_secs(),
            schedule_window_secs: default_schedule_window_secs(),
        }
    }
}

impl ActualTransmissionConfig {
    pub fn flexibility(&self) -> Duration {
        seconds(self.flexibility_secs)
    }

    pub fn schedule_window(&self) -> Duration {
        seconds(self.schedule_window_secs)
    }
}

/// Regional/transmission-log variant matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalConfig {
    #[serde(default = "default_regional_flexibility_secs")]
    pub flexibility_secs: u64,
}

impl Default for RegionalConfig {
    fn default() -> Self {
        Self {
            flexibility_secs: default_regional_flexibility_secs(),
        }
    }
}

impl RegionalConfig {
    pub fn flexibility(&self) -> Duration {
        seconds(self.flexibility_secs)
    }
}

/// Title scorers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleConfig {
    /// Subset/edit-distance confidence threshold, 0..=100
    #[serde(default = "default_subset_threshold_percent")]
    pub subset_threshold_percent: u8,

    /// Score partial matches on the text before a colon
    #[serde(default)]
    pub partial_colon_match: bool,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            subset_threshold_percent: default_subset_threshold_percent(),
            partial_colon_match: false,
        }
    }
}

/// Container-title cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live in seconds; 0 disables caching
    #[serde(default = "default_cache_ttl_secs")]
    pub container_title_ttl_secs: u64,

    /// Most containers held at once
    #[serde(default = "default_cache_max_entries")]
    pub container_title_max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            container_title_ttl_secs: default_cache_ttl_secs(),
            container_title_max_entries: default_cache_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.container_title_ttl_secs)
    }
}

/// Tier tables; omitted tables use built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Publisher key -> tier label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publishers: Option<BTreeMap<String, String>>,

    /// Broadcaster group id -> tier label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcaster_groups: Option<BTreeMap<String, String>>,

    /// Custom fields carrying a broadcaster group id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_fields: Option<Vec<String>>,
}

/// One `[[channel_variants]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantGroupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    pub members: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_broadcast_flexibility_secs() -> u64 {
    300
}

fn default_short_broadcast_flexibility_secs() -> u64 {
    120
}

fn default_short_broadcast_max_duration_secs() -> u64 {
    600
}

fn default_horizon_days() -> u32 {
    8
}

fn default_actual_flexibility_secs() -> u64 {
    1
}

fn default_schedule_window_secs() -> u64 {
    3600
}

fn default_regional_flexibility_secs() -> u64 {
    10
}

fn default_subset_threshold_percent() -> u8 {
    80
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_cache_max_entries() -> usize {
    10_000
}

/// Out-of-range values saturate at [`MAX_DURATION_SECS`]; `validate` rejects them
fn seconds(secs: u64) -> Duration {
    i64::try_from(secs.min(MAX_DURATION_SECS))
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or_else(|| Duration::seconds(MAX_DURATION_SECS as i64))
}

fn check_duration(field: &str, secs: u64) -> Result<()> {
    if secs > MAX_DURATION_SECS {
        return Err(Error::Config(format!(
            "{field} must be at most {MAX_DURATION_SECS} seconds, got {secs}"
        )));
    }
    Ok(())
}

impl EngineConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded engine configuration");
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    ///
    /// A file that exists but fails to parse or validate is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                path = %path.display(),
                "Config file not found, using built-in defaults"
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.title.subset_threshold_percent > 100 {
            return Err(Error::Config(format!(
                "title.subset_threshold_percent must be within 0..=100, got {}",
                self.title.subset_threshold_percent
            )));
        }
        let durations = [
            ("broadcast.flexibility_secs", Some(self.broadcast.flexibility_secs)),
            (
                "broadcast.short_broadcast_flexibility_secs",
                Some(self.broadcast.short_broadcast_flexibility_secs),
            ),
            (
                "broadcast.short_broadcast_max_duration_secs",
                Some(self.broadcast.short_broadcast_max_duration_secs),
            ),
            (
                "broadcast.extended_end_flexibility_secs",
                self.broadcast.extended_end_flexibility_secs,
            ),
            (
                "actual_transmission.flexibility_secs",
                Some(self.actual_transmission.flexibility_secs),
            ),
            (
                "actual_transmission.schedule_window_secs",
                Some(self.actual_transmission.schedule_window_secs),
            ),
            ("regional.flexibility_secs", Some(self.regional.flexibility_secs)),
            ("cache.container_title_ttl_secs", Some(self.cache.container_title_ttl_secs)),
        ];
        for (field, secs) in durations {
            if let Some(secs) = secs {
                check_duration(field, secs)?;
            }
        }
        if self.cache.container_title_max_entries == 0 {
            return Err(Error::Config(
                "cache.container_title_max_entries must be at least 1".to_string(),
            ));
        }
        if self.broadcast.horizon_days > MAX_HORIZON_DAYS {
            return Err(Error::Config(format!(
                "broadcast.horizon_days must be at most {MAX_HORIZON_DAYS}, got {}",
                self.broadcast.horizon_days
            )));
        }
        if self.broadcast.short_broadcast_flexibility_secs > self.broadcast.flexibility_secs {
            return Err(Error::Config(
                "broadcast.short_broadcast_flexibility_secs must not exceed flexibility_secs"
                    .to_string(),
            ));
        }
        if let Some(groups) = &self.channel_variants {
            for (index, group) in groups.iter().enumerate() {
                if group.members.is_empty() {
                    return Err(Error::Config(format!(
                        "channel_variants[{index}] has no members"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Variant table from config, or the built-in BBC groups
    pub fn channel_variants(&self) -> ChannelVariants {
        match &self.channel_variants {
            Some(groups) => ChannelVariants::new(
                groups
                    .iter()
                    .map(|g| VariantGroup {
                        primary: g.primary.clone(),
                        members: g.members.iter().cloned().collect::<BTreeSet<_>>(),
                    })
                    .collect(),
            ),
            None => ChannelVariants::bbc_defaults(),
        }
    }

    /// Sports channel set from config, or the built-in list
    pub fn sports_channels(&self) -> ChannelSet {
        match &self.sports_channels {
            Some(uris) => ChannelSet::new(uris.iter().cloned()),
            None => ChannelSet::sports_defaults(),
        }
    }

    pub fn tiers(&self) -> TieredBroadcaster {
        TieredBroadcaster::from_config(&self.tiers)
    }
}

/// Write configuration to a TOML file, creating parent directories
pub fn write_toml_config(config: &EngineConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    info!(path = %path.display(), "Wrote engine configuration");
    Ok(())
}

/// Resolve the config file path following the documented priority order
pub fn resolve_config_path(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: User config directory, if a file is there
    if let Some(user_config) =
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    {
        if user_config.exists() {
            return user_config;
        }
    }

    // Priority 4: System default
    PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}
