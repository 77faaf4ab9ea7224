//! # Equivalence Common Library
//!
//! Shared code for the broadcast equivalence engine including:
//! - Content, broadcast and channel models
//! - Scores and scored candidate sets
//! - Channel variant topology and sports/regional channel tables
//! - Tiered broadcaster classification
//! - Per-stage result reporting
//! - Configuration loading and logging initialisation

pub mod channel;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod reporter;
pub mod score;
pub mod tier;

pub use channel::{Channel, ChannelSet, ChannelVariants, MediaType, VariantGroup};
pub use error::{Error, Result};
pub use model::{Broadcast, Content, ContentKind, Identified, Publisher};
pub use reporter::{ResultReporter, RunReporter, Stage};
pub use score::{Score, ScoreThreshold, ScoredCandidate, ScoredCandidates};
pub use tier::{Tier, TieredBroadcaster};
