//! # Broadcast Equivalence Engine
//!
//! Decides which records from different publishers describe the same
//! programme or the same transmission of it:
//! - Generators discover candidates from schedules (broadcast windows,
//!   as-aired times, regional siblings)
//! - Scorers grade candidates on titles
//! - Combiners, filters and extractors turn scores into strong equivalents
//! - Pipelines, composites and the updater tie the stages together
//!
//! Stores for schedules, channels and content are supplied by the caller
//! through the traits in [`resolvers`].

pub mod cache;
pub mod combiner;
pub mod extractor;
pub mod filter;
pub mod generators;
pub mod pipeline;
pub mod resolvers;
pub mod scorers;
pub mod title;

pub use equiv_common;

pub use cache::ContainerTitleCache;
pub use generators::EquivalenceGenerator;
pub use pipeline::{
    EquivalenceResult, EquivalenceResultHandler, EquivalenceResultProvider, EquivalenceUpdater,
    Pipeline, PipelineConfig, PipelineRegistry,
};
pub use resolvers::{ChannelResolver, ContentResolver, InMemoryStore, ScheduleResolver};
pub use scorers::EquivalenceScorer;
