//! Equivalence scorers
//!
//! A scorer never discovers candidates. It receives the union of candidates
//! the generators found and scores each independently of the other scorers.

mod subset;
mod title_matching;
mod txlog_title;

pub use subset::{
    AcronymTitles, BroadcastTitleScorer, EditDistanceSubsetTitles, PunctuationInsensitiveTitles,
    SubsetTitles, TitleComparator, TitleComparison,
};
pub use title_matching::TitleMatchingScorer;
pub use txlog_title::TxlogTitleScorer;

use equiv_common::{Content, Result, RunReporter, ScoredCandidates};
use std::sync::Arc;

/// Scores externally supplied candidates against a subject
pub trait EquivalenceScorer<T = Content>: Send + Sync {
    /// Stable component name used for reporting and metadata
    fn name(&self) -> &'static str;

    fn score(
        &self,
        subject: &T,
        candidates: &[Arc<T>],
        report: &RunReporter,
    ) -> Result<ScoredCandidates<T>>;
}
