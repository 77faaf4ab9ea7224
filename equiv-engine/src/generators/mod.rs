//! Candidate generators
//!
//! A generator discovers candidates by querying a collaborator and scores
//! them from a single signal. Generators within one pipeline are independent
//! of each other.

mod actual_transmission;
mod broadcast;
mod regional_txlog;

pub use actual_transmission::{ActualTransmissionBuilder, ActualTransmissionGenerator};
pub use broadcast::{
    BroadcastFilter, BroadcastMatchingBuilder, BroadcastMatchingGenerator, MatchContext, RatioAbove,
    RatioThreshold, TierLenient,
};
pub use regional_txlog::RegionalTxlogGenerator;

use crate::pipeline::GeneratorMetadata;
use chrono::{DateTime, Duration, Utc};
use equiv_common::{Broadcast, Content, Error, Result, RunReporter, ScoredCandidates};

/// Discovers and scores candidates for a subject
pub trait EquivalenceGenerator<T = Content>: Send + Sync {
    /// Stable component name used for reporting and metadata
    fn name(&self) -> &'static str;

    fn generate(&self, subject: &T, report: &RunReporter) -> Result<ScoredCandidates<T>>;

    fn metadata(&self) -> GeneratorMetadata {
        GeneratorMetadata::basic(self.name())
    }
}

/// `time` lies in `[reference - flexibility, reference + flexibility]`
///
/// A bound past the representable range leaves that side open.
pub(crate) fn within(time: DateTime<Utc>, reference: DateTime<Utc>, flexibility: Duration) -> bool {
    let after_lower = reference
        .checked_sub_signed(flexibility)
        .map_or(true, |lower| time >= lower);
    let before_upper = reference
        .checked_add_signed(flexibility)
        .map_or(true, |upper| time <= upper);
    after_lower && before_upper
}

/// `[start - before, end + after]` as a schedule query window
pub(crate) fn widen(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    before: Duration,
    after: Duration,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    match (start.checked_sub_signed(before), end.checked_add_signed(after)) {
        (Some(from), Some(to)) => Ok((from, to)),
        _ => Err(Error::InvalidInput(format!(
            "query window around {start}..{end} is out of range"
        ))),
    }
}

/// Filter keeping broadcasts that start before `now + horizon`
pub(crate) fn starts_within(
    horizon: Duration,
) -> impl Fn(&Broadcast) -> bool + Send + Sync + 'static {
    move |b: &Broadcast| {
        Utc::now()
            .checked_add_signed(horizon)
            .map_or(true, |limit| b.transmission_start < limit)
    }
}
