//! Per-stage result reporting
//!
//! Every pipeline stage hands the reporter its component name and a
//! `content identifier -> stringified result` map. Reporting is purely
//! additive: the engine never reads back what it reported.

use crate::model::Identified;
use crate::score::ScoredCandidates;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Pipeline stage that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Generator,
    Scorer,
    Combiner,
    Filter,
    Extractor,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Generator => "generator",
            Stage::Scorer => "scorer",
            Stage::Combiner => "combiner",
            Stage::Filter => "filter",
            Stage::Extractor => "extractor",
        };
        f.write_str(name)
    }
}

/// One component's output for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub subject: String,
    pub stage: Stage,
    pub component: String,
    pub results: BTreeMap<String, String>,
}

/// Sink for per-stage results
///
/// Implementations must accept concurrent calls from parallel evaluations.
pub trait ResultReporter: Send + Sync {
    fn report(&self, result: ComponentResult);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ResultReporter for NoopReporter {
    fn report(&self, _result: ComponentResult) {}
}

/// Emits each result as a `debug!` event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ResultReporter for TracingReporter {
    fn report(&self, result: ComponentResult) {
        debug!(
            subject = %result.subject,
            stage = %result.stage,
            component = %result.component,
            candidates = result.results.len(),
            results = ?result.results,
            "Equivalence stage result"
        );
    }
}

/// Append-only, per-component buckets held in memory
#[derive(Debug, Default)]
pub struct InMemoryReporter {
    buckets: DashMap<String, Vec<ComponentResult>>,
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported under `component`, in arrival order
    pub fn results_for(&self, component: &str) -> Vec<ComponentResult> {
        self.buckets
            .get(component)
            .map(|bucket| bucket.clone())
            .unwrap_or_default()
    }

    /// Snapshot of everything reported for one subject, across components
    pub fn results_for_subject(&self, subject: &str) -> Vec<ComponentResult> {
        self.buckets
            .iter()
            .flat_map(|bucket| {
                bucket
                    .value()
                    .iter()
                    .filter(|r| r.subject == subject)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn components(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buckets.iter().map(|b| b.key().clone()).collect();
        names.sort();
        names
    }

    /// Total number of results across all buckets
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultReporter for InMemoryReporter {
    fn report(&self, result: ComponentResult) {
        self.buckets
            .entry(result.component.clone())
            .or_default()
            .push(result);
    }
}

/// Reporter bound to one subject for the duration of one evaluation
#[derive(Clone)]
pub struct RunReporter {
    subject: String,
    sink: Arc<dyn ResultReporter>,
}

impl RunReporter {
    pub fn new(subject: impl Into<String>, sink: Arc<dyn ResultReporter>) -> Self {
        Self {
            subject: subject.into(),
            sink,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn record(&self, stage: Stage, component: &str, results: BTreeMap<String, String>) {
        self.sink.report(ComponentResult {
            subject: self.subject.clone(),
            stage,
            component: component.to_string(),
            results,
        });
    }

    /// Record a scored candidate set under its own source name
    pub fn record_scores<T: Identified>(&self, stage: Stage, scores: &ScoredCandidates<T>) {
        self.record(stage, scores.source(), scores.to_report());
    }
}

impl fmt::Debug for RunReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunReporter")
            .field("subject", &self.subject)
            .finish()
    }
}
