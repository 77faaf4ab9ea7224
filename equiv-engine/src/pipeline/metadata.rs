//! Read-only description of assembled pipelines
//!
//! Captured when a pipeline is constructed, so operational tooling can ask
//! what a publisher's pipeline does without running it.

use equiv_common::{Error, Publisher, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identity of one configured generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorMetadata {
    Basic {
        component: String,
    },
    /// Generator that only queries the listed publishers
    SourceLimited {
        component: String,
        publishers: BTreeSet<Publisher>,
    },
}

impl GeneratorMetadata {
    pub fn basic(component: impl Into<String>) -> Self {
        GeneratorMetadata::Basic {
            component: component.into(),
        }
    }

    pub fn source_limited(component: impl Into<String>, publishers: BTreeSet<Publisher>) -> Self {
        GeneratorMetadata::SourceLimited {
            component: component.into(),
            publishers,
        }
    }

    pub fn component(&self) -> &str {
        match self {
            GeneratorMetadata::Basic { component }
            | GeneratorMetadata::SourceLimited { component, .. } => component,
        }
    }
}

/// Snapshot of every component in one [`Pipeline`](super::Pipeline)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub generators: Vec<GeneratorMetadata>,
    pub scorers: Vec<String>,
    pub combiner: String,
    pub filter: String,
    pub extractors: Vec<String>,
    pub excluded_uris: BTreeSet<String>,
    pub excluded_ids: BTreeSet<u64>,
}

impl PipelineMetadata {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("Failed to serialise pipeline metadata: {e}")))
    }
}

/// Metadata for any [`EquivalenceResultProvider`](super::EquivalenceResultProvider)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdaterMetadata {
    Pipeline(PipelineMetadata),
    FirstMatchingPredicate {
        predicate: String,
        pipelines: Vec<UpdaterMetadata>,
    },
    SourceSpecific {
        top_level_container: Box<UpdaterMetadata>,
        non_top_level_container: Box<UpdaterMetadata>,
        item: Box<UpdaterMetadata>,
    },
}

impl UpdaterMetadata {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("Failed to serialise updater metadata: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_metadata_json_shape() {
        let metadata = GeneratorMetadata::source_limited(
            "Broadcast",
            [Publisher::from(Publisher::PA)].into_iter().collect(),
        );
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["type"], "source_limited");
        assert_eq!(json["component"], "Broadcast");
        assert_eq!(json["publishers"][0], "pressassociation.com");
        assert_eq!(metadata.component(), "Broadcast");
    }
}
