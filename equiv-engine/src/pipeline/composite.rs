//! Providers built from other providers, and the updater that drives them

use super::{EquivalenceResult, EquivalenceResultProvider, UpdaterMetadata};
use equiv_common::{Content, Error, Identified, Publisher, Result, ResultReporter};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Dispatches on the subject's kind
///
/// Brands and top-level series, contained series, and items are each
/// evaluated by their own provider.
pub struct SourceSpecificPipelines {
    top_level_container: Arc<dyn EquivalenceResultProvider<Content>>,
    non_top_level_container: Arc<dyn EquivalenceResultProvider<Content>>,
    item: Arc<dyn EquivalenceResultProvider<Content>>,
}

impl SourceSpecificPipelines {
    pub fn new(
        top_level_container: Arc<dyn EquivalenceResultProvider<Content>>,
        non_top_level_container: Arc<dyn EquivalenceResultProvider<Content>>,
        item: Arc<dyn EquivalenceResultProvider<Content>>,
    ) -> Self {
        Self {
            top_level_container,
            non_top_level_container,
            item,
        }
    }

    fn provider_for(&self, subject: &Content) -> &Arc<dyn EquivalenceResultProvider<Content>> {
        if subject.is_top_level_container() {
            &self.top_level_container
        } else if subject.kind.is_container() {
            &self.non_top_level_container
        } else {
            &self.item
        }
    }
}

impl EquivalenceResultProvider<Content> for SourceSpecificPipelines {
    fn provide(
        &self,
        subject: &Content,
        reporter: &Arc<dyn ResultReporter>,
    ) -> Result<EquivalenceResult<Content>> {
        self.provider_for(subject).provide(subject, reporter)
    }

    fn metadata(&self) -> UpdaterMetadata {
        UpdaterMetadata::SourceSpecific {
            top_level_container: Box::new(self.top_level_container.metadata()),
            non_top_level_container: Box::new(self.non_top_level_container.metadata()),
            item: Box::new(self.item.metadata()),
        }
    }
}

pub type ResultPredicate<T> = Arc<dyn Fn(&EquivalenceResult<T>) -> bool + Send + Sync>;

/// Tries providers in order until one's result satisfies the predicate
///
/// When none does, the last provider's result is returned.
pub struct FirstMatchingPredicatePipeline<T> {
    description: String,
    predicate: ResultPredicate<T>,
    pipelines: Vec<Arc<dyn EquivalenceResultProvider<T>>>,
}

impl<T> FirstMatchingPredicatePipeline<T> {
    pub fn new(
        description: impl Into<String>,
        predicate: ResultPredicate<T>,
        pipelines: Vec<Arc<dyn EquivalenceResultProvider<T>>>,
    ) -> Result<Self> {
        if pipelines.is_empty() {
            return Err(Error::MissingField("pipelines"));
        }
        Ok(Self {
            description: description.into(),
            predicate,
            pipelines,
        })
    }
}

impl<T: Identified + Send + Sync> FirstMatchingPredicatePipeline<T> {
    /// Predicate satisfied by any strong equivalent
    pub fn has_strong_equivalents() -> ResultPredicate<T> {
        Arc::new(|result: &EquivalenceResult<T>| result.has_strong_equivalents())
    }
}

impl<T> EquivalenceResultProvider<T> for FirstMatchingPredicatePipeline<T>
where
    T: Identified + Send + Sync,
{
    fn provide(
        &self,
        subject: &T,
        reporter: &Arc<dyn ResultReporter>,
    ) -> Result<EquivalenceResult<T>> {
        let mut last = None;
        for (index, pipeline) in self.pipelines.iter().enumerate() {
            let result = pipeline.provide(subject, reporter)?;
            if (self.predicate)(&result) {
                info!(
                    subject = subject.canonical_uri(),
                    pipeline = index,
                    "Pipeline result accepted"
                );
                return Ok(result);
            }
            last = Some(result);
        }
        last.ok_or(Error::IllegalState("no pipelines to evaluate".to_string()))
    }

    fn metadata(&self) -> UpdaterMetadata {
        UpdaterMetadata::FirstMatchingPredicate {
            predicate: self.description.clone(),
            pipelines: self.pipelines.iter().map(|p| p.metadata()).collect(),
        }
    }
}

/// Result provider per subject publisher
pub struct PipelineRegistry<T> {
    providers: BTreeMap<Publisher, Arc<dyn EquivalenceResultProvider<T>>>,
}

impl<T> Default for PipelineRegistry<T> {
    fn default() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }
}

impl<T> PipelineRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        publisher: Publisher,
        provider: Arc<dyn EquivalenceResultProvider<T>>,
    ) -> Self {
        if self.providers.insert(publisher.clone(), provider).is_some() {
            warn!(publisher = %publisher, "Replaced registered pipeline");
        }
        self
    }

    pub fn publishers(&self) -> impl Iterator<Item = &Publisher> {
        self.providers.keys()
    }

    pub fn provider_for(
        &self,
        publisher: &Publisher,
    ) -> Result<Arc<dyn EquivalenceResultProvider<T>>> {
        self.providers.get(publisher).cloned().ok_or_else(|| {
            Error::IllegalState(format!("no equivalence pipeline registered for {publisher}"))
        })
    }

    /// Metadata for every registered publisher
    pub fn metadata(&self) -> BTreeMap<Publisher, UpdaterMetadata> {
        self.providers
            .iter()
            .map(|(publisher, provider)| (publisher.clone(), provider.metadata()))
            .collect()
    }
}

/// Receives evaluated results, typically to persist them
pub trait EquivalenceResultHandler<T>: Send + Sync {
    fn handle(&self, result: &EquivalenceResult<T>) -> Result<()>;
}

/// Routes subjects to their publisher's provider and hands results on
pub struct EquivalenceUpdater<T> {
    registry: PipelineRegistry<T>,
    handler: Arc<dyn EquivalenceResultHandler<T>>,
    reporter: Arc<dyn ResultReporter>,
}

impl<T: Identified + Send + Sync + 'static> EquivalenceUpdater<T> {
    pub fn new(
        registry: PipelineRegistry<T>,
        handler: Arc<dyn EquivalenceResultHandler<T>>,
        reporter: Arc<dyn ResultReporter>,
    ) -> Self {
        Self {
            registry,
            handler,
            reporter,
        }
    }

    pub fn registry(&self) -> &PipelineRegistry<T> {
        &self.registry
    }

    /// Evaluate one subject with its publisher's pipeline
    pub fn update(&self, subject: &T) -> Result<EquivalenceResult<T>> {
        let provider = self.registry.provider_for(subject.publisher())?;
        let result = provider.provide(subject, &self.reporter)?;
        self.handler.handle(&result)?;
        Ok(result)
    }

    /// Evaluate subjects concurrently on the blocking pool
    ///
    /// Results come back in input order, each paired with its subject URI.
    pub async fn update_all(
        self: &Arc<Self>,
        subjects: Vec<Arc<T>>,
    ) -> Vec<(String, Result<EquivalenceResult<T>>)> {
        let uris: Vec<String> = subjects
            .iter()
            .map(|s| s.canonical_uri().to_string())
            .collect();

        let mut tasks = JoinSet::new();
        for (index, subject) in subjects.into_iter().enumerate() {
            let updater = Arc::clone(self);
            tasks.spawn_blocking(move || (index, updater.update(&subject)));
        }

        let mut slots: Vec<Option<Result<EquivalenceResult<T>>>> =
            uris.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Err(e) = &result {
                        warn!(subject = %uris[index], error = %e, "Equivalence update failed");
                    }
                    slots[index] = Some(result);
                }
                Err(e) => error!(error = %e, "Equivalence task did not complete"),
            }
        }

        info!(subjects = uris.len(), "Batch equivalence update finished");
        uris.into_iter()
            .zip(slots)
            .map(|(uri, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(Error::Internal(format!("evaluation of {uri} did not complete")))
                });
                (uri, result)
            })
            .collect()
    }
}
