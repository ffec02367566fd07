//! The generation pipeline.
//!
//! Stages run strictly in order for one project:
//!
//! ```text
//! parse -> persist -> uml -> render -> matrix
//! ```
//!
//! Each stage runs on tokio's blocking pool. A stage announces itself with
//! `progress 0`, persists its artifact, then takes its stream out of the
//! [`ProgressCache`] and sends `complete` (or `error`) on it. A failed stage
//! stops the run; streams registered for later stages are dropped so their
//! subscribers see end-of-stream.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use tuguml_core::lightweight::LightWeightModel;
use tuguml_core::matrix::DependencyMatrix;
use tuguml_core::model::SourceComponent;
use tuguml_core::visitor::{UmlExtractor, UmlOptions};
use tuguml_java::{JavaSourceParser, ParseError, ParseProgress};

use crate::progress::{
    EventStream, EventSubscription, ProgressCache, ProjectId, Stage, StageEvent, StageResult,
};
use crate::render::{DiagramRenderer, RenderError};
use crate::store::{Artifact, ArtifactKind, ArtifactRef, ArtifactStore, StoreError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// The stage's worker panicked or was aborted.
    #[error("{stage} stage did not finish: {message}")]
    Task { stage: Stage, message: String },
}

/// What a caller gets back from [`Pipeline::observe`].
#[derive(Debug)]
pub enum Observation {
    /// The stage's artifact is already persisted.
    Finished(ArtifactRef),
    /// The stage is pending or running; events arrive on the subscription.
    Live(EventSubscription),
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub project: ProjectId,
    pub types: usize,
    pub externals: usize,
    /// One per persisting stage, in stage order.
    pub artifacts: Vec<ArtifactRef>,
}

#[derive(Clone)]
pub struct Pipeline {
    cache: Arc<ProgressCache>,
    store: Arc<dyn ArtifactStore>,
    renderer: Arc<dyn DiagramRenderer>,
    parser: JavaSourceParser,
    options: UmlOptions,
}

impl Pipeline {
    pub fn new(store: Arc<dyn ArtifactStore>, renderer: Arc<dyn DiagramRenderer>) -> Self {
        Pipeline {
            cache: Arc::new(ProgressCache::new()),
            store,
            renderer,
            parser: JavaSourceParser::new(),
            options: UmlOptions::default(),
        }
    }

    pub fn with_options(mut self, options: UmlOptions) -> Self {
        self.options = options;
        self
    }

    /// Skip source files matching these globs.
    pub fn with_exclusions(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.parser = self.parser.with_exclusions(patterns);
        self
    }

    pub fn cache(&self) -> &ProgressCache {
        &self.cache
    }

    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    /// Run every stage on a background task.
    pub fn spawn(
        &self,
        project: ProjectId,
        root: PathBuf,
    ) -> JoinHandle<Result<PipelineReport, PipelineError>> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(&project, &root).await })
    }

    /// Run every stage and wait for the last one.
    ///
    /// Artifacts of an earlier run are removed first, so a failing stage
    /// leaves only what this run produced before it.
    pub async fn run(&self, project: &ProjectId, root: &Path) -> Result<PipelineReport, PipelineError> {
        info!(project = %project, root = %root.display(), "pipeline started");
        let stale = self.store.delete(project)?;
        if stale > 0 {
            debug!(project = %project, stale, "cleared previous artifacts");
        }
        let mut artifacts = Vec::with_capacity(4);

        let tree = {
            let parser = self.parser.clone().with_name(project.as_str());
            let cache = Arc::clone(&self.cache);
            let id = project.clone();
            let root = root.to_path_buf();
            self.run_stage(project, Stage::Parse, move || {
                let report = |p: ParseProgress| {
                    cache.publish(StageEvent::progress(&id, Stage::Parse, p.percent()));
                };
                let tree = parser.parse_with_progress(&root, &report)?;
                let summary = StageResult::Model {
                    components: tree.len(),
                    types: tree.types().len(),
                    externals: tree.externals().len(),
                };
                Ok((Arc::new(tree), summary))
            })
            .await?
        };

        let stored = self
            .persisting_stage(project, Stage::Persist, &tree, |tree| {
                Ok(Artifact::LightWeightModel(LightWeightModel::from_tree(tree)))
            })
            .await?;
        artifacts.push(stored);

        let options = self.options;
        let stored = self
            .persisting_stage(project, Stage::Uml, &tree, move |tree| {
                Ok(Artifact::UmlText(UmlExtractor::generate(tree, options)))
            })
            .await?;
        artifacts.push(stored);

        let renderer = Arc::clone(&self.renderer);
        let stored = self
            .persisting_stage(project, Stage::Render, &tree, move |tree| {
                // Regenerated with the uml stage's options, so the text matches.
                let uml = UmlExtractor::generate(tree, options);
                Ok(Artifact::Diagram(renderer.render(&uml, tree, options)?))
            })
            .await?;
        artifacts.push(stored);

        let stored = self
            .persisting_stage(project, Stage::Matrix, &tree, |tree| {
                Ok(Artifact::DependencyMatrix(DependencyMatrix::compute(tree)))
            })
            .await?;
        artifacts.push(stored);

        info!(project = %project, artifacts = artifacts.len(), "pipeline finished");
        Ok(PipelineReport {
            project: project.clone(),
            types: tree.types().len(),
            externals: tree.externals().len(),
            artifacts,
        })
    }

    /// Observe `stage` of `project`.
    ///
    /// Returns the persisted artifact if the stage already finished, otherwise
    /// registers a fresh stream for the key.
    pub fn observe(&self, project: &ProjectId, stage: Stage) -> Result<Observation, PipelineError> {
        if let Some(found) = self.finished(project, stage)? {
            return Ok(Observation::Finished(found));
        }
        let (stream, subscription) = EventStream::channel();
        self.cache.register(project, stage, stream);
        // The stage may have completed between the check and the register.
        if let Some(found) = self.finished(project, stage)? {
            self.cache.unregister(project, stage);
            return Ok(Observation::Finished(found));
        }
        Ok(Observation::Live(subscription))
    }

    /// Remove every persisted artifact of `project`.
    pub fn delete(&self, project: &ProjectId) -> Result<usize, PipelineError> {
        let removed = self.store.delete(project)?;
        info!(project = %project, removed, "deleted project");
        Ok(removed)
    }

    pub fn load(&self, project: &ProjectId, kind: ArtifactKind) -> Result<Option<Artifact>, PipelineError> {
        Ok(self.store.load(project, kind)?)
    }

    fn finished(&self, project: &ProjectId, stage: Stage) -> Result<Option<ArtifactRef>, PipelineError> {
        match stage.artifact() {
            Some(kind) => Ok(self.store.reference(project, kind)?),
            None => Ok(None),
        }
    }

    /// A stage that builds one artifact from the tree and saves it.
    async fn persisting_stage<F>(
        &self,
        project: &ProjectId,
        stage: Stage,
        tree: &Arc<SourceComponent>,
        build: F,
    ) -> Result<ArtifactRef, PipelineError>
    where
        F: FnOnce(&SourceComponent) -> Result<Artifact, PipelineError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let tree = Arc::clone(tree);
        let id = project.clone();
        self.run_stage(project, stage, move || {
            let artifact = build(&tree)?;
            let stored = store.save(&id, &artifact)?;
            Ok((stored.clone(), StageResult::Artifact(stored)))
        })
        .await
    }

    async fn run_stage<T, F>(&self, project: &ProjectId, stage: Stage, work: F) -> Result<T, PipelineError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<(T, StageResult), PipelineError> + Send + 'static,
    {
        debug!(project = %project, stage = %stage, "stage started");
        self.cache.publish(StageEvent::progress(project, stage, 0));

        let outcome = match tokio::task::spawn_blocking(work).await {
            Ok(outcome) => outcome,
            Err(e) => Err(PipelineError::Task {
                stage,
                message: e.to_string(),
            }),
        };

        // Take the stream out first so a later run can register the key again.
        let stream = self.cache.unregister(project, stage);
        match outcome {
            Ok((value, result)) => {
                if let Some(stream) = stream {
                    stream.send(StageEvent::complete(project, stage, result));
                }
                info!(project = %project, stage = %stage, "stage complete");
                Ok(value)
            }
            Err(err) => {
                error!(project = %project, stage = %stage, error = %err, "stage failed");
                if let Some(stream) = stream {
                    stream.send(StageEvent::error(project, stage, err.to_string()));
                }
                self.abandon_after(project, stage);
                Err(err)
            }
        }
    }

    /// Drop the streams of every stage after `failed`.
    fn abandon_after(&self, project: &ProjectId, failed: Stage) {
        for stage in Stage::ALL.iter().copied().filter(|s| *s > failed) {
            if self.cache.unregister(project, stage).is_some() {
                debug!(project = %project, stage = %stage, "closed stream of skipped stage");
            }
        }
    }
}
