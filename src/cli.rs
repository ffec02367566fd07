//! CLI front door.
//!
//! Command helpers for the `tuguml` binary:
//! - `generate` - run the pipeline into a [`DirectoryStore`], streaming events
//! - `uml` - print the UML text of a source tree
//! - `show` - print one stored artifact
//! - `delete` - remove a project's artifacts
//!
//! All functions return `Result<T, UmlError>`; `main.rs` turns errors into
//! JSON error responses and exit codes.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use tuguml_core::error::UmlError;
use tuguml_core::visitor::UmlExtractor;
use tuguml_java::JavaSourceParser;

use crate::config::ResolvedConfig;
use crate::output::{emit_json_line, DeleteResponse, GenerateResponse};
use crate::pipeline::{Observation, Pipeline};
use crate::progress::{ProjectId, Stage};
use crate::store::{Artifact, ArtifactKind, ArtifactStore, DirectoryStore};

/// Default artifact directory, relative to the working directory.
pub const DEFAULT_OUT_DIR: &str = ".tuguml";

/// Project id derived from the source root's directory name.
///
/// Characters a project id cannot hold become `-`.
pub fn project_id_for(root: &Path) -> Result<ProjectId, UmlError> {
    let name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    ProjectId::new(cleaned).map_err(|_| {
        UmlError::invalid_args(format!(
            "cannot derive a project id from {}; pass --project",
            root.display()
        ))
    })
}

/// Run the pipeline over `root` and stream every stage event to `events`.
///
/// Existing artifacts of the project are replaced.
pub async fn run_generate(
    root: &Path,
    out_dir: &Path,
    project: ProjectId,
    config: &ResolvedConfig,
    events: &mut impl Write,
) -> Result<GenerateResponse, UmlError> {
    let store = Arc::new(DirectoryStore::new(out_dir));
    let pipeline = Pipeline::new(store, config.renderer()?)
        .with_options(config.uml_options())
        .with_exclusions(config.exclusions());

    // Stale artifacts would make every stage look finished.
    let stale = pipeline.delete(&project)?;
    if stale > 0 {
        debug!(project = %project, stale, "cleared previous artifacts");
    }

    let mut observations = Vec::with_capacity(Stage::ALL.len());
    for stage in Stage::ALL {
        observations.push(pipeline.observe(&project, stage)?);
    }

    let handle = pipeline.spawn(project.clone(), root.to_path_buf());
    for observation in observations {
        let Observation::Live(mut subscription) = observation else {
            continue;
        };
        while let Some(event) = subscription.next().await {
            emit_json_line(&event, events).map_err(|e| UmlError::internal(e.to_string()))?;
            if event.is_terminal() {
                break;
            }
        }
    }

    let report = handle
        .await
        .map_err(|e| UmlError::internal(format!("pipeline task failed: {}", e)))??;
    Ok(GenerateResponse::new(
        report.project,
        out_dir.to_path_buf(),
        report.types,
        report.externals,
        report.artifacts,
    ))
}

/// UML text for `root`, without touching any store.
pub fn run_uml(root: &Path, config: &ResolvedConfig) -> Result<String, UmlError> {
    let tree = JavaSourceParser::new()
        .with_exclusions(config.exclusions())
        .parse(root)?;
    Ok(UmlExtractor::generate(&tree, config.uml_options()))
}

/// Stored artifact `kind` of `project` under `out_dir`.
pub fn run_show(
    out_dir: &Path,
    project: &ProjectId,
    kind: ArtifactKind,
) -> Result<Artifact, UmlError> {
    let store = DirectoryStore::new(out_dir);
    store
        .load(project, kind)?
        .ok_or_else(|| UmlError::not_found(format!("{}/{}", project, kind.name())))
}

/// Delete every artifact of `project` under `out_dir`.
pub fn run_delete(out_dir: &Path, project: ProjectId) -> Result<DeleteResponse, UmlError> {
    let store = DirectoryStore::new(out_dir);
    let removed = store.delete(&project)?;
    Ok(DeleteResponse::new(project, removed))
}

/// `--out`, else [`DEFAULT_OUT_DIR`].
pub fn out_dir_or_default(out: Option<PathBuf>) -> PathBuf {
    out.unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR))
}
