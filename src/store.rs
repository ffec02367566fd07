//! Artifact persistence.
//!
//! Each completed pipeline stage saves one [`Artifact`] per project. Stores
//! are opaque key-value persistence keyed by `(ProjectId, ArtifactKind)`:
//!
//! - [`MemoryStore`]: in-process map, for tests and embedding
//! - [`DirectoryStore`]: one JSON document per artifact under
//!   `<root>/<project>/<kind>.json`

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use tuguml_core::lightweight::LightWeightModel;
use tuguml_core::matrix::DependencyMatrix;

use crate::progress::ProjectId;
use crate::render::RenderedDiagram;
use crate::util;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode artifact: {0}")]
    Encode(#[from] serde_json::Error),

    /// A stored document exists but cannot be read back.
    #[error("corrupt artifact at {}: {message}", .path.display())]
    Corrupt { path: PathBuf, message: String },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ============================================================================
// Artifacts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    LightWeightModel,
    UmlText,
    Diagram,
    DependencyMatrix,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::LightWeightModel,
        ArtifactKind::UmlText,
        ArtifactKind::Diagram,
        ArtifactKind::DependencyMatrix,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::LightWeightModel => "lightweight_model",
            ArtifactKind::UmlText => "uml_text",
            ArtifactKind::Diagram => "diagram",
            ArtifactKind::DependencyMatrix => "dependency_matrix",
        }
    }

    /// Inverse of [`ArtifactKind::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        ArtifactKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn file_name(&self) -> String {
        format!("{}.json", self.name())
    }
}

/// A persisted stage result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Artifact {
    LightWeightModel(LightWeightModel),
    UmlText(String),
    Diagram(RenderedDiagram),
    DependencyMatrix(DependencyMatrix),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::LightWeightModel(_) => ArtifactKind::LightWeightModel,
            Artifact::UmlText(_) => ArtifactKind::UmlText,
            Artifact::Diagram(_) => ArtifactKind::Diagram,
            Artifact::DependencyMatrix(_) => ArtifactKind::DependencyMatrix,
        }
    }
}

/// Handle to a stored artifact, carried by `complete` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub project: ProjectId,
    pub kind: ArtifactKind,
    /// SHA-256 of the artifact's JSON encoding, hex.
    pub digest: String,
    pub bytes: u64,
    pub stored_at: String,
}

/// On-disk and in-memory record: the reference plus the artifact itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredArtifact {
    reference: ArtifactRef,
    artifact: Artifact,
}

impl StoredArtifact {
    fn seal(project: &ProjectId, artifact: &Artifact) -> Result<Self, StoreError> {
        let encoded = serde_json::to_vec(artifact)?;
        Ok(StoredArtifact {
            reference: ArtifactRef {
                project: project.clone(),
                kind: artifact.kind(),
                digest: util::sha256_hex(&encoded),
                bytes: encoded.len() as u64,
                stored_at: util::now(),
            },
            artifact: artifact.clone(),
        })
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Key-value persistence for stage artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Save `artifact`, replacing any previous artifact of the same kind.
    fn save(&self, project: &ProjectId, artifact: &Artifact) -> Result<ArtifactRef, StoreError>;

    fn load(&self, project: &ProjectId, kind: ArtifactKind) -> Result<Option<Artifact>, StoreError>;

    /// Reference to the stored artifact, without loading its body.
    fn reference(
        &self,
        project: &ProjectId,
        kind: ArtifactKind,
    ) -> Result<Option<ArtifactRef>, StoreError>;

    fn contains(&self, project: &ProjectId, kind: ArtifactKind) -> Result<bool, StoreError> {
        Ok(self.reference(project, kind)?.is_some())
    }

    /// Remove every artifact of `project`. Returns how many were removed.
    fn delete(&self, project: &ProjectId) -> Result<usize, StoreError>;
}

// ============================================================================
// Memory Store
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: Mutex<HashMap<(ProjectId, ArtifactKind), StoredArtifact>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(ProjectId, ArtifactKind), StoredArtifact>> {
        self.artifacts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl ArtifactStore for MemoryStore {
    fn save(&self, project: &ProjectId, artifact: &Artifact) -> Result<ArtifactRef, StoreError> {
        let stored = StoredArtifact::seal(project, artifact)?;
        let reference = stored.reference.clone();
        self.lock().insert((project.clone(), artifact.kind()), stored);
        Ok(reference)
    }

    fn load(&self, project: &ProjectId, kind: ArtifactKind) -> Result<Option<Artifact>, StoreError> {
        Ok(self
            .lock()
            .get(&(project.clone(), kind))
            .map(|s| s.artifact.clone()))
    }

    fn reference(
        &self,
        project: &ProjectId,
        kind: ArtifactKind,
    ) -> Result<Option<ArtifactRef>, StoreError> {
        Ok(self
            .lock()
            .get(&(project.clone(), kind))
            .map(|s| s.reference.clone()))
    }

    fn delete(&self, project: &ProjectId) -> Result<usize, StoreError> {
        let mut artifacts = self.lock();
        let before = artifacts.len();
        artifacts.retain(|(p, _), _| p != project);
        Ok(before - artifacts.len())
    }
}

// ============================================================================
// Directory Store
// ============================================================================

/// JSON files under a root directory, one subdirectory per project.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Store rooted at `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project: &ProjectId) -> PathBuf {
        self.root.join(project.as_str())
    }

    /// Path of the document holding `kind` for `project`.
    pub fn path_of(&self, project: &ProjectId, kind: ArtifactKind) -> PathBuf {
        self.project_dir(project).join(kind.file_name())
    }

    fn read(&self, project: &ProjectId, kind: ArtifactKind) -> Result<Option<StoredArtifact>, StoreError> {
        let path = self.path_of(project, kind);
        let content = match fs::read(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let stored: StoredArtifact =
            serde_json::from_slice(&content).map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;
        if stored.reference.kind != kind {
            return Err(StoreError::Corrupt {
                path,
                message: format!("holds a {} artifact", stored.reference.kind.name()),
            });
        }
        Ok(Some(stored))
    }
}

impl ArtifactStore for DirectoryStore {
    fn save(&self, project: &ProjectId, artifact: &Artifact) -> Result<ArtifactRef, StoreError> {
        let stored = StoredArtifact::seal(project, artifact)?;
        let dir = self.project_dir(project);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let path = self.path_of(project, artifact.kind());
        let json = serde_json::to_vec_pretty(&stored)?;
        util::atomic_write(&path, &json).map_err(|e| StoreError::io(&path, e))?;
        debug!(path = %path.display(), digest = %stored.reference.digest, "saved artifact");
        Ok(stored.reference)
    }

    fn load(&self, project: &ProjectId, kind: ArtifactKind) -> Result<Option<Artifact>, StoreError> {
        Ok(self.read(project, kind)?.map(|s| s.artifact))
    }

    fn reference(
        &self,
        project: &ProjectId,
        kind: ArtifactKind,
    ) -> Result<Option<ArtifactRef>, StoreError> {
        Ok(self.read(project, kind)?.map(|s| s.reference))
    }

    fn delete(&self, project: &ProjectId) -> Result<usize, StoreError> {
        let mut removed = 0;
        for kind in ArtifactKind::ALL {
            let path = self.path_of(project, kind);
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }
        let dir = self.project_dir(project);
        util::remove_dir_if_empty(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(removed)
    }
}
