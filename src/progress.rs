//! Progress notification for running pipeline stages.
//!
//! A [`ProgressCache`] maps `(project, stage)` to the [`EventStream`] a caller
//! registered while waiting on that stage. Workers look the stream up, push
//! [`StageEvent`]s into it and unregister it once the stage finishes, so the
//! key can be reused by a later run.
//!
//! The cache only tracks in-flight work. Finished results live in the
//! artifact store.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::store::{ArtifactKind, ArtifactRef};
use crate::util;

// ============================================================================
// Keys
// ============================================================================

/// Rejected project identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid project id {0:?}: use letters, digits, '.', '_' or '-'")]
pub struct InvalidProjectId(pub String);

/// Project identifier. Also used as a directory name by the directory store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidProjectId> {
        let id = id.into();
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if valid {
            Ok(ProjectId(id))
        } else {
            Err(InvalidProjectId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = InvalidProjectId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProjectId::new(value)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parse,
    Persist,
    Uml,
    Render,
    Matrix,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Parse,
        Stage::Persist,
        Stage::Uml,
        Stage::Render,
        Stage::Matrix,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Persist => "persist",
            Stage::Uml => "uml",
            Stage::Render => "render",
            Stage::Matrix => "matrix",
        }
    }

    /// Artifact persisted when this stage completes. The parse stage keeps
    /// its tree in memory only.
    pub fn artifact(&self) -> Option<ArtifactKind> {
        match self {
            Stage::Parse => None,
            Stage::Persist => Some(ArtifactKind::LightWeightModel),
            Stage::Uml => Some(ArtifactKind::UmlText),
            Stage::Render => Some(ArtifactKind::Diagram),
            Stage::Matrix => Some(ArtifactKind::DependencyMatrix),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub project: ProjectId,
    pub stage: Stage,
}

impl StreamKey {
    pub fn new(project: &ProjectId, stage: Stage) -> Self {
        StreamKey {
            project: project.clone(),
            stage,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// What a completed stage produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageResult {
    /// A persisted artifact.
    Artifact(ArtifactRef),
    /// Summary of the in-memory component tree.
    Model {
        components: usize,
        types: usize,
        externals: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StageEventKind {
    Progress { percent: u8 },
    Complete { result: StageResult },
    Error { message: String },
}

/// One event on a stage's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEvent {
    pub project: ProjectId,
    pub stage: Stage,
    #[serde(flatten)]
    pub kind: StageEventKind,
    /// RFC 3339 UTC.
    pub at: String,
}

impl StageEvent {
    pub fn new(project: &ProjectId, stage: Stage, kind: StageEventKind) -> Self {
        StageEvent {
            project: project.clone(),
            stage,
            kind,
            at: util::now(),
        }
    }

    pub fn progress(project: &ProjectId, stage: Stage, percent: u8) -> Self {
        StageEvent::new(project, stage, StageEventKind::Progress { percent: percent.min(100) })
    }

    pub fn complete(project: &ProjectId, stage: Stage, result: StageResult) -> Self {
        StageEvent::new(project, stage, StageEventKind::Complete { result })
    }

    pub fn error(project: &ProjectId, stage: Stage, message: impl Into<String>) -> Self {
        StageEvent::new(
            project,
            stage,
            StageEventKind::Error {
                message: message.into(),
            },
        )
    }

    /// Event name on the wire: `progress`, `complete` or `error`.
    pub fn name(&self) -> &'static str {
        match self.kind {
            StageEventKind::Progress { .. } => "progress",
            StageEventKind::Complete { .. } => "complete",
            StageEventKind::Error { .. } => "error",
        }
    }

    /// `complete` and `error` end a stage.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, StageEventKind::Progress { .. })
    }
}

// ============================================================================
// Streams
// ============================================================================

/// Sending half of a stage's event stream.
///
/// Cheap to clone. Sending never blocks, so workers may push from blocking
/// threads and async tasks alike. The stream closes when every clone is
/// dropped.
#[derive(Debug, Clone)]
pub struct EventStream {
    tx: mpsc::UnboundedSender<StageEvent>,
}

/// Receiving half of an [`EventStream`].
#[derive(Debug)]
pub struct EventSubscription {
    rx: mpsc::UnboundedReceiver<StageEvent>,
}

impl EventStream {
    /// A new connected stream/subscription pair.
    pub fn channel() -> (EventStream, EventSubscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventStream { tx }, EventSubscription { rx })
    }

    /// Push an event. Returns `false` if the subscriber has gone away.
    pub fn send(&self, event: StageEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl EventSubscription {
    /// Next event, or `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<StageEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_next(&mut self) -> Option<StageEvent> {
        self.rx.try_recv().ok()
    }

    /// Events up to and including the first terminal one.
    pub async fn until_terminal(&mut self) -> Vec<StageEvent> {
        let mut out = Vec::new();
        while let Some(event) = self.next().await {
            let done = event.is_terminal();
            out.push(event);
            if done {
                break;
            }
        }
        out
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Concurrent `(project, stage) -> EventStream` map.
///
/// Every operation takes the lock for a single map operation only; events
/// are sent after the lock is released.
#[derive(Debug, Default)]
pub struct ProgressCache {
    streams: Mutex<HashMap<StreamKey, EventStream>>,
}

impl ProgressCache {
    pub fn new() -> Self {
        ProgressCache::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StreamKey, EventStream>> {
        // A panicking holder cannot leave the map half-updated.
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, project: &ProjectId, stage: Stage) -> bool {
        self.lock().contains_key(&StreamKey::new(project, stage))
    }

    /// Register `stream` for `(project, stage)`. Returns `true` if no stream
    /// was registered for the key; an existing one is replaced either way.
    pub fn register(&self, project: &ProjectId, stage: Stage, stream: EventStream) -> bool {
        let previous = self.lock().insert(StreamKey::new(project, stage), stream);
        if previous.is_some() {
            warn!(project = %project, stage = %stage, "replaced registered event stream");
        }
        previous.is_none()
    }

    pub fn get(&self, project: &ProjectId, stage: Stage) -> Option<EventStream> {
        self.lock().get(&StreamKey::new(project, stage)).cloned()
    }

    pub fn unregister(&self, project: &ProjectId, stage: Stage) -> Option<EventStream> {
        self.lock().remove(&StreamKey::new(project, stage))
    }

    /// Send `event` to the stream registered for its key, if any. Returns
    /// whether a subscriber received it.
    pub fn publish(&self, event: StageEvent) -> bool {
        let Some(stream) = self.get(&event.project, event.stage) else {
            debug!(project = %event.project, stage = %event.stage, event = event.name(), "no subscriber");
            return false;
        };
        stream.send(event)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pid(s: &str) -> ProjectId {
        ProjectId::new(s).unwrap()
    }

    mod project_id_tests {
        use super::*;

        #[test]
        fn accepts_directory_safe_names() {
            assert!(ProjectId::new("shop-2.0_beta").is_ok());
        }

        #[test]
        fn rejects_paths_and_empty() {
            for bad in ["", ".", "..", "a/b", "a b", "../x"] {
                assert!(ProjectId::new(bad).is_err(), "{:?} accepted", bad);
            }
        }

        #[test]
        fn serde_validates() {
            let ok: ProjectId = serde_json::from_str("\"demo\"").unwrap();
            assert_eq!(ok.as_str(), "demo");
            assert!(serde_json::from_str::<ProjectId>("\"a/b\"").is_err());
        }
    }

    mod event_tests {
        use super::*;

        #[test]
        fn names_and_terminality() {
            let p = pid("p");
            let progress = StageEvent::progress(&p, Stage::Parse, 140);
            assert_eq!(progress.name(), "progress");
            assert_eq!(progress.kind, StageEventKind::Progress { percent: 100 });
            assert!(!progress.is_terminal());
            let error = StageEvent::error(&p, Stage::Parse, "boom");
            assert_eq!(error.name(), "error");
            assert!(error.is_terminal());
        }

        #[test]
        fn serializes_flat() {
            let event = StageEvent::complete(
                &pid("p"),
                Stage::Parse,
                StageResult::Model {
                    components: 5,
                    types: 2,
                    externals: 1,
                },
            );
            let json: serde_json::Value = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], "complete");
            assert_eq!(json["stage"], "parse");
            assert_eq!(json["project"], "p");
            assert_eq!(json["result"]["type"], "model");
            assert_eq!(json["result"]["types"], 2);
            let back: StageEvent = serde_json::from_value(json).unwrap();
            assert_eq!(back, event);
        }

        #[test]
        fn stage_artifacts() {
            assert_eq!(Stage::Parse.artifact(), None);
            assert_eq!(Stage::Render.artifact(), Some(ArtifactKind::Diagram));
            assert!(Stage::ALL.windows(2).all(|w| w[0] < w[1]));
        }
    }

    mod cache_tests {
        use super::*;

        #[test]
        fn register_get_unregister() {
            let cache = ProgressCache::new();
            let p = pid("p");
            assert!(!cache.contains(&p, Stage::Uml));
            let (stream, _sub) = EventStream::channel();
            assert!(cache.register(&p, Stage::Uml, stream));
            assert!(cache.contains(&p, Stage::Uml));
            assert!(!cache.contains(&p, Stage::Render));
            assert!(cache.get(&p, Stage::Uml).is_some());
            assert!(cache.unregister(&p, Stage::Uml).is_some());
            assert!(cache.get(&p, Stage::Uml).is_none());
            assert!(cache.unregister(&p, Stage::Uml).is_none());
        }

        #[test]
        fn overwrite_is_reported_then_cleared() {
            let cache = ProgressCache::new();
            let p = pid("p");
            let (first, _a) = EventStream::channel();
            let (second, _b) = EventStream::channel();
            assert!(cache.register(&p, Stage::Parse, first));
            assert!(!cache.register(&p, Stage::Parse, second));
            assert_eq!(cache.len(), 1);
            cache.unregister(&p, Stage::Parse);
            assert!(cache.get(&p, Stage::Parse).is_none());
            assert!(cache.is_empty());
        }

        #[test]
        fn concurrent_registrations_for_distinct_keys() {
            let cache = Arc::new(ProgressCache::new());
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let cache = Arc::clone(&cache);
                    std::thread::spawn(move || {
                        let p = pid(&format!("project-{}", i));
                        Stage::ALL
                            .iter()
                            .map(|stage| {
                                let (stream, _sub) = EventStream::channel();
                                cache.register(&p, *stage, stream)
                            })
                            .collect::<Vec<bool>>()
                    })
                })
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().into_iter().all(|fresh| fresh));
            }
            assert_eq!(cache.len(), 16 * Stage::ALL.len());
            for i in 0..16 {
                let p = pid(&format!("project-{}", i));
                for stage in Stage::ALL {
                    assert!(cache.get(&p, stage).is_some());
                }
            }
        }

        #[test]
        fn publish_reaches_registered_subscriber() {
            let cache = ProgressCache::new();
            let p = pid("p");
            assert!(!cache.publish(StageEvent::progress(&p, Stage::Uml, 0)));
            let (stream, mut sub) = EventStream::channel();
            cache.register(&p, Stage::Uml, stream);
            assert!(cache.publish(StageEvent::progress(&p, Stage::Uml, 50)));
            let event = sub.try_next().unwrap();
            assert_eq!(event.kind, StageEventKind::Progress { percent: 50 });
            assert!(sub.try_next().is_none());
        }

        #[tokio::test]
        async fn subscription_ends_when_streams_drop() {
            let cache = ProgressCache::new();
            let p = pid("p");
            let (stream, mut sub) = EventStream::channel();
            cache.register(&p, Stage::Matrix, stream);
            cache.publish(StageEvent::error(&p, Stage::Matrix, "failed"));
            cache.unregister(&p, Stage::Matrix);
            let events = sub.until_terminal().await;
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].name(), "error");
            assert!(sub.next().await.is_none());
        }
    }
}
