use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::extractor::{ExtractedArtifact, Payload};
use crate::sanitize::redact_path;
use crate::storage::ArtifactStore;

/// Canonical paths already analyzed in one session.
#[derive(Debug, Default)]
pub struct VisitedSet {
    paths: HashSet<PathBuf>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `path` visited. Returns `false` when it already was.
    pub fn claim(&mut self, path: &Path) -> bool {
        self.paths.insert(canonical(path))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Per-invocation state of the recursive engine. Created fresh for every
/// root document so nothing leaks between unrelated inputs.
#[derive(Debug, Default)]
pub struct AnalysisSession {
    pub visited: VisitedSet,
    // every written artifact, in write order
    pub extracted_files: Vec<PathBuf>,
    // recursive mode only: artifact path -> its own tree
    pub artifacts: Map<String, Value>,
    recursive: bool,
    pending: VecDeque<ExtractedArtifact>,
}

impl AnalysisSession {
    pub fn new(recursive: bool) -> Self {
        Self {
            recursive,
            ..Self::default()
        }
    }

    /// Writes the payloads pulled out of `source` and, when recursive,
    /// queues them for analysis.
    ///
    /// A payload whose target is already claimed in this session (the root
    /// document, an analyzed artifact, an earlier payload of the same name)
    /// is never written. Returns one note per refused or failed payload.
    pub fn store_payloads(
        &mut self,
        store: &ArtifactStore,
        source: &Path,
        payloads: Vec<Payload>,
    ) -> Vec<String> {
        let mut notes = Vec::new();

        for payload in payloads {
            let target = store.target(&payload.name);
            let shown = target
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            if !self.visited.claim(&target) {
                tracing::warn!(
                    artifact = %redact_path(&target),
                    method = payload.method.as_str(),
                    "target already claimed, payload not written"
                );
                notes.push(format!(
                    "Embedded object '{}' not written: a file of that name is already part of this analysis",
                    shown
                ));
                continue;
            }

            let path = match store.store(&payload.name, &payload.content) {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(artifact = %redact_path(&target), error = %e, "payload not written");
                    notes.push(format!("Cannot write embedded object '{}': {}", shown, e));
                    continue;
                }
            };
            // the target may have been a symlink before the write
            self.visited.claim(&path);

            self.extracted_files.push(path.clone());
            if self.recursive {
                self.pending.push_back(ExtractedArtifact {
                    path,
                    source: source.to_path_buf(),
                    method: payload.method,
                });
            }
        }
        notes
    }

    pub fn next_pending(&mut self) -> Option<ExtractedArtifact> {
        self.pending.pop_front()
    }

    pub fn record_artifact(&mut self, path: &Path, tree: Map<String, Value>) {
        self.artifacts
            .insert(path.display().to_string(), Value::Object(tree));
    }
}
