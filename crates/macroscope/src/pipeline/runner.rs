use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{debug, info_span};

use crate::analyzer::Analyzers;
use crate::config::TriageConfig;
use crate::document::Document;
use crate::error::Result;
use crate::extractor::{ExtractedArtifact, Extractor, Payload};
use crate::findings::{Findings, ERRORS};
use crate::plugins::PluginRegistry;
use crate::report::{Report, RiskScorer, WeightedRiskPolicy};
use crate::sanitize;
use crate::storage::ArtifactStore;

use super::config::PipelineConfig;
use super::context::AnalysisSession;

/// Progress of a single node (the root document or one artifact).
#[derive(Debug)]
enum NodeState {
    Pending(PathBuf),
    Analyzing(Document),
    Extracted {
        document: Document,
        findings: Findings,
        payloads: Vec<Payload>,
    },
    Done(Map<String, Value>),
}

pub struct Pipeline {
    config: PipelineConfig,
    analyzers: Analyzers,
    plugins: PluginRegistry,
    scorer: Box<dyn RiskScorer>,
}

impl Pipeline {
    /// Production constructor: builtin plugins, weighted risk policy.
    pub fn from_config(config: &TriageConfig) -> Self {
        Self {
            config: PipelineConfig::from_config(config),
            analyzers: Analyzers::from_config(config),
            plugins: PluginRegistry::builtin(),
            scorer: Box::new(WeightedRiskPolicy::from_config(&config.risk)),
        }
    }

    /// Inject specific sub-components.
    pub fn new(
        config: PipelineConfig,
        analyzers: Analyzers,
        plugins: PluginRegistry,
        scorer: Box<dyn RiskScorer>,
    ) -> Self {
        Self {
            config,
            analyzers,
            plugins,
            scorer,
        }
    }

    /// Analyzes `path` and everything extracted from it.
    ///
    /// Only an unusable `output_dir` is an error. Unreadable input,
    /// malformed containers, failing extractors and failing plugins all
    /// end up inside the returned report.
    pub fn analyze_document(
        &self,
        path: &Path,
        plugin_names: &BTreeSet<String>,
        recursive: bool,
        output_dir: &Path,
    ) -> Result<Report> {
        let file = sanitize::redact_path(path);
        let _pipeline_span = info_span!("pipeline", file = %file, recursive).entered();

        let store = ArtifactStore::open(output_dir)?;
        let mut session = AnalysisSession::new(recursive);
        session.visited.claim(path);

        let mut tree = self.analyze_node(path, None, plugin_names, &store, &mut session);

        while let Some(artifact) = session.next_pending() {
            let node = self.analyze_node(
                &artifact.path,
                Some(&artifact),
                plugin_names,
                &store,
                &mut session,
            );
            session.record_artifact(&artifact.path, node);
        }

        debug!(
            extracted = session.extracted_files.len(),
            visited = session.visited.len(),
            "session finished"
        );

        let extracted: Vec<Value> = session
            .extracted_files
            .iter()
            .map(|p| Value::String(p.display().to_string()))
            .collect();
        tree.insert("extracted_files".to_string(), Value::Array(extracted));
        if recursive {
            tree.insert("artifacts".to_string(), Value::Object(session.artifacts));
        }

        Ok(Report::new(tree, self.scorer.as_ref()))
    }

    /// Drives one node from `Pending` to `Done`. `origin` is set for
    /// extracted artifacts.
    fn analyze_node(
        &self,
        path: &Path,
        origin: Option<&ExtractedArtifact>,
        plugin_names: &BTreeSet<String>,
        store: &ArtifactStore,
        session: &mut AnalysisSession,
    ) -> Map<String, Value> {
        let _node_span = info_span!("analyze_node", file = %sanitize::redact_path(path)).entered();

        let mut state = NodeState::Pending(path.to_path_buf());
        loop {
            state = match state {
                NodeState::Pending(path) => {
                    let document = Document::classify(&path, self.config.sniff_window);
                    debug!(kind = document.kind().label(), "classified");
                    NodeState::Analyzing(document)
                }
                NodeState::Analyzing(document) => {
                    let (findings, payloads) = self.inspect(&document);
                    debug!(payloads = payloads.len(), "extracted");
                    NodeState::Extracted {
                        document,
                        findings,
                        payloads,
                    }
                }
                NodeState::Extracted {
                    document,
                    mut findings,
                    payloads,
                } => {
                    for note in session.store_payloads(store, document.path(), payloads) {
                        findings.error(note);
                    }
                    let plugins = self.plugins.run_plugins(plugin_names, document.path());
                    NodeState::Done(node_tree(&document, origin, findings, plugins))
                }
                NodeState::Done(tree) => return tree,
            };
        }
    }

    /// Analyzer findings and embedded payloads for one classified document.
    fn inspect(&self, document: &Document) -> (Findings, Vec<Payload>) {
        let kind = document.kind();

        match std::fs::read(document.path()) {
            Ok(data) => {
                let findings = self.analyzers.analyze(kind, &data);
                let payloads = Extractor::for_kind(kind).extract(document, &data);
                (findings, payloads)
            }
            Err(e) => {
                debug!(error = %e, "input unreadable");
                let mut findings = self.analyzers.empty_findings(kind);
                findings.error(format!("Cannot read input file: {}", e));
                (findings, Vec::new())
            }
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_config(&TriageConfig::default())
    }
}

/// `document`, the analyzer categories (with `errors` last) and `plugins`.
fn node_tree(
    document: &Document,
    origin: Option<&ExtractedArtifact>,
    findings: Findings,
    plugins: Map<String, Value>,
) -> Map<String, Value> {
    let mut about = Map::new();
    about.insert(
        "path".to_string(),
        Value::String(document.path().display().to_string()),
    );
    about.insert("kind".to_string(), json!(document.kind()));
    if let Some(origin) = origin {
        about.insert(
            "extracted_from".to_string(),
            Value::String(origin.source.display().to_string()),
        );
        about.insert("method".to_string(), json!(origin.method));
    }

    let mut tree = Map::new();
    tree.insert("document".to_string(), Value::Object(about));

    let mut categories = findings.into_map();
    let errors = categories.remove(ERRORS);
    tree.extend(categories);
    tree.insert(
        ERRORS.to_string(),
        errors.unwrap_or_else(|| Value::Array(Vec::new())),
    );

    tree.insert("plugins".to_string(), Value::Object(plugins));
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_plugins() -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn test_missing_input_still_reports() {
        let temp_dir = TempDir::new().unwrap();
        let report = Pipeline::default()
            .analyze_document(
                &temp_dir.path().join("gone.pdf"),
                &no_plugins(),
                false,
                &temp_dir.path().join("out"),
            )
            .unwrap();

        let tree = report.tree();
        assert_eq!(tree["document"]["kind"], "pdf");
        assert_eq!(tree["errors"].as_array().unwrap().len(), 1);
        assert_eq!(tree["js"], json!([]));
        assert_eq!(tree["extracted_files"], json!([]));
        assert!(!tree.contains_key("artifacts"));
    }

    #[test]
    fn test_unusable_output_dir_is_hard_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("a.html");
        std::fs::write(&input, b"<html></html>").unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let outcome = Pipeline::default().analyze_document(&input, &no_plugins(), true, &blocker);
        assert!(outcome.is_err());
    }

    #[test]
    fn test_tree_layout() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("page.html");
        std::fs::write(&input, b"<html><iframe></iframe></html>").unwrap();
        let plugins: BTreeSet<String> = ["sample_plugin".to_string()].into();

        let report = Pipeline::default()
            .analyze_document(&input, &plugins, true, &temp_dir.path().join("out"))
            .unwrap();

        let keys: Vec<&str> = report.tree().keys().map(String::as_str).collect();
        assert_eq!(keys.first(), Some(&"document"));
        assert_eq!(
            &keys[keys.len() - 4..],
            &["errors", "plugins", "extracted_files", "artifacts"]
        );
        assert_eq!(report.tree()["plugins"]["sample_plugin"]["plugin"], "sample");
        assert_eq!(report.tree()["suspicious_strings"], json!(["iframe"]));
    }

    #[test]
    fn test_rtf_objects_extracted_and_recursed() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("dropper.rtf");
        // the payload is itself an RTF with an HTML-free body
        std::fs::write(&input, b"{\\rtf1{\\object{\\*\\objdata 7B5C727466317D}}}").unwrap();
        let out = temp_dir.path().join("out");

        let report = Pipeline::default()
            .analyze_document(&input, &no_plugins(), true, &out)
            .unwrap();

        let extracted = report.tree()["extracted_files"].as_array().unwrap();
        assert_eq!(extracted.len(), 1);
        let artifact = extracted[0].as_str().unwrap();
        assert!(artifact.ends_with("rtf_object_1.bin"));
        let about = &report.tree()["artifacts"][artifact]["document"];
        assert_eq!(about["kind"], "rtf");
        assert_eq!(about["method"], "rtf_objdata");
        assert_eq!(
            about["extracted_from"],
            input.canonicalize().unwrap().display().to_string()
        );
        assert!(report.tree()["document"].get("extracted_from").is_none());
    }

    #[test]
    fn test_root_inside_output_dir_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("rtf_object_1.bin");
        let original = b"{\\rtf1{\\object{\\*\\objdata 414243}}}".to_vec();
        std::fs::write(&input, &original).unwrap();

        let report = Pipeline::default()
            .analyze_document(&input, &no_plugins(), true, temp_dir.path())
            .unwrap();

        assert_eq!(std::fs::read(&input).unwrap(), original);
        assert_eq!(report.tree()["extracted_files"], json!([]));
        assert!(report.tree()["errors"][0]
            .as_str()
            .unwrap()
            .contains("'rtf_object_1.bin' not written"));
    }
}
