pub mod analyzer;
pub mod config;
pub mod digest;
pub mod document;
pub mod error;
pub mod extractor;
pub mod findings;
pub mod formats;
pub mod guard;
pub mod pipeline;
pub mod plugins;
pub mod report;
pub mod sanitize;
pub mod signatures;
pub mod storage;

pub use analyzer::{Analyzers, DocumentAnalyzer};
pub use config::{load_config, load_config_from_str, TriageConfig};
pub use document::{Document, DocumentKind};
pub use error::{ConfigError, ExtractError, MacroscopeError, PluginError, Result, StorageError};
pub use extractor::{ExtractedArtifact, ExtractionMethod, Extractor, Payload};
pub use findings::Findings;
pub use pipeline::{AnalysisSession, Pipeline, PipelineConfig, VisitedSet};
pub use plugins::{Plugin, PluginRegistry};
pub use report::{Report, RiskScorer, WeightedRiskPolicy};
pub use storage::ArtifactStore;
