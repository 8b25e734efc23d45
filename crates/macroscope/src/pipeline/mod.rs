pub mod config;
pub mod context;
pub mod runner;

pub use config::PipelineConfig;
pub use context::{AnalysisSession, VisitedSet};
pub use runner::Pipeline;
