use crate::config::TriageConfig;

/// The slice of [`TriageConfig`] the recursive engine itself consults.
/// Analyzer and risk settings reach their components directly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sniff_window: usize,
}

impl PipelineConfig {
    pub fn from_config(config: &TriageConfig) -> Self {
        Self {
            sniff_window: config.sniff_window,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&TriageConfig::default())
    }
}
