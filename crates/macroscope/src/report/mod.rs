pub mod render;
pub mod risk;

use serde_json::{Map, Value};

pub use risk::{RiskScorer, WeightedRiskPolicy};

pub const RISK_SCORE: &str = "risk_score";

/// The merged result of one top-level analysis. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    tree: Map<String, Value>,
    risk_score: u32,
}

impl Report {
    pub fn new(tree: Map<String, Value>, scorer: &dyn RiskScorer) -> Self {
        let risk_score = scorer.score(&tree);
        Self { tree, risk_score }
    }

    pub fn tree(&self) -> &Map<String, Value> {
        &self.tree
    }

    pub fn risk_score(&self) -> u32 {
        self.risk_score
    }

    /// The tree with `risk_score` appended after every other key.
    pub fn to_value(&self) -> Value {
        let mut map = self.tree.clone();
        map.insert(RISK_SCORE.to_string(), Value::from(self.risk_score));
        Value::Object(map)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_value())
    }

    pub fn to_text(&self, colored: bool) -> String {
        render::render_text(&self.tree, self.risk_score, colored)
    }
}
