use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::RiskConfig;

/// Turns a finished report tree into a single number.
pub trait RiskScorer: Send + Sync {
    fn score(&self, tree: &Map<String, Value>) -> u32;
}

/// Weighted sum over category entry counts and true plugin flags.
///
/// Each category contributes `weight × min(entries, max_hits_per_category)`.
/// Every `true` field of a plugin result contributes the field's weight.
/// Nested artifact trees are scored the same way without the baseline.
/// The total is clamped to `max_score`.
#[derive(Debug, Clone)]
pub struct WeightedRiskPolicy {
    baseline: u32,
    max_score: u32,
    max_hits_per_category: u32,
    weights: BTreeMap<String, u32>,
}

impl WeightedRiskPolicy {
    pub fn from_config(config: &RiskConfig) -> Self {
        Self {
            baseline: config.baseline,
            max_score: config.max_score,
            max_hits_per_category: config.max_hits_per_category,
            weights: config.weights.clone(),
        }
    }

    /// A policy with no weights: every tree scores `baseline`.
    pub fn baseline_only(baseline: u32) -> Self {
        Self {
            baseline,
            max_score: u32::MAX,
            max_hits_per_category: 0,
            weights: BTreeMap::new(),
        }
    }

    fn weight(&self, key: &str) -> u32 {
        self.weights.get(key).copied().unwrap_or(0)
    }

    fn weigh(&self, tree: &Map<String, Value>) -> u32 {
        let mut total = 0u32;
        for (key, value) in tree {
            let contribution = match (key.as_str(), value) {
                ("plugins", Value::Object(results)) => self.weigh_plugins(results),
                ("artifacts", Value::Object(children)) => children
                    .values()
                    .filter_map(Value::as_object)
                    .fold(0u32, |acc, child| acc.saturating_add(self.weigh(child))),
                (category, Value::Array(entries)) => {
                    let hits = (entries.len() as u32).min(self.max_hits_per_category);
                    self.weight(category).saturating_mul(hits)
                }
                _ => 0,
            };
            total = total.saturating_add(contribution);
        }
        total
    }

    fn weigh_plugins(&self, results: &Map<String, Value>) -> u32 {
        results
            .values()
            .filter_map(Value::as_object)
            .flat_map(|result| result.iter())
            .filter(|(_, flag)| **flag == Value::Bool(true))
            .fold(0u32, |acc, (field, _)| acc.saturating_add(self.weight(field)))
    }
}

impl Default for WeightedRiskPolicy {
    fn default() -> Self {
        Self::from_config(&RiskConfig::default())
    }
}

impl RiskScorer for WeightedRiskPolicy {
    fn score(&self, tree: &Map<String, Value>) -> u32 {
        self.baseline
            .saturating_add(self.weigh(tree))
            .min(self.max_score)
    }
}
