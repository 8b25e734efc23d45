//! Declarative content signatures and CVE pattern tables used by the HTML
//! analyzer.

pub mod cve;

use regex::Regex;
use std::collections::HashMap;

use crate::config::schema::{CompoundMatch, MatchCondition, SignatureRule, SimpleMatch};

pub use cve::{
    CompiledCvePattern, CveFeedFile, CvePatternSource, CveTable, InlineCvePatterns,
    StaticCvePatterns,
};

/// Rule-based content scanner.
///
/// Substring conditions compare case-insensitively; `pattern` regexes are
/// used as written (prefix `(?i)` for case-insensitive patterns).
pub struct SignatureEngine {
    rules: Vec<SignatureRule>,
    /// Pre-compiled regex patterns, indexed by pattern string
    compiled_patterns: HashMap<String, Regex>,
}

impl SignatureEngine {
    pub fn new(rules: Vec<SignatureRule>) -> Self {
        let mut compiled_patterns = HashMap::new();
        for rule in &rules {
            Self::collect_patterns(&rule.match_condition, &mut compiled_patterns);
        }

        Self {
            rules,
            compiled_patterns,
        }
    }

    /// Returns `None` when no rules are configured, so callers can skip the
    /// feature entirely.
    pub fn from_rules(rules: &[SignatureRule]) -> Option<Self> {
        if rules.is_empty() {
            None
        } else {
            Some(Self::new(rules.to_vec()))
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn collect_patterns(condition: &MatchCondition, patterns: &mut HashMap<String, Regex>) {
        match condition {
            MatchCondition::Simple(simple) => {
                if let Some(pattern) = &simple.pattern {
                    if !patterns.contains_key(pattern) {
                        match Regex::new(pattern) {
                            Ok(regex) => {
                                patterns.insert(pattern.clone(), regex);
                            }
                            Err(e) => {
                                tracing::warn!(pattern = %pattern, error = %e, "skipping invalid signature pattern");
                            }
                        }
                    }
                }
            }
            MatchCondition::Compound(compound) => {
                for cond in compound.all.iter().chain(compound.any.iter()).flatten() {
                    Self::collect_patterns(cond, patterns);
                }
                if let Some(not) = &compound.not {
                    Self::collect_patterns(not, patterns);
                }
            }
        }
    }

    /// Ids of every matching rule, in declaration order.
    pub fn scan(&self, content: &str) -> Vec<String> {
        let lowered = content.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| self.matches(&rule.match_condition, content, &lowered))
            .map(|rule| rule.id.clone())
            .collect()
    }

    fn matches(&self, condition: &MatchCondition, text: &str, lowered: &str) -> bool {
        match condition {
            MatchCondition::Compound(compound) => self.matches_compound(compound, text, lowered),
            MatchCondition::Simple(simple) => self.matches_simple(simple, text, lowered),
        }
    }

    fn matches_compound(&self, compound: &CompoundMatch, text: &str, lowered: &str) -> bool {
        if let Some(all) = &compound.all {
            return all.iter().all(|cond| self.matches(cond, text, lowered));
        }

        if let Some(any) = &compound.any {
            return any.iter().any(|cond| self.matches(cond, text, lowered));
        }

        if let Some(not) = &compound.not {
            return !self.matches(not, text, lowered);
        }

        false
    }

    fn matches_simple(&self, simple: &SimpleMatch, text: &str, lowered: &str) -> bool {
        let has = |needle: &String| lowered.contains(&needle.to_lowercase());

        if let Some(contains) = &simple.contains {
            return has(contains);
        }

        if let Some(contains_any) = &simple.contains_any {
            return contains_any.iter().any(has);
        }

        if let Some(contains_all) = &simple.contains_all {
            return contains_all.iter().all(has);
        }

        if let Some(pattern) = &simple.pattern {
            if let Some(regex) = self.compiled_patterns.get(pattern) {
                return regex.is_match(text);
            }
        }

        false
    }
}
