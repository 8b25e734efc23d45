use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::{MatchCondition, TriageConfig, CONFIG_VERSION};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TriageConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<TriageConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: TriageConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &TriageConfig) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    for (id, pattern) in &config.html.cve_patterns {
        if let Err(e) = regex::Regex::new(pattern) {
            return Err(ConfigError::InvalidPattern {
                id: id.clone(),
                reason: e.to_string(),
            });
        }
    }

    let mut rule_ids = HashSet::new();
    for rule in &config.html.signature_rules {
        if !rule_ids.insert(&rule.id) {
            return Err(ConfigError::InvalidRule {
                id: rule.id.clone(),
                reason: "Duplicate rule ID".to_string(),
            });
        }

        validate_match_condition(&rule.match_condition, &rule.id)?;
    }

    Ok(())
}

fn validate_match_condition(condition: &MatchCondition, rule_id: &str) -> Result<(), ConfigError> {
    match condition {
        MatchCondition::Compound(compound) => {
            for cond in compound.all.iter().chain(compound.any.iter()).flatten() {
                validate_match_condition(cond, rule_id)?;
            }
            if let Some(not) = &compound.not {
                validate_match_condition(not, rule_id)?;
            }
        }
        MatchCondition::Simple(simple) => {
            if let Some(pattern) = &simple.pattern {
                if let Err(e) = regex::Regex::new(pattern) {
                    return Err(ConfigError::InvalidRule {
                        id: rule_id.to_string(),
                        reason: format!("Invalid regex pattern: {}", e),
                    });
                }
            }
        }
    }

    Ok(())
}
