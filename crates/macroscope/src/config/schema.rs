use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    pub version: String,
    /// Character bound for code, script and blob previews.
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
    /// Leading bytes inspected by content sniffing and signature checks.
    #[serde(default = "default_sniff_window")]
    pub sniff_window: usize,
    /// Plugins run by front-ends when the caller names none.
    #[serde(default)]
    pub plugins: Vec<String>,
    #[serde(default)]
    pub html: HtmlConfig,
    #[serde(default)]
    pub risk: RiskConfig,
}

fn default_preview_length() -> usize {
    200
}

fn default_sniff_window() -> usize {
    4096
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            preview_length: default_preview_length(),
            sniff_window: default_sniff_window(),
            plugins: Vec::new(),
            html: HtmlConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlConfig {
    /// Externally refreshed CVE feed (JSON array of `{id, summary}` records).
    #[serde(default)]
    pub cve_feed: Option<PathBuf>,
    /// Inline `{cve_id: regex}` table; replaces the built-in table when non-empty.
    #[serde(default)]
    pub cve_patterns: BTreeMap<String, String>,
    #[serde(default = "default_exploit_kits")]
    pub exploit_kits: Vec<String>,
    #[serde(default = "default_suspicious_keywords")]
    pub suspicious_keywords: Vec<String>,
    #[serde(default)]
    pub signature_rules: Vec<SignatureRule>,
}

fn default_exploit_kits() -> Vec<String> {
    ["Neutrino", "Angler", "RIG"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_suspicious_keywords() -> Vec<String> {
    [
        "download",
        "window.location",
        "iframe",
        "object",
        "msSaveOrOpenBlob",
        "ActiveXObject",
        "XMLHttpRequest",
        "document.write",
        "setTimeout",
        "setInterval",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            cve_feed: None,
            cve_patterns: BTreeMap::new(),
            exploit_kits: default_exploit_kits(),
            suspicious_keywords: default_suspicious_keywords(),
            signature_rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default)]
    pub baseline: u32,
    #[serde(default = "default_max_score")]
    pub max_score: u32,
    #[serde(default = "default_max_hits")]
    pub max_hits_per_category: u32,
    #[serde(default = "default_weights")]
    pub weights: BTreeMap<String, u32>,
}

fn default_max_score() -> u32 {
    100
}

fn default_max_hits() -> u32 {
    3
}

pub fn default_weights() -> BTreeMap<String, u32> {
    [
        ("autoexec", 30),
        ("suspicious", 25),
        ("macros", 10),
        ("external_relationships", 20),
        ("openaction", 15),
        ("js", 25),
        ("embedded_files", 10),
        ("exploits", 40),
        ("suspicious_scripts", 20),
        ("suspicious_blobs", 5),
        ("blob_payloads", 30),
        ("suspicious_strings", 2),
        ("cve_hits", 35),
        ("signature_matches", 25),
        ("obfuscation", 15),
        ("exploit_kit", 40),
        ("ole_macros", 10),
        ("js_found", 10),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), *v))
    .collect()
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            baseline: 0,
            max_score: default_max_score(),
            max_hits_per_category: default_max_hits(),
            weights: default_weights(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "match")]
    pub match_condition: MatchCondition,
}

/// Custom deserialization for MatchCondition to properly handle untagged enum.
/// Both SimpleMatch and CompoundMatch have all optional fields, so the
/// compound keys decide which variant applies.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MatchCondition {
    Simple(SimpleMatch),
    Compound(CompoundMatch),
}

impl<'de> serde::Deserialize<'de> for MatchCondition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        use serde_json::Value;

        let value = Value::deserialize(deserializer)?;

        if let Value::Object(map) = &value {
            if map.contains_key("all") || map.contains_key("any") || map.contains_key("not") {
                let compound: CompoundMatch = serde_json::from_value(value)
                    .map_err(|e| D::Error::custom(format!("Invalid compound match: {}", e)))?;
                return Ok(MatchCondition::Compound(compound));
            }
            let simple: SimpleMatch = serde_json::from_value(value)
                .map_err(|e| D::Error::custom(format!("Invalid simple match: {}", e)))?;
            return Ok(MatchCondition::Simple(simple));
        }

        Err(D::Error::custom("MatchCondition must be an object"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompoundMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<MatchCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<Vec<MatchCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<MatchCondition>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimpleMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(rename = "containsAny", default, skip_serializing_if = "Option::is_none")]
    pub contains_any: Option<Vec<String>>,
    #[serde(rename = "containsAll", default, skip_serializing_if = "Option::is_none")]
    pub contains_all: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}
