//! CVE-associated content patterns.
//!
//! The pattern table is injected data. A source either yields `(cve_id, regex)`
//! pairs or fails; on failure the HTML analyzer falls back to the built-in
//! table and records why.

use std::path::PathBuf;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::error::ConfigError;

/// Built-in fallback table.
const STATIC_PATTERNS: &[(&str, &str)] = &[
    ("CVE-2018-8174", r"vbscript:.*?ExecuteGlobal"),
    ("CVE-2016-0189", r"mshta\.exe|ActiveXObject\('Shell\.Application'\)"),
    ("CVE-2015-5122", r"Adobe\s?Flash|flashplayer|SWFObject"),
];

/// Summary keyword → pattern derivations for feed records. Later entries win
/// when a summary mentions several keywords.
const FEED_HEURISTICS: &[(&str, &str)] = &[
    ("vbscript", r"vbscript:.*?ExecuteGlobal"),
    ("activexobject", r"ActiveXObject"),
    ("mshta", r"mshta\.exe"),
    ("flash", r"Adobe\s?Flash|flashplayer|SWFObject"),
];

pub trait CvePatternSource: Send + Sync {
    /// Human-readable origin, used in log lines and fallback notes.
    fn describe(&self) -> String;

    fn load(&self) -> Result<Vec<(String, String)>, ConfigError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCvePatterns;

impl CvePatternSource for StaticCvePatterns {
    fn describe(&self) -> String {
        "built-in CVE table".to_string()
    }

    fn load(&self) -> Result<Vec<(String, String)>, ConfigError> {
        Ok(STATIC_PATTERNS
            .iter()
            .map(|(id, pattern)| (id.to_string(), pattern.to_string()))
            .collect())
    }
}

/// Patterns supplied directly in configuration.
#[derive(Debug, Clone, Default)]
pub struct InlineCvePatterns {
    patterns: Vec<(String, String)>,
}

impl InlineCvePatterns {
    pub fn new<I>(patterns: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            patterns: patterns.into_iter().collect(),
        }
    }
}

impl CvePatternSource for InlineCvePatterns {
    fn describe(&self) -> String {
        "configured CVE patterns".to_string()
    }

    fn load(&self) -> Result<Vec<(String, String)>, ConfigError> {
        Ok(self.patterns.clone())
    }
}

#[derive(Debug, Deserialize)]
struct FeedRecord {
    id: Option<String>,
    #[serde(default)]
    summary: String,
}

/// A locally cached CVE feed: a JSON array of `{"id", "summary"}` records.
/// Patterns are derived from summary keywords; records without a usable
/// keyword contribute nothing.
#[derive(Debug, Clone)]
pub struct CveFeedFile {
    path: PathBuf,
}

impl CveFeedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CvePatternSource for CveFeedFile {
    fn describe(&self) -> String {
        format!("CVE feed {}", self.path.display())
    }

    fn load(&self) -> Result<Vec<(String, String)>, ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::ReadFeed {
            path: self.path.clone(),
            source: e,
        })?;
        let records: Vec<FeedRecord> = serde_json::from_str(&content)?;
        Ok(derive_patterns(&records))
    }
}

fn derive_patterns(records: &[FeedRecord]) -> Vec<(String, String)> {
    let mut patterns: Vec<(String, String)> = Vec::new();
    for record in records {
        let Some(id) = record.id.as_deref().filter(|id| !id.is_empty()) else {
            continue;
        };
        let summary = record.summary.to_lowercase();
        let derived = FEED_HEURISTICS
            .iter()
            .filter(|(keyword, _)| summary.contains(keyword))
            .map(|(_, pattern)| *pattern)
            .last();
        let Some(pattern) = derived else {
            continue;
        };
        match patterns.iter_mut().find(|(existing, _)| existing == id) {
            Some(slot) => slot.1 = pattern.to_string(),
            None => patterns.push((id.to_string(), pattern.to_string())),
        }
    }
    patterns
}

#[derive(Debug, Clone)]
pub struct CompiledCvePattern {
    pub id: String,
    regex: Regex,
}

impl CompiledCvePattern {
    pub fn is_match(&self, content: &str) -> bool {
        self.regex.is_match(content)
    }
}

/// A resolved, compiled CVE table plus any informational notes produced
/// while resolving it.
#[derive(Debug, Clone, Default)]
pub struct CveTable {
    patterns: Vec<CompiledCvePattern>,
    notes: Vec<String>,
}

impl CveTable {
    /// Loads from `source`, falling back to the built-in table when it fails.
    pub fn resolve(source: &dyn CvePatternSource) -> Self {
        let mut notes = Vec::new();
        let raw = match source.load() {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(source = %source.describe(), error = %e, "CVE source unavailable, using built-in table");
                notes.push(format!(
                    "{} unavailable ({}); using built-in CVE table",
                    source.describe(),
                    e
                ));
                StaticCvePatterns.load().unwrap_or_default()
            }
        };

        let mut patterns = Vec::with_capacity(raw.len());
        for (id, pattern) in raw {
            match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                Ok(regex) => patterns.push(CompiledCvePattern { id, regex }),
                Err(e) => notes.push(format!("CVE pattern {} skipped: {}", id, e)),
            }
        }

        Self { patterns, notes }
    }

    /// Ids of every pattern matching `content`, in table order.
    pub fn hits(&self, content: &str) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|p| p.is_match(content))
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FailingSource;

    impl CvePatternSource for FailingSource {
        fn describe(&self) -> String {
            "test feed".to_string()
        }

        fn load(&self) -> Result<Vec<(String, String)>, ConfigError> {
            Err(ConfigError::Validation {
                message: "offline".to_string(),
            })
        }
    }

    #[test]
    fn test_static_table_hits() {
        let table = CveTable::resolve(&StaticCvePatterns);

        assert_eq!(table.len(), 3);
        assert!(table.notes().is_empty());
        assert_eq!(
            table.hits(r#"<a href="VBScript:foo ExecuteGlobal bar">"#),
            vec!["CVE-2018-8174"]
        );
        assert_eq!(table.hits("launch mshta.exe now"), vec!["CVE-2016-0189"]);
        assert_eq!(
            table.hits("new ActiveXObject('Shell.Application')"),
            vec!["CVE-2016-0189"]
        );
        assert_eq!(table.hits("embed swfobject.js"), vec!["CVE-2015-5122"]);
        assert!(table.hits("<p>benign</p>").is_empty());
    }

    #[test]
    fn test_failing_source_falls_back_with_note() {
        let table = CveTable::resolve(&FailingSource);

        assert_eq!(table.len(), 3);
        assert_eq!(table.notes().len(), 1);
        assert!(table.notes()[0].contains("test feed unavailable"));
    }

    #[test]
    fn test_inline_patterns_replace_static() {
        let source = InlineCvePatterns::new(vec![(
            "CVE-2099-0001".to_string(),
            r"evil\s+payload".to_string(),
        )]);
        let table = CveTable::resolve(&source);

        assert_eq!(table.len(), 1);
        assert_eq!(table.hits("EVIL   PAYLOAD"), vec!["CVE-2099-0001"]);
        assert!(table.hits("mshta.exe").is_empty());
    }

    #[test]
    fn test_invalid_inline_pattern_is_skipped() {
        let source = InlineCvePatterns::new(vec![
            ("CVE-1".to_string(), "([bad".to_string()),
            ("CVE-2".to_string(), "good".to_string()),
        ]);
        let table = CveTable::resolve(&source);

        assert_eq!(table.len(), 1);
        assert_eq!(table.notes().len(), 1);
    }

    #[test]
    fn test_feed_file_derives_patterns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "CVE-2020-0001", "summary": "Crafted VBScript leads to RCE"},
                {"id": "CVE-2020-0002", "summary": "Heap overflow in Adobe Flash Player"},
                {"id": "CVE-2020-0003", "summary": "Unrelated parser bug"},
                {"summary": "No identifier, mentions mshta"}
            ]"#,
        )
        .unwrap();

        let feed = CveFeedFile::new(&path);
        let raw = feed.load().unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].0, "CVE-2020-0001");
        assert_eq!(raw[1].1, r"Adobe\s?Flash|flashplayer|SWFObject");

        let table = CveTable::resolve(&feed);
        assert_eq!(table.hits("<embed src=flashplayer.swf>"), vec!["CVE-2020-0002"]);
    }

    #[test]
    fn test_feed_last_heuristic_wins() {
        let records = vec![FeedRecord {
            id: Some("CVE-X".to_string()),
            summary: "vbscript via mshta".to_string(),
        }];
        let patterns = derive_patterns(&records);
        assert_eq!(patterns, vec![("CVE-X".to_string(), r"mshta\.exe".to_string())]);
    }

    #[test]
    fn test_missing_feed_file_falls_back() {
        let feed = CveFeedFile::new("/nonexistent/cve-feed.json");
        assert!(matches!(feed.load(), Err(ConfigError::ReadFeed { .. })));

        let table = CveTable::resolve(&feed);
        assert_eq!(table.len(), 3);
        assert_eq!(table.notes().len(), 1);
    }

    #[test]
    fn test_malformed_feed_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(&path, "{ not json").unwrap();

        let table = CveTable::resolve(&CveFeedFile::new(&path));
        assert_eq!(table.len(), 3);
        assert_eq!(table.notes().len(), 1);
    }
}
