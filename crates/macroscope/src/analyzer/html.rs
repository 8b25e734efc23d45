use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use crate::analyzer::DocumentAnalyzer;
use crate::config::HtmlConfig;
use crate::document::{OLE_MAGIC, ZIP_MAGIC};
use crate::findings::Findings;
use crate::sanitize::preview;
use crate::signatures::{
    CveFeedFile, CvePatternSource, CveTable, InlineCvePatterns, SignatureEngine,
    StaticCvePatterns,
};

static RE_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?>(.*?)</script>").unwrap());
static RE_DATA_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data:([^;]+);base64,([A-Za-z0-9+/=]+)").unwrap());
static RE_EVAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"eval\s*\(|unescape\s*\(").unwrap());
static RE_FROM_CHAR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"String\.fromCharCode").unwrap());

/// Calls that decode or evaluate strings at runtime.
const SCRIPT_MARKERS: &[&str] = &["atob(", "eval(", "blob:"];

pub struct HtmlAnalyzer {
    preview_length: usize,
    keywords: Vec<String>,
    exploit_kits: Vec<String>,
    cve_table: CveTable,
    signatures: Option<SignatureEngine>,
}

impl HtmlAnalyzer {
    pub fn new(
        preview_length: usize,
        keywords: Vec<String>,
        exploit_kits: Vec<String>,
        cve_source: &dyn CvePatternSource,
        signatures: Option<SignatureEngine>,
    ) -> Self {
        Self {
            preview_length,
            keywords,
            exploit_kits,
            cve_table: CveTable::resolve(cve_source),
            signatures,
        }
    }

    /// Picks the CVE source: a feed file first, then inline patterns, then
    /// the built-in table.
    pub fn from_config(config: &HtmlConfig, preview_length: usize) -> Self {
        let source: Box<dyn CvePatternSource> = match (&config.cve_feed, &config.cve_patterns) {
            (Some(feed), _) => Box::new(CveFeedFile::new(feed)),
            (None, inline) if !inline.is_empty() => Box::new(InlineCvePatterns::new(
                inline.iter().map(|(id, p)| (id.clone(), p.clone())),
            )),
            _ => Box::new(StaticCvePatterns),
        };

        Self::new(
            preview_length,
            config.suspicious_keywords.clone(),
            config.exploit_kits.clone(),
            source.as_ref(),
            SignatureEngine::from_rules(&config.signature_rules),
        )
    }

    fn scan_scripts(&self, content: &str, findings: &mut Findings) {
        for caps in RE_SCRIPT.captures_iter(content) {
            let body = caps.get(1).map_or("", |m| m.as_str());
            if SCRIPT_MARKERS.iter().any(|m| body.contains(m)) {
                findings.push("suspicious_scripts", preview(body, self.preview_length));
            }
        }
    }

    fn scan_blobs(&self, content: &str, findings: &mut Findings) {
        for caps in RE_DATA_URI.captures_iter(content) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            findings.push("suspicious_blobs", preview(whole.as_str(), self.preview_length));

            let mime = caps.get(1).map_or("", |m| m.as_str());
            let encoded = caps.get(2).map_or("", |m| m.as_str());
            if let Ok(decoded) = STANDARD.decode(encoded) {
                if let Some(label) = payload_label(&decoded) {
                    findings.push(
                        "blob_payloads",
                        format!("{}: {} ({} bytes)", preview(mime, 64), label, decoded.len()),
                    );
                }
            }
        }
    }
}

/// Names executable or container payloads smuggled in a data URI.
fn payload_label(decoded: &[u8]) -> Option<&'static str> {
    if decoded.starts_with(b"MZ") {
        Some("PE executable")
    } else if decoded.starts_with(OLE_MAGIC) {
        Some("OLE compound file")
    } else if decoded.starts_with(b"%PDF") {
        Some("PDF document")
    } else if decoded.starts_with(ZIP_MAGIC) {
        Some("zip archive")
    } else {
        None
    }
}

impl DocumentAnalyzer for HtmlAnalyzer {
    fn categories(&self) -> &'static [&'static str] {
        &[
            "suspicious_scripts",
            "suspicious_blobs",
            "blob_payloads",
            "suspicious_strings",
            "cve_hits",
            "signature_matches",
            "obfuscation",
            "exploit_kit",
        ]
    }

    fn analyze(&self, data: &[u8], findings: &mut Findings) {
        let content = String::from_utf8_lossy(data);
        let lowered = content.to_lowercase();

        self.scan_scripts(&content, findings);
        self.scan_blobs(&content, findings);

        for keyword in &self.keywords {
            if content.contains(keyword.as_str()) {
                findings.push("suspicious_strings", keyword.clone());
            }
        }

        if RE_EVAL.is_match(&content) {
            findings.push("obfuscation", "eval/unescape usage");
        }
        if RE_FROM_CHAR_CODE.is_match(&content) {
            findings.push("obfuscation", "String.fromCharCode usage");
        }

        for kit in &self.exploit_kits {
            if lowered.contains(&kit.to_lowercase()) {
                findings.push_unique("exploit_kit", kit.clone());
            }
        }

        for note in self.cve_table.notes() {
            findings.error(note.clone());
        }
        for id in self.cve_table.hits(&content) {
            findings.push("cve_hits", id);
        }

        if let Some(engine) = &self.signatures {
            for id in engine.scan(&content) {
                findings.push("signature_matches", id);
            }
        }
    }
}
