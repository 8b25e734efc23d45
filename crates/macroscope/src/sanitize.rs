//! Helpers for sanitizing untrusted names before they touch the filesystem
//! or tracing span attributes.
//!
//! Embedded stream names and declared attachment names come straight from
//! attacker-controlled containers, so they are always reduced to a single
//! path component before being joined to an output directory.

use std::path::Path;

/// Name used when nothing usable survives sanitation.
const FALLBACK_NAME: &str = "artifact";

/// Longest file name we will ask the filesystem to create.
const MAX_NAME_LEN: usize = 200;

/// Returns only the filename component of a path (no directory).
///
/// Used for span fields so logs never carry full paths.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Reduces an untrusted name to a safe base name.
///
/// - `../../etc/passwd` → `passwd`
/// - `C:\Windows\evil.exe` → `evil.exe`
/// - `\u{1}Ole10Native` → `Ole10Native`
/// - `..` / empty → `artifact`
pub fn safe_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");

    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != ':')
        .take(MAX_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return FALLBACK_NAME.to_string();
    }

    cleaned.to_string()
}

/// Truncates `text` to at most `limit` characters (not bytes).
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
