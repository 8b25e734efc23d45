//! Document classification: extension lookup first, content sniffing second.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// OLE / Compound File Binary signature.
pub const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Local file header of a zip archive.
pub const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// OneNote section file GUID {7B5C52E4-D88C-4DA7-AEB1-5378D02996D3} as stored on disk.
pub const ONENOTE_GUID: &[u8] = &[
    0xE4, 0x52, 0x5C, 0x7B, 0x8C, 0xD8, 0xA7, 0x4D, 0xAE, 0xB1, 0x53, 0x78, 0xD0, 0x29, 0x96, 0xD3,
];

pub const ONENOTE_LITERAL: &[u8] = b"OneNote";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Office,
    Pdf,
    Rtf,
    Html,
    OneNote,
    Unknown,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "doc" | "dot" | "docx" | "docm" | "dotm" | "xls" | "xlt" | "xlsx" | "xlsm" | "xlsb"
            | "ppt" | "pps" | "pptx" | "pptm" | "ppsm" => Some(Self::Office),
            "pdf" => Some(Self::Pdf),
            "rtf" => Some(Self::Rtf),
            "htm" | "html" | "hta" | "xhtml" => Some(Self::Html),
            "one" => Some(Self::OneNote),
            _ => None,
        }
    }

    /// Guess the kind from the leading bytes of a file.
    pub fn sniff(window: &[u8]) -> Self {
        if contains(window, b"%PDF") {
            return Self::Pdf;
        }
        if is_rtf(window) {
            return Self::Rtf;
        }
        if window.starts_with(OLE_MAGIC) {
            return Self::Office;
        }
        if window.starts_with(ZIP_MAGIC) && contains(window, b"[Content_Types].xml") {
            return Self::Office;
        }
        if window.starts_with(ONENOTE_GUID) || contains(window, ONENOTE_LITERAL) {
            return Self::OneNote;
        }
        let lowered = window.to_ascii_lowercase();
        if [&b"<html"[..], b"<!doctype html", b"<script"]
            .iter()
            .any(|marker| contains(&lowered, marker))
        {
            return Self::Html;
        }
        Self::Unknown
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Office => "Office",
            Self::Pdf => "PDF",
            Self::Rtf => "RTF",
            Self::Html => "HTML",
            Self::OneNote => "OneNote",
            Self::Unknown => "unknown",
        }
    }
}

/// An input file together with its kind. The kind is derived once, here,
/// and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    kind: DocumentKind,
}

impl Document {
    /// The kind comes from `path` as given; the stored path is canonical
    /// when the file exists.
    pub fn classify(path: &Path, sniff_window: usize) -> Self {
        let by_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(DocumentKind::from_extension);

        let kind = match by_extension {
            Some(kind) => kind,
            None => match read_window(path, sniff_window) {
                Ok(window) => DocumentKind::sniff(&window),
                Err(e) => {
                    tracing::debug!(error = %e, "content sniffing failed");
                    DocumentKind::Unknown
                }
            },
        };

        Self {
            path: path.canonicalize().unwrap_or_else(|_| path.to_path_buf()),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }
}

/// Reads at most `limit` leading bytes of a file.
pub fn read_window(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut window = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64).read_to_end(&mut window)?;
    Ok(window)
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn is_rtf(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    data[start..].starts_with(b"{\\rtf")
}
