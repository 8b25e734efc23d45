pub mod office;
pub mod pdf;
pub mod rtf;

use std::path::PathBuf;

use serde::Serialize;

use crate::document::{Document, DocumentKind};
use crate::error::ExtractError;
use crate::guard;
use crate::sanitize::redact_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    OleNative,
    OoxmlEmbedding,
    PdfEmbeddedFile,
    RtfObjdata,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OleNative => "ole_native",
            Self::OoxmlEmbedding => "ooxml_embedding",
            Self::PdfEmbeddedFile => "pdf_embedded_file",
            Self::RtfObjdata => "rtf_objdata",
        }
    }
}

/// An embedded object pulled out of a container, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Name the container declares or implies; sanitized only when stored.
    pub name: String,
    pub content: Vec<u8>,
    pub method: ExtractionMethod,
}

impl Payload {
    pub fn new(name: impl Into<String>, content: Vec<u8>, method: ExtractionMethod) -> Self {
        Self {
            name: name.into(),
            content,
            method,
        }
    }
}

/// A payload written into the session output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArtifact {
    pub path: PathBuf,
    pub source: PathBuf,
    pub method: ExtractionMethod,
}

/// Pulls embedded payloads out of a container, one variant per kind that
/// can carry them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    Office,
    Pdf,
    Rtf,
    None,
}

impl Extractor {
    pub fn for_kind(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Office => Self::Office,
            DocumentKind::Pdf => Self::Pdf,
            DocumentKind::Rtf => Self::Rtf,
            DocumentKind::Html | DocumentKind::OneNote | DocumentKind::Unknown => Self::None,
        }
    }

    /// Every embedded payload of `data`, in container order.
    ///
    /// Best effort: a malformed container or a parser panic is logged and
    /// yields an empty list.
    pub fn extract(&self, document: &Document, data: &[u8]) -> Vec<Payload> {
        if *self == Self::None {
            return Vec::new();
        }

        let file = redact_path(document.path());
        match guard::contain(|| self.try_extract(data)) {
            Ok(Ok(payloads)) => payloads,
            Ok(Err(e)) => {
                tracing::warn!(file = %file, error = %e, "extraction failed");
                Vec::new()
            }
            Err(panic) => {
                tracing::warn!(file = %file, panic = %panic, "extractor panicked");
                Vec::new()
            }
        }
    }

    fn try_extract(&self, data: &[u8]) -> Result<Vec<Payload>, ExtractError> {
        match self {
            Self::Office => office::extract(data),
            Self::Pdf => pdf::extract(data),
            Self::Rtf => rtf::extract(data),
            Self::None => Ok(Vec::new()),
        }
    }
}
