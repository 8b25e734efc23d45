use crate::error::ExtractError;
use crate::formats::pdf as pdfobj;

use super::{ExtractionMethod, Payload};

/// Each EmbeddedFiles leaf under its declared name.
pub fn extract(data: &[u8]) -> Result<Vec<Payload>, ExtractError> {
    let doc = pdfobj::load(data)?;
    let mut payloads = Vec::new();

    for file in pdfobj::embedded_files(&doc) {
        match file.content {
            Ok(content) => payloads.push(Payload::new(
                file.name,
                content,
                ExtractionMethod::PdfEmbeddedFile,
            )),
            Err(e) => tracing::warn!(error = %e, "skipping embedded file"),
        }
    }
    Ok(payloads)
}
