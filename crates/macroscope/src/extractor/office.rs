use crate::document::ZIP_MAGIC;
use crate::error::ExtractError;
use crate::formats::{ole, ooxml};

use super::{ExtractionMethod, Payload};

pub fn extract(data: &[u8]) -> Result<Vec<Payload>, ExtractError> {
    if data.starts_with(ZIP_MAGIC) {
        extract_embeddings(data)
    } else {
        extract_native_objects(data)
    }
}

/// `\x01Ole10Native` streams, raw.
fn extract_native_objects(data: &[u8]) -> Result<Vec<Payload>, ExtractError> {
    let mut file = ole::open(data)?;
    let mut payloads = Vec::new();

    for stream in ole::native_object_streams(&file) {
        let content = match ole::read_stream(&mut file, &stream) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(stream = %stream.display(), error = %e, "skipping native object");
                continue;
            }
        };
        payloads.push(Payload::new(
            ole::flatten_stream_path(&stream),
            content,
            ExtractionMethod::OleNative,
        ));
    }
    Ok(payloads)
}

/// Files under an OOXML `embeddings/` folder.
fn extract_embeddings(data: &[u8]) -> Result<Vec<Payload>, ExtractError> {
    let mut archive = ooxml::open(data)?;
    let names = ooxml::entry_names(&mut archive);
    let mut payloads = Vec::new();

    for entry in ooxml::embedding_entries(&names) {
        let content = match ooxml::read_entry(&mut archive, entry) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(entry, error = %e, "skipping embedding");
                continue;
            }
        };
        payloads.push(Payload::new(entry, content, ExtractionMethod::OoxmlEmbedding));
    }
    Ok(payloads)
}
