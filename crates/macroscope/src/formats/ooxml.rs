//! Office Open XML (zip) containers: embedded VBA projects, external
//! relationships and the `embeddings/` folder.

use std::io::{Cursor, Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use super::{FormatError, MAX_STREAM_SIZE};

pub type OoxmlArchive<'a> = ZipArchive<Cursor<&'a [u8]>>;

pub fn open(data: &[u8]) -> Result<OoxmlArchive<'_>, FormatError> {
    Ok(ZipArchive::new(Cursor::new(data))?)
}

/// Entry names in central-directory order.
pub fn entry_names<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Vec<String> {
    (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
        .collect()
}

pub fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, FormatError> {
    let file = archive.by_name(name)?;
    if file.size() > MAX_STREAM_SIZE {
        return Err(FormatError::TooLarge {
            name: name.to_string(),
            limit: MAX_STREAM_SIZE,
        });
    }
    let mut data = Vec::with_capacity(file.size() as usize);
    file.take(MAX_STREAM_SIZE)
        .read_to_end(&mut data)
        .map_err(|e| FormatError::Zip(e.into()))?;
    Ok(data)
}

/// Entries holding a binary VBA project (`word/vbaProject.bin` and friends).
pub fn vba_project_entries(names: &[String]) -> Vec<&str> {
    names
        .iter()
        .filter(|n| n.to_lowercase().ends_with("vbaproject.bin"))
        .map(String::as_str)
        .collect()
}

/// Files stored under an `embeddings/` folder (`word/embeddings/oleObject1.bin`).
pub fn embedding_entries(names: &[String]) -> Vec<&str> {
    names
        .iter()
        .filter(|n| !n.ends_with('/'))
        .filter(|n| {
            let lowered = n.to_lowercase();
            lowered.starts_with("embeddings/") || lowered.contains("/embeddings/")
        })
        .map(String::as_str)
        .collect()
}

pub fn relationship_parts(names: &[String]) -> Vec<&str> {
    names
        .iter()
        .filter(|n| n.to_lowercase().ends_with(".rels"))
        .map(String::as_str)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub kind: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Last path segment of the relationship type URI
    /// (`.../relationships/attachedTemplate` → `attachedTemplate`).
    pub fn type_tail(&self) -> &str {
        self.kind.rsplit('/').next().unwrap_or(&self.kind)
    }
}

pub fn parse_relationships(part: &str, xml: &[u8]) -> Result<Vec<Relationship>, FormatError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut relationships = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut rel = Relationship {
                    kind: String::new(),
                    target: String::new(),
                    external: false,
                };
                for attr in e.attributes().flatten() {
                    let raw = String::from_utf8_lossy(&attr.value);
                    let value = quick_xml::escape::unescape(&raw)
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| raw.to_string());
                    match attr.key.local_name().as_ref() {
                        b"Type" => rel.kind = value,
                        b"Target" => rel.target = value,
                        b"TargetMode" => rel.external = value.eq_ignore_ascii_case("External"),
                        _ => {}
                    }
                }
                relationships.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FormatError::Xml {
                    part: part.to_string(),
                    message: e.to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}
