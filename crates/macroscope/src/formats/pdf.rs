//! PDF object-graph helpers on top of `lopdf`: catalog lookup, bounded
//! name-tree walks, string decoding and embedded-file payloads.

use std::collections::HashSet;
use std::io::Read;

use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::{FormatError, MAX_STREAM_SIZE};

/// Name-tree recursion bound.
pub const MAX_TREE_DEPTH: usize = 32;

const MAX_REFERENCE_HOPS: usize = 16;

/// pdfid-style keywords counted over the raw file bytes.
pub const KEYWORDS: &[&str] = &[
    "/JS",
    "/JavaScript",
    "/AA",
    "/OpenAction",
    "/Launch",
    "/EmbeddedFile",
    "/RichMedia",
    "/XFA",
    "/AcroForm",
    "/ObjStm",
    "/Encrypt",
];

pub fn load(data: &[u8]) -> Result<Document, FormatError> {
    Ok(Document::load_mem(data)?)
}

/// Follows indirect references until a direct object is reached.
pub fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_REFERENCE_HOPS {
        match obj {
            Object::Reference(id) => obj = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

pub fn get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|obj| resolve(doc, obj))
}

pub fn get_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    match get(doc, dict, key)? {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

pub fn catalog(doc: &Document) -> Option<&Dictionary> {
    get_dict(doc, &doc.trailer, b"Root")
}

/// The named subtree (`JavaScript`, `EmbeddedFiles`) of the catalog's
/// `/Names` dictionary, if present.
pub fn names_subtree<'a>(doc: &'a Document, subtree: &[u8]) -> Option<&'a Dictionary> {
    let names = get_dict(doc, catalog(doc)?, b"Names")?;
    get_dict(doc, names, subtree)
}

/// Leaves of a name tree as `(key, value)` pairs, value already resolved.
#[derive(Debug, Default)]
pub struct NameTreeLeaves<'a> {
    pub leaves: Vec<(String, &'a Object)>,
    /// Set when the depth bound or a repeated node cut the walk short.
    pub truncated: bool,
}

pub fn name_tree_leaves<'a>(doc: &'a Document, root: &'a Dictionary) -> NameTreeLeaves<'a> {
    let mut out = NameTreeLeaves::default();
    let mut visited = HashSet::new();
    walk_name_tree(doc, root, 0, &mut visited, &mut out);
    out
}

fn walk_name_tree<'a>(
    doc: &'a Document,
    node: &'a Dictionary,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    out: &mut NameTreeLeaves<'a>,
) {
    if depth >= MAX_TREE_DEPTH {
        out.truncated = true;
        return;
    }

    if let Some(Object::Array(pairs)) = get(doc, node, b"Names") {
        for pair in pairs.chunks(2) {
            let [key, value] = pair else {
                continue;
            };
            let Some(value) = resolve(doc, value) else {
                continue;
            };
            let key = resolve(doc, key).map(decode_object_text).unwrap_or_default();
            out.leaves.push((key, value));
        }
    }

    if let Some(Object::Array(kids)) = get(doc, node, b"Kids") {
        for kid in kids {
            if let Object::Reference(id) = kid {
                if !visited.insert(*id) {
                    out.truncated = true;
                    continue;
                }
            }
            if let Some(Object::Dictionary(child)) = resolve(doc, kid) {
                walk_name_tree(doc, child, depth + 1, visited, out);
            }
        }
    }
}

/// Decodes a PDF text string: UTF-16BE when it carries a BOM, otherwise
/// byte-per-char (PDFDocEncoding is a superset of Latin-1 for our purposes).
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Renders strings, names and streams as text; other objects as empty.
pub fn decode_object_text(obj: &Object) -> String {
    match obj {
        Object::String(bytes, _) => decode_text(bytes),
        Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
        Object::Stream(stream) => {
            String::from_utf8_lossy(&stream_content(stream).unwrap_or_default()).into_owned()
        }
        _ => String::new(),
    }
}

/// Stream payload with its filter chain applied.
///
/// Output above [`MAX_STREAM_SIZE`] is `TooLarge`. Any other decode
/// failure yields the raw stream bytes.
pub fn stream_content(stream: &lopdf::Stream) -> Result<Vec<u8>, FormatError> {
    let filters = filter_names(&stream.dict);
    let mut data = stream.content.clone();

    for (index, filter) in filters.iter().enumerate() {
        data = match decode_stage(filter, stage_parms(&stream.dict, index), data) {
            Ok(decoded) => decoded,
            Err(e @ FormatError::TooLarge { .. }) => return Err(e),
            Err(e) => {
                tracing::debug!(error = %e, "stream filter failed, keeping raw bytes");
                return Ok(stream.content.clone());
            }
        };
    }
    Ok(data)
}

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn stage_parms(dict: &Dictionary, index: usize) -> Option<Object> {
    match dict.get(b"DecodeParms").ok()? {
        Object::Array(items) => items
            .get(index)
            .filter(|parms| !matches!(parms, Object::Null))
            .cloned(),
        parms @ Object::Dictionary(_) if index == 0 => Some(parms.clone()),
        _ => None,
    }
}

/// One filter of a chain. Flate output is always inflated under the size
/// bound first; predictors and the other filters are left to `lopdf`.
fn decode_stage(
    filter: &[u8],
    parms: Option<Object>,
    data: Vec<u8>,
) -> Result<Vec<u8>, FormatError> {
    if matches!(filter, b"FlateDecode" | b"Fl") {
        let inflated = inflate_bounded(&data)?;
        if parms.is_none() {
            return Ok(inflated);
        }
    }

    let mut dict = Dictionary::new();
    dict.set("Filter", Object::Name(filter.to_vec()));
    if let Some(parms) = parms {
        dict.set("DecodeParms", parms);
    }
    let decoded = lopdf::Stream::new(dict, data).decompressed_content()?;
    if decoded.len() as u64 > MAX_STREAM_SIZE {
        return Err(too_large());
    }
    Ok(decoded)
}

/// zlib inflate that stops one byte past [`MAX_STREAM_SIZE`]. A corrupt
/// tail keeps whatever inflated before it.
fn inflate_bounded(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::new();
    let read = ZlibDecoder::new(data)
        .take(MAX_STREAM_SIZE + 1)
        .read_to_end(&mut out);

    if out.len() as u64 > MAX_STREAM_SIZE {
        return Err(too_large());
    }
    match read {
        Ok(_) => Ok(out),
        Err(_) if !out.is_empty() => Ok(out),
        Err(e) => Err(FormatError::PdfStructure(format!("FlateDecode: {}", e))),
    }
}

fn too_large() -> FormatError {
    FormatError::TooLarge {
        name: "PDF stream".to_string(),
        limit: MAX_STREAM_SIZE,
    }
}

/// Text of a resolved value that may be a string or a stream, following
/// references.
pub fn text_of(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj)? {
        resolved @ (Object::String(..) | Object::Stream(_) | Object::Name(_)) => {
            Some(decode_object_text(resolved))
        }
        _ => None,
    }
}

/// One entry of the EmbeddedFiles name tree.
#[derive(Debug)]
pub struct EmbeddedFile {
    pub name: String,
    pub content: Result<Vec<u8>, FormatError>,
}

pub fn embedded_files(doc: &Document) -> Vec<EmbeddedFile> {
    let Some(tree) = names_subtree(doc, b"EmbeddedFiles") else {
        return Vec::new();
    };

    name_tree_leaves(doc, tree)
        .leaves
        .into_iter()
        .map(|(key, spec)| match spec {
            Object::Dictionary(spec) => EmbeddedFile {
                name: file_spec_name(doc, spec).unwrap_or(key),
                content: file_spec_content(doc, spec),
            },
            _ => EmbeddedFile {
                name: key,
                content: Err(FormatError::PdfStructure(
                    "file specification is not a dictionary".to_string(),
                )),
            },
        })
        .collect()
}

fn file_spec_name(doc: &Document, spec: &Dictionary) -> Option<String> {
    [b"UF".as_slice(), b"F".as_slice()]
        .iter()
        .find_map(|key| spec.get(key).ok().and_then(|obj| text_of(doc, obj)))
        .filter(|name| !name.is_empty())
}

fn file_spec_content(doc: &Document, spec: &Dictionary) -> Result<Vec<u8>, FormatError> {
    let ef = get_dict(doc, spec, b"EF")
        .ok_or_else(|| FormatError::PdfStructure("file specification has no /EF".to_string()))?;
    let stream = [b"UF".as_slice(), b"F".as_slice()]
        .iter()
        .find_map(|key| match get(doc, ef, key) {
            Some(Object::Stream(stream)) => Some(stream),
            _ => None,
        })
        .ok_or_else(|| FormatError::PdfStructure("/EF holds no file stream".to_string()))?;
    stream_content(stream)
}

/// Counts name tokens from [`KEYWORDS`] in the raw bytes. A token only
/// counts when it is not immediately followed by another name character.
pub fn keyword_counts(data: &[u8]) -> Vec<(&'static str, usize)> {
    KEYWORDS
        .iter()
        .map(|keyword| {
            let needle = keyword.as_bytes();
            let count = data
                .windows(needle.len())
                .enumerate()
                .filter(|(i, window)| {
                    *window == needle
                        && data
                            .get(i + needle.len())
                            .map_or(true, |next| !next.is_ascii_alphanumeric())
                })
                .count();
            (*keyword, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect()
}
