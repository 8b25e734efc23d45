//! Fixture builders that synthesize real containers in memory.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use cfb::CompoundFile;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Literal-only MS-OVBA compressed container.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0x01u8];
    for chunk in data.chunks(3000) {
        let mut body = Vec::new();
        for group in chunk.chunks(8) {
            body.push(0u8);
            body.extend_from_slice(group);
        }
        let header = 0xB000u16 | ((body.len() + 2 - 3) as u16 & 0x0FFF);
        out.extend_from_slice(&header.to_le_bytes());
        out.extend_from_slice(&body);
    }
    out
}

/// One `dir` stream record.
pub fn record(id: u16, body: &[u8]) -> Vec<u8> {
    let mut out = id.to_le_bytes().to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}

fn finish(mut ole: CompoundFile<Cursor<Vec<u8>>>) -> Vec<u8> {
    ole.flush().unwrap();
    ole.into_inner().into_inner()
}

fn create_storages(ole: &mut CompoundFile<Cursor<Vec<u8>>>, root: &str) {
    let mut path = String::new();
    for part in root.trim_start_matches('/').split('/') {
        path.push('/');
        path.push_str(part);
        ole.create_storage(&path).unwrap();
    }
}

/// OLE document carrying a VBA project under `root` (e.g. `/Macros/VBA`)
/// with one procedural module per `(name, source)`.
pub fn vba_document(root: &str, modules: &[(&str, &str)]) -> Vec<u8> {
    let mut ole = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    create_storages(&mut ole, root);

    let mut dir = Vec::new();
    for (name, _) in modules {
        dir.extend(record(0x0019, name.as_bytes()));
        dir.extend(record(0x001A, name.as_bytes()));
        dir.extend(record(0x0031, &0u32.to_le_bytes()));
        dir.extend(record(0x0021, b""));
        dir.extend(record(0x002B, b""));
    }
    dir.extend(record(0x0010, b""));
    ole.create_stream(format!("{}/dir", root))
        .unwrap()
        .write_all(&compress(&dir))
        .unwrap();

    for (name, source) in modules {
        ole.create_stream(format!("{}/{}", root, name))
            .unwrap()
            .write_all(&compress(source.as_bytes()))
            .unwrap();
    }
    finish(ole)
}

/// OLE document with a single `/ObjectPool/_1/\x01Ole10Native` stream.
pub fn ole_with_native(payload: &[u8]) -> Vec<u8> {
    let mut ole = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    create_storages(&mut ole, "/ObjectPool/_1");
    ole.create_stream("/ObjectPool/_1/\u{1}Ole10Native")
        .unwrap()
        .write_all(payload)
        .unwrap();
    finish(ole)
}

/// Native object nested `depth` times inside itself. Every level extracts
/// to the same artifact name, so recursion keeps hitting one path.
pub fn nested_native(depth: usize, innermost: &[u8]) -> Vec<u8> {
    let mut data = innermost.to_vec();
    for _ in 0..depth {
        data = ole_with_native(&data);
    }
    data
}

/// OOXML package with `[Content_Types].xml` plus the given entries.
pub fn ooxml(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer
        .write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn literal(text: &str) -> Object {
    Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
}

/// Saves a one-page-tree PDF whose catalog gets `names` when given.
fn save_pdf(mut doc: Document, names: Option<Dictionary>) -> Vec<u8> {
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<Object>::new(),
        "Count" => 0,
    });
    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if let Some(names) = names {
        catalog.set("Names", names);
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Structurally valid PDF with no `/Names` dictionary.
pub fn plain_pdf() -> Vec<u8> {
    save_pdf(Document::with_version("1.5"), None)
}

/// PDF whose JavaScript name tree holds one script.
pub fn pdf_with_javascript(script: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let action_id = doc.add_object(dictionary! {
        "S" => "JavaScript",
        "JS" => literal(script),
    });
    let tree_id = doc.add_object(dictionary! {
        "Names" => vec![literal("startup"), action_id.into()],
    });
    save_pdf(doc, Some(dictionary! { "JavaScript" => tree_id }))
}

/// PDF with one attachment under `declared_name`.
pub fn pdf_with_attachment(declared_name: &str, content: &[u8]) -> Vec<u8> {
    pdf_with_attachment_streams(vec![(
        declared_name,
        Stream::new(dictionary! {}, content.to_vec()),
    )])
}

/// PDF whose EmbeddedFiles tree holds one leaf per `(declared name, file
/// stream)`, in order.
pub fn pdf_with_attachment_streams(files: Vec<(&str, Stream)>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let mut leaves = Vec::new();
    for (index, (declared_name, stream)) in files.into_iter().enumerate() {
        let file_id = doc.add_object(stream);
        let spec_id = doc.add_object(dictionary! {
            "Type" => "Filespec",
            "F" => literal(declared_name),
            "EF" => dictionary! { "F" => file_id },
        });
        leaves.push(literal(&format!("attachment{}", index + 1)));
        leaves.push(spec_id.into());
    }
    let tree_id = doc.add_object(dictionary! { "Names" => leaves });
    save_pdf(doc, Some(dictionary! { "EmbeddedFiles" => tree_id }))
}

/// FlateDecode stream that inflates to `len` zero bytes.
pub fn flate_zeros(len: u64) -> Stream {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    let chunk = vec![0u8; 1 << 20];
    let mut left = len;
    while left > 0 {
        let n = left.min(chunk.len() as u64) as usize;
        encoder.write_all(&chunk[..n]).unwrap();
        left -= n as u64;
    }
    Stream::new(
        dictionary! { "Filter" => "FlateDecode" },
        encoder.finish().unwrap(),
    )
}

/// RTF with one `\objdata` group carrying `payload` as hex.
pub fn rtf_with_objdata(payload: &[u8]) -> Vec<u8> {
    format!(
        "{{\\rtf1{{\\object\\objemb{{\\*\\objclass Package}}{{\\*\\objdata {}}}}}}}",
        hex::encode_upper(payload)
    )
    .into_bytes()
}
