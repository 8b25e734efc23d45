//! VBA project decoding: the MS-OVBA compression container, the `dir`
//! stream record layout, and module source recovery.

use std::io::{Read, Seek};
use std::path::Path;

use cfb::CompoundFile;

use super::{ole, FormatError};

const SIGNATURE_BYTE: u8 = 0x01;
const CHUNK_SIZE: usize = 4096;

const PROJECTVERSION: u16 = 0x0009;
const PROJECTMODULES_END: u16 = 0x0010;
const MODULENAME: u16 = 0x0019;
const MODULESTREAMNAME: u16 = 0x001A;
const MODULETYPE_PROCEDURAL: u16 = 0x0021;
const MODULETYPE_DOCUMENT: u16 = 0x0022;
const MODULE_TERMINATOR: u16 = 0x002B;
const MODULEOFFSET: u16 = 0x0031;

/// Decompresses an MS-OVBA CompressedContainer.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    match data.first() {
        Some(&SIGNATURE_BYTE) => {}
        Some(other) => {
            return Err(FormatError::Vba(format!(
                "bad compression signature 0x{:02x}",
                other
            )))
        }
        None => return Err(FormatError::Vba("empty compressed container".to_string())),
    }

    let mut out = Vec::with_capacity(data.len() * 2);
    let mut pos = 1;

    while pos < data.len() {
        if pos + 2 > data.len() {
            return Err(FormatError::Vba("truncated chunk header".to_string()));
        }
        let header = u16::from_le_bytes([data[pos], data[pos + 1]]);
        let chunk_size = (header & 0x0FFF) as usize + 3;
        let compressed = header & 0x8000 != 0;
        let chunk_end = (pos + chunk_size).min(data.len());
        pos += 2;

        if !compressed {
            let end = (pos + CHUNK_SIZE).min(data.len());
            out.extend_from_slice(&data[pos..end]);
            pos = end;
            continue;
        }

        let chunk_start = out.len();
        while pos < chunk_end {
            let flags = data[pos];
            pos += 1;
            for bit in 0..8 {
                if pos >= chunk_end {
                    break;
                }
                if flags & (1 << bit) == 0 {
                    out.push(data[pos]);
                    pos += 1;
                    continue;
                }

                if pos + 2 > chunk_end {
                    return Err(FormatError::Vba("truncated copy token".to_string()));
                }
                let token = u16::from_le_bytes([data[pos], data[pos + 1]]);
                pos += 2;

                let difference = out.len() - chunk_start;
                let bit_count = copy_token_bit_count(difference);
                let length_mask = 0xFFFFu16 >> bit_count;
                let length = (token & length_mask) as usize + 3;
                let offset = (token >> (16 - bit_count)) as usize + 1;
                if offset > difference {
                    return Err(FormatError::Vba(format!(
                        "copy token offset {} outside decompressed chunk",
                        offset
                    )));
                }

                let source = out.len() - offset;
                for i in 0..length {
                    let byte = out[source + i];
                    out.push(byte);
                }
            }
            if out.len() - chunk_start > CHUNK_SIZE {
                return Err(FormatError::Vba("chunk decompresses past 4096 bytes".to_string()));
            }
        }
        pos = chunk_end;
    }

    Ok(out)
}

fn copy_token_bit_count(difference: usize) -> u32 {
    let mut bit_count = 4;
    while (1usize << bit_count) < difference {
        bit_count += 1;
    }
    bit_count.min(12)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Procedural,
    DocumentOrClass,
}

impl ModuleKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Procedural => "bas",
            Self::DocumentOrClass => "cls",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub name: String,
    pub stream_name: String,
    pub text_offset: usize,
    pub kind: ModuleKind,
}

impl ModuleRecord {
    fn new(name: String) -> Self {
        Self {
            stream_name: name.clone(),
            name,
            text_offset: 0,
            kind: ModuleKind::Procedural,
        }
    }

    /// `<module name>.<bas|cls>`
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.name, self.kind.extension())
    }
}

/// Walks the decompressed `dir` stream and collects module records.
pub fn parse_dir(dir: &[u8]) -> Result<Vec<ModuleRecord>, FormatError> {
    let mut modules = Vec::new();
    let mut current: Option<ModuleRecord> = None;
    let mut pos = 0;

    while pos + 6 <= dir.len() {
        let id = u16::from_le_bytes([dir[pos], dir[pos + 1]]);
        let size = u32::from_le_bytes([dir[pos + 2], dir[pos + 3], dir[pos + 4], dir[pos + 5]])
            as usize;
        pos += 6;

        // Reserved field carries 4, but Major (u32) and Minor (u16) follow.
        let size = if id == PROJECTVERSION { 6 } else { size };
        if size > dir.len() - pos {
            return Err(FormatError::Vba(format!(
                "dir record 0x{:04x} overruns stream",
                id
            )));
        }
        let body = &dir[pos..pos + size];
        pos += size;

        match id {
            MODULENAME => {
                if let Some(done) = current.take() {
                    modules.push(done);
                }
                current = Some(ModuleRecord::new(String::from_utf8_lossy(body).into_owned()));
            }
            MODULESTREAMNAME => {
                if let Some(module) = current.as_mut() {
                    module.stream_name = String::from_utf8_lossy(body).into_owned();
                }
            }
            MODULEOFFSET if body.len() >= 4 => {
                if let Some(module) = current.as_mut() {
                    module.text_offset =
                        u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
                }
            }
            MODULETYPE_PROCEDURAL => {
                if let Some(module) = current.as_mut() {
                    module.kind = ModuleKind::Procedural;
                }
            }
            MODULETYPE_DOCUMENT => {
                if let Some(module) = current.as_mut() {
                    module.kind = ModuleKind::DocumentOrClass;
                }
            }
            MODULE_TERMINATOR => {
                if let Some(done) = current.take() {
                    modules.push(done);
                }
            }
            PROJECTMODULES_END => break,
            _ => {}
        }
    }

    if let Some(done) = current.take() {
        modules.push(done);
    }
    Ok(modules)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbaModule {
    pub identifier: String,
    pub source: String,
}

/// Outcome of decoding one VBA project: recovered modules plus per-module
/// failures that did not prevent the rest from decoding.
#[derive(Debug, Default)]
pub struct VbaProject {
    pub modules: Vec<VbaModule>,
    pub errors: Vec<String>,
}

/// Decodes every module of the project stored under `root` (a `VBA`
/// storage).
pub fn read_project<F: Read + Seek>(
    ole: &mut CompoundFile<F>,
    root: &Path,
) -> Result<VbaProject, FormatError> {
    let dir = ole::read_stream(ole, &root.join("dir"))?;
    let records = parse_dir(&decompress(&dir)?)?;

    let mut project = VbaProject::default();
    for record in records {
        match read_module(ole, root, &record) {
            Ok(source) => project.modules.push(VbaModule {
                identifier: record.identifier(),
                source,
            }),
            Err(e) => project
                .errors
                .push(format!("{}: {}", record.identifier(), e)),
        }
    }
    Ok(project)
}

fn read_module<F: Read + Seek>(
    ole: &mut CompoundFile<F>,
    root: &Path,
    record: &ModuleRecord,
) -> Result<String, FormatError> {
    let stream = ole::read_stream(ole, &root.join(&record.stream_name))?;
    let compressed = stream.get(record.text_offset..).ok_or_else(|| {
        FormatError::Vba(format!(
            "text offset {} beyond stream of {} bytes",
            record.text_offset,
            stream.len()
        ))
    })?;
    let source = decompress(compressed)?;
    Ok(String::from_utf8_lossy(&source).into_owned())
}
