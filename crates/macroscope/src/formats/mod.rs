//! Primitive parsers for the container formats the analyzers and extractors
//! inspect. Nothing in here trusts its input: every length and offset read
//! from a file is bounds-checked before use.

pub mod ole;
pub mod ooxml;
pub mod pdf;
pub mod rtf;
pub mod vba;

use thiserror::Error;

/// Upper bound on any single stream or zip entry we will buffer.
pub const MAX_STREAM_SIZE: u64 = 64 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("OLE container error: {0}")]
    Ole(#[source] std::io::Error),

    #[error("zip container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("PDF parse error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF structure error: {0}")]
    PdfStructure(String),

    #[error("XML parse error in '{part}': {message}")]
    Xml { part: String, message: String },

    #[error("VBA project error: {0}")]
    Vba(String),

    #[error("stream '{name}' exceeds {limit} bytes")]
    TooLarge { name: String, limit: u64 },
}
