use std::path::Path;

use serde_json::{Map, Value};

use crate::document::{OLE_MAGIC, ZIP_MAGIC};
use crate::error::PluginError;
use crate::formats::{ole, ooxml, pdf as pdfobj};

use super::Plugin;

pub fn ole_macro_plugin() -> Box<dyn Plugin> {
    Box::new(OleMacroPlugin)
}

pub fn pdf_js_plugin() -> Box<dyn Plugin> {
    Box::new(PdfJsPlugin)
}

pub fn sample_plugin() -> Box<dyn Plugin> {
    Box::new(SamplePlugin)
}

fn read(path: &Path) -> Result<Vec<u8>, PluginError> {
    std::fs::read(path).map_err(|e| PluginError::Failed(format!("cannot read input: {}", e)))
}

fn entry(key: &str, value: impl Into<Value>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value.into());
    map
}

/// Reports whether the file carries a VBA project, in an OLE container or
/// in an OOXML `vbaProject.bin` part.
pub struct OleMacroPlugin;

impl OleMacroPlugin {
    fn has_macros(data: &[u8]) -> Result<bool, PluginError> {
        if data.starts_with(OLE_MAGIC) {
            let file = ole::open(data).map_err(|e| PluginError::Failed(e.to_string()))?;
            return Ok(!ole::vba_project_roots(&file).is_empty());
        }
        if data.starts_with(ZIP_MAGIC) {
            let mut archive = ooxml::open(data).map_err(|e| PluginError::Failed(e.to_string()))?;
            let names = ooxml::entry_names(&mut archive);
            return Ok(!ooxml::vba_project_entries(&names).is_empty());
        }
        Ok(false)
    }
}

impl Plugin for OleMacroPlugin {
    fn name(&self) -> &'static str {
        "ole_macro_plugin"
    }

    fn run(&self, path: &Path) -> Result<Map<String, Value>, PluginError> {
        let found = Self::has_macros(&read(path)?)?;
        Ok(entry("ole_macros", found))
    }
}

/// Reports whether the PDF catalog declares a JavaScript name tree.
pub struct PdfJsPlugin;

impl Plugin for PdfJsPlugin {
    fn name(&self) -> &'static str {
        "pdf_js_plugin"
    }

    fn run(&self, path: &Path) -> Result<Map<String, Value>, PluginError> {
        let doc = pdfobj::load(&read(path)?).map_err(|e| PluginError::Failed(e.to_string()))?;
        let found = pdfobj::names_subtree(&doc, b"JavaScript").is_some();
        Ok(entry("js_found", found))
    }
}

pub struct SamplePlugin;

impl Plugin for SamplePlugin {
    fn name(&self) -> &'static str {
        "sample_plugin"
    }

    fn run(&self, _path: &Path) -> Result<Map<String, Value>, PluginError> {
        Ok(entry("plugin", "sample"))
    }
}
