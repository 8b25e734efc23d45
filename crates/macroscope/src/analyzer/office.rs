use serde_json::json;

use crate::analyzer::DocumentAnalyzer;
use crate::document::{OLE_MAGIC, ZIP_MAGIC};
use crate::findings::Findings;
use crate::formats::vba::VbaProject;
use crate::formats::{ole, ooxml, vba, FormatError};
use crate::sanitize::preview;

/// Entry points Office runs without user interaction.
const AUTOEXEC_KEYWORDS: &[&str] = &["autoopen", "document_open", "workbook_open", "auto_close"];

const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "shell.application",
    "wscript.shell",
    "powershell",
    "cmd.exe",
    "base64decode",
];

pub struct OfficeAnalyzer {
    preview_length: usize,
}

impl OfficeAnalyzer {
    pub fn new(preview_length: usize) -> Self {
        Self { preview_length }
    }

    fn inspect_ole(&self, data: &[u8], findings: &mut Findings) -> Result<(), FormatError> {
        let mut file = ole::open(data)?;
        for root in ole::vba_project_roots(&file) {
            match vba::read_project(&mut file, &root) {
                Ok(project) => self.record_project(project, findings),
                Err(e) => findings.error(format!("VBA project {}: {}", root.display(), e)),
            }
        }
        Ok(())
    }

    fn inspect_ooxml(&self, data: &[u8], findings: &mut Findings) -> Result<(), FormatError> {
        let mut archive = ooxml::open(data)?;
        let names = ooxml::entry_names(&mut archive);

        for entry in ooxml::vba_project_entries(&names) {
            let outcome = ooxml::read_entry(&mut archive, entry)
                .and_then(|bytes| self.inspect_ole(&bytes, findings));
            if let Err(e) = outcome {
                findings.error(format!("{}: {}", entry, e));
            }
        }

        for part in ooxml::relationship_parts(&names) {
            let outcome = ooxml::read_entry(&mut archive, part)
                .and_then(|xml| ooxml::parse_relationships(part, &xml));
            match outcome {
                Ok(relationships) => {
                    for rel in relationships.iter().filter(|r| r.external) {
                        findings.push(
                            "external_relationships",
                            format!("{}: {} -> {}", part, rel.type_tail(), rel.target),
                        );
                    }
                }
                Err(e) => findings.error(e.to_string()),
            }
        }
        Ok(())
    }

    fn record_project(&self, project: VbaProject, findings: &mut Findings) {
        for module in project.modules {
            let lowered = module.source.to_lowercase();
            findings.push(
                "macros",
                json!({
                    "filename": module.identifier,
                    "code": preview(&module.source, self.preview_length),
                }),
            );
            if AUTOEXEC_KEYWORDS.iter().any(|k| lowered.contains(k)) {
                findings.push("autoexec", module.identifier.clone());
            }
            if SUSPICIOUS_KEYWORDS.iter().any(|k| lowered.contains(k)) {
                findings.push("suspicious", module.identifier.clone());
            }
        }
        for error in project.errors {
            findings.error(error);
        }
    }
}

impl DocumentAnalyzer for OfficeAnalyzer {
    fn categories(&self) -> &'static [&'static str] {
        &["macros", "autoexec", "suspicious", "external_relationships"]
    }

    fn analyze(&self, data: &[u8], findings: &mut Findings) {
        let outcome = if data.starts_with(OLE_MAGIC) {
            self.inspect_ole(data, findings)
        } else if data.starts_with(ZIP_MAGIC) {
            self.inspect_ooxml(data, findings)
        } else {
            findings.error("Not an OLE or OOXML container");
            return;
        };

        if let Err(e) = outcome {
            findings.error(e.to_string());
        }
    }
}
