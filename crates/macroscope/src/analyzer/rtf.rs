use crate::analyzer::DocumentAnalyzer;
use crate::findings::Findings;
use crate::formats::rtf;

/// Static RTF signatures; the content is treated as text.
#[derive(Debug, Default)]
pub struct RtfAnalyzer;

impl DocumentAnalyzer for RtfAnalyzer {
    fn categories(&self) -> &'static [&'static str] {
        &["exploits", "objects"]
    }

    fn analyze(&self, data: &[u8], findings: &mut Findings) {
        let text = String::from_utf8_lossy(data).to_lowercase();

        // Equation Editor stack overflow (CVE-2017-11882)
        if text.contains("objupdate") && text.contains("eqnedt32") {
            findings.push("exploits", "CVE-2017-11882 signature detected");
        }
        if text.contains("\\objdata") {
            findings.push("exploits", "Embedded OLE object detected");
        }

        for class in rtf::object_classes(data) {
            findings.push("objects", format!("objclass: {}", class));
        }
    }
}
