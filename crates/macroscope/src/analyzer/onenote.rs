use crate::analyzer::DocumentAnalyzer;
use crate::document::{contains, ONENOTE_GUID, ONENOTE_LITERAL};
use crate::findings::Findings;

pub struct OneNoteAnalyzer {
    window: usize,
}

impl OneNoteAnalyzer {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

impl DocumentAnalyzer for OneNoteAnalyzer {
    fn categories(&self) -> &'static [&'static str] {
        &["objects"]
    }

    fn analyze(&self, data: &[u8], findings: &mut Findings) {
        let window = &data[..data.len().min(self.window)];
        if window.starts_with(ONENOTE_GUID) || contains(window, ONENOTE_LITERAL) {
            findings.push("objects", "OneNote signature found");
        }
    }
}
