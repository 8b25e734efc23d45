pub mod html;
pub mod office;
pub mod onenote;
pub mod pdf;
pub mod rtf;

use crate::config::TriageConfig;
use crate::document::DocumentKind;
use crate::findings::Findings;
use crate::guard;

pub use html::HtmlAnalyzer;
pub use office::OfficeAnalyzer;
pub use onenote::OneNoteAnalyzer;
pub use pdf::PdfAnalyzer;
pub use rtf::RtfAnalyzer;

/// A format-specific inspector. Implementations record everything,
/// including parse failures, into the supplied [`Findings`]; they never
/// return an error.
pub trait DocumentAnalyzer: Send + Sync {
    /// Categories this analyzer always reports, in output order. `errors`
    /// is appended automatically.
    fn categories(&self) -> &'static [&'static str];

    fn analyze(&self, data: &[u8], findings: &mut Findings);
}

/// Routes inputs of an unrecognized kind; reports a single informational
/// entry.
#[derive(Debug, Default)]
pub struct UnknownAnalyzer;

impl DocumentAnalyzer for UnknownAnalyzer {
    fn categories(&self) -> &'static [&'static str] {
        &[]
    }

    fn analyze(&self, _data: &[u8], findings: &mut Findings) {
        findings.error("Unsupported or unrecognized file type; no analyzer applied");
    }
}

/// One analyzer per document kind, built once per pipeline.
pub struct Analyzers {
    office: OfficeAnalyzer,
    pdf: PdfAnalyzer,
    rtf: RtfAnalyzer,
    html: HtmlAnalyzer,
    onenote: OneNoteAnalyzer,
    unknown: UnknownAnalyzer,
}

impl Analyzers {
    pub fn from_config(config: &TriageConfig) -> Self {
        Self {
            office: OfficeAnalyzer::new(config.preview_length),
            pdf: PdfAnalyzer::new(config.preview_length),
            rtf: RtfAnalyzer,
            html: HtmlAnalyzer::from_config(&config.html, config.preview_length),
            onenote: OneNoteAnalyzer::new(config.sniff_window),
            unknown: UnknownAnalyzer,
        }
    }

    pub fn for_kind(&self, kind: DocumentKind) -> &dyn DocumentAnalyzer {
        match kind {
            DocumentKind::Office => &self.office,
            DocumentKind::Pdf => &self.pdf,
            DocumentKind::Rtf => &self.rtf,
            DocumentKind::Html => &self.html,
            DocumentKind::OneNote => &self.onenote,
            DocumentKind::Unknown => &self.unknown,
        }
    }

    /// The kind's categories, all empty. Used when the input cannot be read.
    pub fn empty_findings(&self, kind: DocumentKind) -> Findings {
        Findings::with_categories(self.for_kind(kind).categories())
    }

    /// Runs the kind's analyzer behind a panic guard.
    pub fn analyze(&self, kind: DocumentKind, data: &[u8]) -> Findings {
        let analyzer = self.for_kind(kind);
        let outcome = guard::contain(|| {
            let mut findings = Findings::with_categories(analyzer.categories());
            analyzer.analyze(data, &mut findings);
            findings
        });

        match outcome {
            Ok(findings) => findings,
            Err(message) => {
                tracing::warn!(kind = kind.label(), panic = %message, "analyzer panicked");
                let mut findings = self.empty_findings(kind);
                findings.error(format!("{} analyzer panicked: {}", kind.label(), message));
                findings
            }
        }
    }
}

impl Default for Analyzers {
    fn default() -> Self {
        Self::from_config(&TriageConfig::default())
    }
}
