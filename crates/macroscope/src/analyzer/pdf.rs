use lopdf::{Document, Object};
use serde_json::json;

use crate::analyzer::DocumentAnalyzer;
use crate::findings::Findings;
use crate::formats::pdf as pdfobj;
use crate::sanitize::preview;

pub struct PdfAnalyzer {
    preview_length: usize,
}

impl PdfAnalyzer {
    pub fn new(preview_length: usize) -> Self {
        Self { preview_length }
    }

    fn describe_action(&self, doc: &Document, action: &Object) -> String {
        let action = match pdfobj::resolve(doc, action) {
            Some(Object::Array(_)) => return "destination".to_string(),
            Some(Object::Dictionary(action)) => action,
            _ => return "unrecognized action".to_string(),
        };

        let kind = pdfobj::get(doc, action, b"S")
            .map(pdfobj::decode_object_text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "action".to_string());

        let detail = [b"JS".as_slice(), b"URI".as_slice(), b"F".as_slice()]
            .iter()
            .find_map(|key| {
                let value = action.get(key).ok()?;
                match pdfobj::resolve(doc, value)? {
                    Object::Dictionary(spec) => spec.get(b"F").ok().and_then(|f| pdfobj::text_of(doc, f)),
                    _ => pdfobj::text_of(doc, value),
                }
            });

        match detail {
            Some(detail) => format!("{}: {}", kind, preview(detail.trim(), self.preview_length)),
            None => kind,
        }
    }

    fn record_javascript(&self, doc: &Document, findings: &mut Findings) {
        let Some(tree) = pdfobj::names_subtree(doc, b"JavaScript") else {
            return;
        };

        let walk = pdfobj::name_tree_leaves(doc, tree);
        for (name, action) in walk.leaves {
            let code = match action {
                Object::Dictionary(action) => action
                    .get(b"JS")
                    .ok()
                    .and_then(|js| pdfobj::text_of(doc, js))
                    .unwrap_or_default(),
                other => pdfobj::decode_object_text(other),
            };
            findings.push(
                "js",
                json!({ "name": name, "code": preview(&code, self.preview_length) }),
            );
        }
        if walk.truncated {
            findings.error("JavaScript name tree walk stopped early (cycle or depth limit)");
        }
    }

    fn record_embedded_files(&self, doc: &Document, findings: &mut Findings) {
        for file in pdfobj::embedded_files(doc) {
            match file.content {
                Ok(content) => findings.push(
                    "embedded_files",
                    json!({ "name": file.name, "size": content.len() }),
                ),
                Err(e) => findings.error(format!("embedded file '{}': {}", file.name, e)),
            }
        }
    }
}

impl DocumentAnalyzer for PdfAnalyzer {
    fn categories(&self) -> &'static [&'static str] {
        &["objects", "openaction", "js", "embedded_files"]
    }

    fn analyze(&self, data: &[u8], findings: &mut Findings) {
        for (keyword, count) in pdfobj::keyword_counts(data) {
            findings.push("objects", format!("{}: {}", keyword, count));
        }

        let doc = match pdfobj::load(data) {
            Ok(doc) => doc,
            Err(e) => {
                findings.error(e.to_string());
                return;
            }
        };

        let Some(catalog) = pdfobj::catalog(&doc) else {
            return;
        };

        if let Ok(action) = catalog.get(b"OpenAction") {
            let description = self.describe_action(&doc, action);
            findings.push("openaction", description);
        }
        self.record_javascript(&doc, findings);
        self.record_embedded_files(&doc, findings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Dictionary, Stream, StringFormat};

    fn literal(text: &str) -> Object {
        Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
    }

    fn build(catalog_extra: Vec<(&str, Object)>, doc: Option<Document>) -> Vec<u8> {
        let mut doc = doc.unwrap_or_else(|| Document::with_version("1.5"));
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let mut catalog: Dictionary = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        for (key, value) in catalog_extra {
            catalog.set(key, value);
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn analyze(data: &[u8]) -> Findings {
        let analyzer = PdfAnalyzer::new(200);
        let mut findings = Findings::with_categories(analyzer.categories());
        analyzer.analyze(data, &mut findings);
        findings
    }

    #[test]
    fn test_no_names_means_empty_js_without_error() {
        let findings = analyze(&build(vec![], None));

        assert!(findings.entries("js").is_empty());
        assert!(findings.entries("openaction").is_empty());
        assert!(findings.entries("embedded_files").is_empty());
        assert!(findings.errors().is_empty());
    }

    #[test]
    fn test_openaction_javascript() {
        let action = Object::Dictionary(dictionary! {
            "S" => "JavaScript",
            "JS" => literal("app.alert('pwned')"),
        });
        let findings = analyze(&build(vec![("OpenAction", action)], None));

        assert_eq!(
            findings.strings("openaction"),
            vec!["JavaScript: app.alert('pwned')"]
        );
        assert!(findings
            .strings("objects")
            .contains(&"/OpenAction: 1"));
    }

    #[test]
    fn test_openaction_destination() {
        let findings = analyze(&build(
            vec![("OpenAction", Object::Array(vec![Object::Integer(0), "Fit".into()]))],
            None,
        ));
        assert_eq!(findings.strings("openaction"), vec!["destination"]);
    }

    #[test]
    fn test_javascript_name_tree() {
        let mut doc = Document::with_version("1.5");
        let js_stream = doc.add_object(Stream::new(dictionary! {}, b"this.exportDataObject({cName: 'a'})".to_vec()));
        let action_id = doc.add_object(dictionary! {
            "S" => "JavaScript",
            "JS" => js_stream,
        });
        let tree_id = doc.add_object(dictionary! {
            "Names" => vec![literal("startup"), action_id.into()],
        });
        let names = Object::Dictionary(dictionary! { "JavaScript" => tree_id });

        let findings = analyze(&build(vec![("Names", names)], Some(doc)));

        let js = findings.entries("js");
        assert_eq!(js.len(), 1);
        assert_eq!(js[0]["name"], "startup");
        assert_eq!(js[0]["code"], "this.exportDataObject({cName: 'a'})");
        assert!(findings.errors().is_empty());
    }

    #[test]
    fn test_embedded_files_reported_with_size() {
        let mut doc = Document::with_version("1.5");
        let file_id = doc.add_object(Stream::new(dictionary! {}, vec![0u8; 42]));
        let spec_id = doc.add_object(dictionary! {
            "Type" => "Filespec",
            "F" => literal("invoice.docm"),
            "EF" => dictionary! { "F" => file_id },
        });
        let tree_id = doc.add_object(dictionary! {
            "Names" => vec![literal("invoice.docm"), spec_id.into()],
        });
        let names = Object::Dictionary(dictionary! { "EmbeddedFiles" => tree_id });

        let findings = analyze(&build(vec![("Names", names)], Some(doc)));

        let files = findings.entries("embedded_files");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["name"], "invoice.docm");
        assert_eq!(files[0]["size"], 42);
    }

    #[test]
    fn test_garbage_is_error_entry() {
        let findings = analyze(b"this is not a pdf at all");
        assert_eq!(findings.errors().len(), 1);
        assert!(findings.entries("js").is_empty());
    }
}
