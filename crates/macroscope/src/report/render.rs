//! Human-readable report text.

use console::Style;
use serde_json::{Map, Value};

pub const TITLE: &str = "MacroScope Analysis Report";

/// Indentation of values under a top-level key.
const TOP_LEVEL_INDENT: usize = 4;

struct Palette {
    colored: bool,
}

impl Palette {
    fn paint(&self, text: &str, style: Style) -> String {
        style.force_styling(self.colored).apply_to(text).to_string()
    }

    fn status(&self, ok: bool) -> String {
        if ok {
            self.paint("[OK]", Style::new().green())
        } else {
            self.paint("[FAIL]", Style::new().red())
        }
    }

    fn none(&self) -> String {
        self.paint("None", Style::new().yellow())
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, Style::new().bold())
    }

    fn title(&self, text: &str) -> String {
        self.paint(text, Style::new().bold().cyan())
    }
}

/// `autoexec` → `Autoexec`, `extracted_files` → `Extracted files`. Keys
/// that are not plain identifiers (artifact paths) are kept verbatim.
pub fn label(key: &str) -> String {
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return key.to_string();
    }
    let spaced = key.replace('_', " ").to_lowercase();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

pub fn render_text(tree: &Map<String, Value>, risk_score: u32, colored: bool) -> String {
    let palette = Palette { colored };
    let mut lines = vec![palette.title(TITLE), String::new()];

    for (key, value) in tree {
        lines.push(format!(
            "{}: {}",
            palette.bold(&label(key)),
            format_value(&palette, value, TOP_LEVEL_INDENT)
        ));
    }

    lines.push(String::new());
    lines.push(format!("{}: {}", palette.bold("Risk Score"), risk_score));
    lines.join("\n")
}

fn format_value(palette: &Palette, value: &Value, indent: usize) -> String {
    let pad = " ".repeat(indent);
    match value {
        Value::Null => palette.none(),
        Value::Bool(ok) => palette.status(*ok),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.is_empty() => palette.none(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let rendered = format_value(palette, item, indent + 2);
                if rendered.starts_with('\n') {
                    format!("\n{}-{}", pad, rendered)
                } else {
                    format!("\n{}- {}", pad, rendered)
                }
            })
            .collect(),
        Value::Object(map) if map.is_empty() => palette.none(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("\n{}{}: {}", pad, label(k), format_value(palette, v, indent + 2)))
            .collect(),
    }
}
