use serde::Serialize;
use serde_json::{Map, Value};

/// Category every analyzer populates, possibly empty.
pub const ERRORS: &str = "errors";

/// Categorized observations produced by one analyzer run.
///
/// Each category maps to a JSON array of strings or objects. Categories keep
/// the order in which the analyzer declared them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Findings {
    categories: Map<String, Value>,
}

impl Findings {
    /// Creates a record with every given category present and empty.
    /// `errors` is always appended when not listed.
    pub fn with_categories(categories: &[&str]) -> Self {
        let mut map = Map::new();
        for category in categories {
            map.insert((*category).to_string(), Value::Array(Vec::new()));
        }
        if !map.contains_key(ERRORS) {
            map.insert(ERRORS.to_string(), Value::Array(Vec::new()));
        }
        Self { categories: map }
    }

    /// Appends an entry, creating the category if needed.
    pub fn push(&mut self, category: &str, entry: impl Into<Value>) {
        let slot = self
            .categories
            .entry(category.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(entries) => entries.push(entry.into()),
            other => *other = Value::Array(vec![entry.into()]),
        }
    }

    /// Appends an entry unless an equal one is already recorded.
    pub fn push_unique(&mut self, category: &str, entry: impl Into<Value>) {
        let entry = entry.into();
        if self.entries(category).iter().any(|e| *e == entry) {
            return;
        }
        self.push(category, entry);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ERRORS, Value::String(message.into()));
    }

    pub fn entries(&self, category: &str) -> &[Value] {
        match self.categories.get(category) {
            Some(Value::Array(entries)) => entries,
            _ => &[],
        }
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// String entries of a category; structured entries are skipped.
    pub fn strings(&self, category: &str) -> Vec<&str> {
        self.entries(category)
            .iter()
            .filter_map(Value::as_str)
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.strings(ERRORS)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.categories
    }
}
