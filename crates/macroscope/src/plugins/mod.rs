//! Pluggable detectors with isolated failure.
//!
//! A plugin is looked up by name in a [`PluginRegistry`], constructed
//! through its factory and run against the document path. Whatever goes
//! wrong inside one plugin (unknown name, error, panic) ends up as
//! `{"error": "<message>"}` in that plugin's slot and nowhere else.

pub mod builtin;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::PluginError;
use crate::guard;
use crate::sanitize::redact_path;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, path: &Path) -> Result<Map<String, Value>, PluginError>;
}

pub type PluginFactory = fn() -> Box<dyn Plugin>;

#[derive(Default)]
pub struct PluginRegistry {
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every plugin shipped with the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("ole_macro_plugin", builtin::ole_macro_plugin);
        registry.register("pdf_js_plugin", builtin::pdf_js_plugin);
        registry.register("sample_plugin", builtin::sample_plugin);
        registry
    }

    /// Adds or replaces a factory.
    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Runs every requested plugin and keys the outcomes by name.
    pub fn run_plugins(&self, names: &BTreeSet<String>, path: &Path) -> Map<String, Value> {
        let mut results = Map::new();
        for name in names {
            let result = match self.run_one(name, path) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(
                        plugin = %name,
                        file = %redact_path(path),
                        error = %e,
                        "plugin failed"
                    );
                    error_slot(&e)
                }
            };
            results.insert(name.clone(), Value::Object(result));
        }
        results
    }

    fn run_one(&self, name: &str, path: &Path) -> Result<Map<String, Value>, PluginError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PluginError::Unknown(name.to_string()))?;

        guard::contain(|| {
            let plugin = factory();
            tracing::debug!(plugin = plugin.name(), "running plugin");
            plugin.run(path)
        })
        .map_err(PluginError::Panicked)?
    }
}

fn error_slot(e: &PluginError) -> Map<String, Value> {
    let mut slot = Map::new();
    slot.insert("error".to_string(), Value::String(e.to_string()));
    slot
}
